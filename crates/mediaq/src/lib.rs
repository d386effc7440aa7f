pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod import;
pub mod intake;
pub mod job;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod server;
pub mod storage;
pub mod worker;

pub use config::{load_config, load_config_from_str, Config};
pub use db::{Database, InsertOutcome, JobRepository, StatusCounts};
pub use error::{ConfigError, MediaqError, Result, StorageError};
pub use fetcher::{FetchError, MediaFetcher, MediaInfo, YtDlpFetcher};
pub use import::{import_file, ImportReport};
pub use intake::{submit, SubmitOutcome};
pub use job::{Job, JobStatus, NewJob};
pub use notify::{NotificationTarget, NotificationTransport};
pub use pipeline::{Engine, EngineError};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use worker::Driver;
