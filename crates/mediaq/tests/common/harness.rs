//! Test harness for isolated test execution.
//!
//! The `TestHarness` struct provides an isolated environment for driving jobs
//! through their lifecycle:
//! - Temporary download and temp directories
//! - A file-backed SQLite database
//! - Engine and driver wired to the fakes

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use mediaq::config::Config;
use mediaq::db::{Database, InsertOutcome, JobRepository};
use mediaq::job::{Job, NewJob};
use mediaq::pipeline::Engine;
use mediaq::worker::Driver;

use super::fakes::{FakeFetcher, RecordingTransport};

/// Test harness providing isolated execution environment for integration tests.
pub struct TestHarness {
    /// Temporary directory holding downloads, temp files and the database.
    temp_dir: TempDir,
    pub download_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub db_path: PathBuf,
    pub db: Arc<Database>,
    pub fetcher: Arc<FakeFetcher>,
    pub transport: Arc<RecordingTransport>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let download_dir = temp_dir.path().join("downloads");
        let staging_dir = temp_dir.path().join("tmp");
        let db_path = temp_dir.path().join("mediaq.db");
        let db = Arc::new(Database::open(&db_path).expect("Failed to open database"));

        Self {
            temp_dir,
            download_dir,
            staging_dir,
            db_path,
            db,
            fetcher: Arc::new(FakeFetcher::new()),
            transport: Arc::new(RecordingTransport::new()),
        }
    }

    /// Configuration pointing at the harness directories.
    pub fn config(&self) -> Config {
        Config::new(self.download_dir.clone(), self.staging_dir.clone())
    }

    pub fn engine_with(&self, config: Config) -> Engine {
        Engine::new(
            Arc::new(config),
            self.db.clone(),
            self.fetcher.clone(),
            self.transport.clone(),
        )
    }

    pub fn engine(&self) -> Engine {
        self.engine_with(self.config())
    }

    pub fn driver_with(&self, config: Config) -> Driver {
        Driver::new(self.engine_with(config), Arc::new(AtomicBool::new(false)))
            .with_poll_interval(Duration::from_millis(10))
    }

    pub fn driver(&self) -> Driver {
        self.driver_with(self.config())
    }

    /// Opens a second handle on the same database file, as a restarted worker would.
    pub fn reopen(&self) -> Arc<Database> {
        Arc::new(Database::open(&self.db_path).expect("Failed to reopen database"))
    }

    /// Queues a video job and returns its id.
    pub fn enqueue(&self, url: &str, callback: &str) -> i64 {
        self.enqueue_at(url, callback, Utc::now())
    }

    pub fn enqueue_at(&self, url: &str, callback: &str, now: DateTime<Utc>) -> i64 {
        let job = Job::queued(
            NewJob {
                url: url.to_string(),
                audio_only: false,
                callback: callback.to_string(),
            },
            now,
            self.config().expiry_days,
        );
        match self.db.insert_if_absent(&job).expect("Failed to insert job") {
            InsertOutcome::Inserted(id) => id,
            InsertOutcome::Duplicate => panic!("{} is already queued", url),
        }
    }

    pub fn job(&self, id: i64) -> Job {
        self.db
            .find_by_id(id)
            .expect("Failed to load job")
            .expect("Job not found")
    }

    /// Runs driver iterations until the queue is idle, up to `max_ticks`.
    pub fn drain(&self, driver: &Driver, max_ticks: usize) -> usize {
        let mut processed = 0;
        for _ in 0..max_ticks {
            match driver.run_once().expect("Driver iteration failed") {
                mediaq::worker::Tick::Processed(_) => processed += 1,
                mediaq::worker::Tick::Idle { .. } => break,
            }
        }
        processed
    }
}
