use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] crate::fetcher::FetchError),

    #[error("Storage failed: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("Invalid callback: {0}")]
    Callback(#[from] crate::notify::CallbackError),

    #[error("Notification failed: {0}")]
    Notify(#[from] crate::notify::NotifyError),
}
