//! The job record and its lifecycle status.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of failed attempts a stage absorbs before the job is failed.
pub const MAX_RETRIES: i64 = 5;

/// Number of characters of an error message kept in the error log.
pub const ERROR_EXCERPT_LEN: usize = 100;

/// Lifecycle status of a job.
///
/// The only backwards edge is `InProgress -> Queued`, used for retries and
/// crash recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Downloaded,
    Completed,
    Failed,
    Deleted,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Downloaded => "downloaded",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown job status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "in_progress" => Ok(JobStatus::InProgress),
            "downloaded" => Ok(JobStatus::Downloaded),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "deleted" => Ok(JobStatus::Deleted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A download request as accepted by the intake path, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub url: String,
    #[serde(default)]
    pub audio_only: bool,
    #[serde(default)]
    pub callback: String,
}

/// One persisted download job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Assigned by the repository on insert; `0` until then.
    pub id: i64,
    pub url: String,
    pub audio_only: bool,
    pub callback: String,
    pub status: JobStatus,
    /// Append-only error log.
    pub errors: Option<String>,
    /// Failed download attempts.
    pub retry_count: i64,
    /// Failed notification attempts.
    pub notify_retry_count: i64,
    pub title: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// Duration in seconds.
    pub length: Option<i64>,
    pub file_size: Option<i64>,
    /// Final location of the downloaded file.
    pub filename: Option<PathBuf>,
    pub create_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

impl Job {
    /// Builds a queued job created at `now` that expires `expiry_days` later.
    pub fn queued(request: NewJob, now: DateTime<Utc>, expiry_days: i64) -> Self {
        Self {
            id: 0,
            url: request.url,
            audio_only: request.audio_only,
            callback: request.callback,
            status: JobStatus::Queued,
            errors: None,
            retry_count: 0,
            notify_retry_count: 0,
            title: None,
            width: None,
            height: None,
            length: None,
            file_size: None,
            filename: None,
            create_date: now,
            expiry_date: now + Duration::days(expiry_days),
        }
    }

    /// Appends `ERROR:<excerpt>` (or `<label>:<excerpt>`) to the error log.
    pub fn append_error(&mut self, label: &str, message: &str) {
        let excerpt: String = message.chars().take(ERROR_EXCERPT_LEN).collect();
        let log = self.errors.get_or_insert_with(String::new);
        log.push('\n');
        log.push_str(label);
        log.push(':');
        log.push_str(&excerpt);
    }

    /// Records a failed download attempt and moves the job back to the queue, or
    /// to `Failed` once the retry budget is exhausted.
    pub fn record_download_failure(&mut self, message: &str) {
        self.retry_count += 1;
        self.append_error("ERROR", message);
        self.status = if self.retry_count > MAX_RETRIES {
            JobStatus::Failed
        } else {
            JobStatus::Queued
        };
    }

    /// Records a failed notification attempt. The job stays `Downloaded` so the
    /// next pass retries it, until the notification budget is exhausted.
    pub fn record_notify_failure(&mut self, message: &str) {
        self.notify_retry_count += 1;
        self.append_error("NOTIFY ERROR", message);
        if self.notify_retry_count > MAX_RETRIES {
            self.status = JobStatus::Failed;
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Completed && self.expiry_date < now
    }
}
