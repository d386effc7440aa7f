//! Job repository: the queries the lifecycle engine and intake need over
//! the `downloadable` table.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::job::{Job, JobStatus, UnknownStatus};

/// Result of [`JobRepository::insert_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The job was stored under this id.
    Inserted(i64),
    /// A job with the same URL already exists; nothing was written.
    Duplicate,
}

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: u64,
    pub in_progress: u64,
    pub downloaded: u64,
    pub completed: u64,
    pub failed: u64,
    pub deleted: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.queued + self.in_progress + self.downloaded + self.completed + self.failed + self.deleted
    }

    /// Jobs whose file has been delivered (completed or already retired).
    pub fn done(&self) -> u64 {
        self.completed + self.deleted
    }
}

/// Storage operations the worker loop and intake depend on.
///
/// Every method is its own transaction; the URL uniqueness constraint is the
/// only coordination point between concurrent submitters.
pub trait JobRepository: Send + Sync {
    /// Stores `job` unless another job already has its URL.
    fn insert_if_absent(&self, job: &Job) -> Result<InsertOutcome, DatabaseError>;

    /// Oldest job (by creation time) that is `queued` or `downloaded`.
    fn next_eligible(&self) -> Result<Option<Job>, DatabaseError>;

    /// Overwrites every mutable field of the job with the given id.
    fn update(&self, job: &Job) -> Result<(), DatabaseError>;

    /// Completed jobs whose expiry date lies before `now`.
    fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Job>, DatabaseError>;

    fn mark_deleted(&self, id: i64) -> Result<(), DatabaseError>;

    /// Moves every `in_progress` job back to `queued`. Returns how many moved.
    fn reset_stuck(&self) -> Result<usize, DatabaseError>;

    fn count_by_status(&self, status: JobStatus) -> Result<u64, DatabaseError>;

    fn count_queued(&self) -> Result<u64, DatabaseError> {
        self.count_by_status(JobStatus::Queued)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Job>, DatabaseError>;

    /// Like [`find_by_id`](Self::find_by_id) but only for completed jobs.
    fn find_completed(&self, id: i64) -> Result<Option<Job>, DatabaseError>;

    fn counts(&self) -> Result<StatusCounts, DatabaseError>;
}

impl ToSql for JobStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for JobStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Fixed-width RFC 3339 so that lexical order in SQLite equals time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Naive UTC text written by earlier versions of the queue.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn conversion_failure<E>(e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

/// Accepts RFC 3339 as well as the legacy naive format.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT).map(|dt| dt.and_utc()))
}

fn timestamp_column(row: &Row<'_>, column: &'static str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(column)?
        .map(|raw| parse_timestamp(&raw).map_err(conversion_failure))
        .transpose()
}

/// A row without a status is never picked up or swept; read it as failed.
fn status_from_text(raw: Option<&str>) -> Result<JobStatus, UnknownStatus> {
    match raw.map(str::trim) {
        None | Some("") => Ok(JobStatus::Failed),
        Some(raw) => raw.parse(),
    }
}

fn status_column(row: &Row<'_>) -> rusqlite::Result<JobStatus> {
    status_from_text(row.get::<_, Option<String>>("status")?.as_deref()).map_err(conversion_failure)
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    let create_date = timestamp_column(row, "create_date")?.unwrap_or(DateTime::UNIX_EPOCH);
    let expiry_date = timestamp_column(row, "expiry_date")?.unwrap_or(create_date);

    Ok(Job {
        id: row.get("id")?,
        url: row.get::<_, Option<String>>("url")?.unwrap_or_default(),
        audio_only: row.get::<_, Option<bool>>("audio_only")?.unwrap_or(false),
        callback: row.get::<_, Option<String>>("callback")?.unwrap_or_default(),
        status: status_column(row)?,
        errors: row.get("errors")?,
        retry_count: row.get::<_, Option<i64>>("retry_count")?.unwrap_or(0),
        notify_retry_count: row.get::<_, Option<i64>>("notify_retry_count")?.unwrap_or(0),
        title: row.get("title")?,
        width: row.get("width")?,
        height: row.get("height")?,
        length: row.get("length")?,
        file_size: row.get("file_size")?,
        filename: row.get::<_, Option<String>>("filename")?.map(PathBuf::from),
        create_date,
        expiry_date,
    })
}

fn filename_text(job: &Job) -> Option<String> {
    job.filename
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
}

impl JobRepository for Database {
    fn insert_if_absent(&self, job: &Job) -> Result<InsertOutcome, DatabaseError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT INTO downloadable (url, title, audio_only, status, errors, retry_count,
                 notify_retry_count, filename, create_date, expiry_date, width, height, length,
                 file_size, callback)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(url) DO NOTHING",
                params![
                    job.url,
                    job.title,
                    job.audio_only,
                    job.status,
                    job.errors,
                    job.retry_count,
                    job.notify_retry_count,
                    filename_text(job),
                    format_timestamp(&job.create_date),
                    format_timestamp(&job.expiry_date),
                    job.width,
                    job.height,
                    job.length,
                    job.file_size,
                    job.callback,
                ],
            )?;
            if changed == 0 {
                Ok(InsertOutcome::Duplicate)
            } else {
                Ok(InsertOutcome::Inserted(conn.last_insert_rowid()))
            }
        })
    }

    fn next_eligible(&self) -> Result<Option<Job>, DatabaseError> {
        self.with_conn(|conn| {
            let job = conn
                .query_row(
                    "SELECT * FROM downloadable
                     WHERE status IN ('queued', 'downloaded')
                     ORDER BY create_date ASC, id ASC
                     LIMIT 1",
                    [],
                    job_from_row,
                )
                .optional()?;
            Ok(job)
        })
    }

    fn update(&self, job: &Job) -> Result<(), DatabaseError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE downloadable SET title=?2, audio_only=?3, status=?4, errors=?5,
                 retry_count=?6, notify_retry_count=?7, filename=?8, expiry_date=?9,
                 width=?10, height=?11, length=?12, file_size=?13, callback=?14
                 WHERE id=?1",
                params![
                    job.id,
                    job.title,
                    job.audio_only,
                    job.status,
                    job.errors,
                    job.retry_count,
                    job.notify_retry_count,
                    filename_text(job),
                    format_timestamp(&job.expiry_date),
                    job.width,
                    job.height,
                    job.length,
                    job.file_size,
                    job.callback,
                ],
            )?;
            if changed == 0 {
                return Err(DatabaseError::NotFound(job.id));
            }
            Ok(())
        })
    }

    fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Job>, DatabaseError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM downloadable
                 WHERE status = 'completed' AND julianday(expiry_date) < julianday(?1)
                 ORDER BY julianday(expiry_date) ASC",
            )?;
            let jobs = stmt
                .query_map(params![format_timestamp(&now)], job_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(jobs)
        })
    }

    fn mark_deleted(&self, id: i64) -> Result<(), DatabaseError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE downloadable SET status = ?2 WHERE id = ?1",
                params![id, JobStatus::Deleted],
            )?;
            if changed == 0 {
                return Err(DatabaseError::NotFound(id));
            }
            Ok(())
        })
    }

    fn reset_stuck(&self) -> Result<usize, DatabaseError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE downloadable SET status = ?1 WHERE status = ?2",
                params![JobStatus::Queued, JobStatus::InProgress],
            )?;
            Ok(changed)
        })
    }

    fn count_by_status(&self, status: JobStatus) -> Result<u64, DatabaseError> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM downloadable WHERE status = ?1",
                params![status],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Job>, DatabaseError> {
        self.with_conn(|conn| {
            let job = conn
                .query_row(
                    "SELECT * FROM downloadable WHERE id = ?1",
                    params![id],
                    job_from_row,
                )
                .optional()?;
            Ok(job)
        })
    }

    fn find_completed(&self, id: i64) -> Result<Option<Job>, DatabaseError> {
        self.with_conn(|conn| {
            let job = conn
                .query_row(
                    "SELECT * FROM downloadable WHERE id = ?1 AND status = ?2",
                    params![id, JobStatus::Completed],
                    job_from_row,
                )
                .optional()?;
            Ok(job)
        })
    }

    fn counts(&self) -> Result<StatusCounts, DatabaseError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM downloadable GROUP BY status")?;
            let rows = stmt
                .query_map([], |r| Ok((r.get::<_, Option<String>>(0)?, r.get::<_, u64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;

            let mut counts = StatusCounts::default();
            for (raw, n) in rows {
                let Ok(status) = status_from_text(raw.as_deref()) else {
                    continue;
                };
                match status {
                    JobStatus::Queued => counts.queued += n,
                    JobStatus::InProgress => counts.in_progress += n,
                    JobStatus::Downloaded => counts.downloaded += n,
                    JobStatus::Completed => counts.completed += n,
                    JobStatus::Failed => counts.failed += n,
                    JobStatus::Deleted => counts.deleted += n,
                }
            }
            Ok(counts)
        })
    }
}
