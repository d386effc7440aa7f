//! Submission of new download requests.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::Config;
use crate::db::{DatabaseError, InsertOutcome, JobRepository};
use crate::job::{Job, NewJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued { id: i64, expiry: DateTime<Utc> },
    /// A job for the same URL already exists.
    Duplicate,
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Queues `request` as a new job created at `now`.
pub fn submit(
    repo: &dyn JobRepository,
    config: &Config,
    request: NewJob,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome, IntakeError> {
    let request = NewJob {
        url: request.url.trim().to_string(),
        callback: request.callback.trim().to_string(),
        ..request
    };
    if request.url.is_empty() {
        return Err(IntakeError::EmptyUrl);
    }

    let job = Job::queued(request, now, config.expiry_days);
    match repo.insert_if_absent(&job)? {
        InsertOutcome::Inserted(id) => {
            log::info!(
                "Queued job {} for {}",
                id,
                crate::sanitize::redact_url(&job.url)
            );
            Ok(SubmitOutcome::Queued {
                id,
                expiry: job.expiry_date,
            })
        }
        InsertOutcome::Duplicate => {
            log::info!(
                "Already queued: {}",
                crate::sanitize::redact_url(&job.url)
            );
            Ok(SubmitOutcome::Duplicate)
        }
    }
}

/// Lenient boolean: `true`, `yes`, `1`, `y`, `t` in any case.
pub fn str_to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "y" | "t"
    )
}

/// Boolean from a JSON value that may be a bool, a string or a number.
pub fn json_to_bool(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => str_to_bool(s),
        serde_json::Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Percent-decodes `value`, keeping it unchanged if it does not decode to UTF-8.
pub fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::job::JobStatus;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn request(url: &str) -> NewJob {
        NewJob {
            url: url.to_string(),
            audio_only: true,
            callback: "<type:http>".to_string(),
        }
    }

    #[test]
    fn test_submit_queues_with_expiry() {
        let db = Database::open_in_memory().unwrap();
        let mut config = Config::new("/d", "/t");
        config.expiry_days = 3;
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();

        let outcome = submit(&db, &config, request("http://example.com/v"), now).unwrap();
        let SubmitOutcome::Queued { id, expiry } = outcome else {
            panic!("expected queued, got {:?}", outcome);
        };
        assert_eq!(expiry, now + Duration::days(3));

        let job = db.find_by_id(id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.audio_only);
        assert_eq!(job.create_date, now);
        assert_eq!(job.expiry_date, now + Duration::days(3));
    }

    #[test]
    fn test_submit_duplicate_url() {
        let db = Database::open_in_memory().unwrap();
        let config = Config::new("/d", "/t");
        let now = Utc::now();

        assert!(matches!(
            submit(&db, &config, request("http://example.com/v"), now).unwrap(),
            SubmitOutcome::Queued { .. }
        ));
        assert_eq!(
            submit(&db, &config, request("http://example.com/v"), now).unwrap(),
            SubmitOutcome::Duplicate
        );
        assert_eq!(db.counts().unwrap().total(), 1);
    }

    #[test]
    fn test_submit_trims_and_rejects_empty_url() {
        let db = Database::open_in_memory().unwrap();
        let config = Config::new("/d", "/t");
        assert!(matches!(
            submit(&db, &config, request("   "), Utc::now()),
            Err(IntakeError::EmptyUrl)
        ));
    }

    #[test]
    fn test_str_to_bool() {
        for yes in ["true", "TRUE", "yes", "1", "y", "T", " t "] {
            assert!(str_to_bool(yes), "{yes}");
        }
        for no in ["false", "no", "0", "", "audio"] {
            assert!(!str_to_bool(no), "{no}");
        }
    }

    #[test]
    fn test_json_to_bool() {
        assert!(json_to_bool(&json!(true)));
        assert!(json_to_bool(&json!("Yes")));
        assert!(json_to_bool(&json!(1)));
        assert!(!json_to_bool(&json!(false)));
        assert!(!json_to_bool(&json!(null)));
        assert!(!json_to_bool(&json!("False")));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(
            percent_decode("http%3A%2F%2Fexample.com%2Fv"),
            "http://example.com/v"
        );
        assert_eq!(percent_decode("plain"), "plain");
        assert_eq!(percent_decode("%FF"), "%FF");
    }
}
