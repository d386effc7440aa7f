//! Bulk import of download requests from a text file.
//!
//! One request per line, fields separated by two spaces:
//!
//! ```text
//! https://example.com/watch?v=1  video  <type:http><url:http://cb><method:post><payload:done>
//! https://example.com/watch?v=2  audio  <type:mail><address:me@example.com><subject:<%mail_subject%>><body:<%mail_body%>>
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use thiserror::Error;

use crate::config::Config;
use crate::db::DatabaseError;
use crate::db::JobRepository;
use crate::intake::{self, IntakeError, SubmitOutcome};
use crate::job::NewJob;

const FIELD_SEPARATOR: &str = "  ";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read import file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// A line that could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    /// 1-based.
    pub line: usize,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    pub duplicates: usize,
    pub malformed: Vec<MalformedLine>,
}

impl ImportReport {
    /// Lines that held a request, whether new or already known.
    pub fn total(&self) -> usize {
        self.added + self.duplicates
    }
}

/// Parses one line. `None` for lines with fewer than three fields.
pub fn parse_line(line: &str) -> Option<NewJob> {
    let fields: Vec<&str> = line
        .split(FIELD_SEPARATOR)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() < 3 {
        return None;
    }

    Some(NewJob {
        url: fields[0].to_string(),
        audio_only: fields[1].eq_ignore_ascii_case("audio"),
        // A callback may itself contain double spaces.
        callback: fields[2..].join(FIELD_SEPARATOR),
    })
}

/// Queues every request in `content`. Import is idempotent per URL.
pub fn import_str(
    repo: &dyn JobRepository,
    config: &Config,
    content: &str,
    now: DateTime<Utc>,
) -> Result<ImportReport, ImportError> {
    let mut report = ImportReport::default();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let Some(request) = parse_line(line) else {
            warn!("Skipping malformed line {}: {}", index + 1, line);
            report.malformed.push(MalformedLine {
                line: index + 1,
                content: line.to_string(),
            });
            continue;
        };

        let url = request.url.clone();
        match intake::submit(repo, config, request, now) {
            Ok(SubmitOutcome::Queued { .. }) => {
                info!("added url {}", url);
                report.added += 1;
            }
            Ok(SubmitOutcome::Duplicate) => {
                info!("already added {} -- skipping", url);
                report.duplicates += 1;
            }
            Err(IntakeError::EmptyUrl) => {
                report.malformed.push(MalformedLine {
                    line: index + 1,
                    content: line.to_string(),
                });
            }
            Err(IntakeError::Database(e)) => return Err(e.into()),
        }
    }

    info!(
        "Imported {} of {} ({} already present, {} malformed)",
        report.added,
        report.total(),
        report.duplicates,
        report.malformed.len()
    );
    Ok(report)
}

pub fn import_file(
    repo: &dyn JobRepository,
    config: &Config,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<ImportReport, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|e| ImportError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    import_str(repo, config, &content, now)
}
