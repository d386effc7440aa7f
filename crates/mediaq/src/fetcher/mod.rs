//! Media retrieval: metadata probing and content download.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub mod naming;
pub mod ytdlp;

pub use naming::render_filename;
pub use ytdlp::YtDlpFetcher;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to run '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Fetcher exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Invalid media metadata: {0}")]
    InvalidInfo(#[from] serde_json::Error),

    #[error("Fetcher produced no file at '{}'", .0.display())]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata reported for a URL before download.
///
/// Only the fields the queue stores are typed; everything else the extractor
/// reports is kept in `extra` so naming templates can refer to it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub extractor: Option<String>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub filesize: Option<i64>,
    #[serde(default)]
    pub filesize_approx: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MediaInfo {
    /// String form of a metadata field, `None` when absent or null.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "title" => self.title.clone(),
            "ext" => self.ext.clone(),
            "extractor" => self.extractor.clone(),
            "width" => self.width.map(|v| v.to_string()),
            "height" => self.height.map(|v| v.to_string()),
            "duration" => self.duration.map(|v| v.to_string()),
            "filesize" => self.filesize.map(|v| v.to_string()),
            "filesize_approx" => self.filesize_approx.map(|v| v.to_string()),
            _ => match self.extra.get(name)? {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            },
        }
    }

    /// Duration rounded to whole seconds.
    pub fn length_secs(&self) -> Option<i64> {
        self.duration.map(|d| d.round() as i64)
    }
}

/// Retrieves metadata and content for a media URL.
pub trait MediaFetcher: Send + Sync {
    fn probe(&self, url: &str, audio_only: bool) -> Result<MediaInfo, FetchError>;

    /// Downloads the media to exactly `dest`.
    fn fetch(&self, url: &str, audio_only: bool, dest: &Path) -> Result<(), FetchError>;
}
