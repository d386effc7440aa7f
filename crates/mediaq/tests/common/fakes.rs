//! In-process fakes for the external collaborators of the engine.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::Mutex;

use mediaq::fetcher::{FetchError, MediaFetcher, MediaInfo};
use mediaq::notify::{HttpResponse, HttpTarget, MailTarget, NotificationTransport, NotifyError};

/// Fetcher that derives metadata from the URL and writes a fixed payload.
pub struct FakeFetcher {
    /// Bytes written for every fetched file.
    pub payload: Vec<u8>,
    /// When set, every probe fails like a non-zero yt-dlp exit.
    pub fail: AtomicBool,
    /// When set, probes succeed but every fetch leaves no file behind.
    pub fail_fetch: AtomicBool,
    /// Title reported by probes; the last URL segment when unset.
    pub title: Mutex<Option<String>>,
    probes: AtomicUsize,
    fetches: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            payload: b"0123456789".to_vec(),
            fail: AtomicBool::new(false),
            fail_fetch: AtomicBool::new(false),
            title: Mutex::new(None),
            probes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_fetch_failing(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_title(&self, title: &str) {
        *self.title.lock().unwrap() = Some(title.to_string());
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl MediaFetcher for FakeFetcher {
    fn probe(&self, url: &str, audio_only: bool) -> Result<MediaInfo, FetchError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("Unsupported URL: {}", url),
            });
        }

        let title = self
            .title
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| url.rsplit('/').next().unwrap_or("untitled").to_string());

        Ok(MediaInfo {
            id: Some("abc123".to_string()),
            title: Some(title),
            ext: Some(if audio_only { "mp3" } else { "mp4" }.to_string()),
            extractor: Some("generic".to_string()),
            width: (!audio_only).then_some(1280),
            height: (!audio_only).then_some(720),
            duration: Some(61.4),
            filesize: Some(999_999),
            ..Default::default()
        })
    }

    fn fetch(&self, _url: &str, _audio_only: bool, dest: &Path) -> Result<(), FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(FetchError::MissingOutput(dest.to_path_buf()));
        }
        std::fs::write(dest, &self.payload)?;
        Ok(())
    }
}

/// Transport that records every notification and answers with a fixed status.
pub struct RecordingTransport {
    pub status: AtomicU16,
    pub http_calls: Mutex<Vec<HttpTarget>>,
    pub mails: Mutex<Vec<MailTarget>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            status: AtomicU16::new(200),
            http_calls: Mutex::new(Vec::new()),
            mails: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn http_calls(&self) -> Vec<HttpTarget> {
        self.http_calls.lock().unwrap().clone()
    }

    pub fn mails(&self) -> Vec<MailTarget> {
        self.mails.lock().unwrap().clone()
    }
}

impl NotificationTransport for RecordingTransport {
    fn send_mail(&self, target: &MailTarget) -> Result<(), NotifyError> {
        self.mails.lock().unwrap().push(target.clone());
        Ok(())
    }

    fn http_call(&self, target: &HttpTarget) -> Result<HttpResponse, NotifyError> {
        self.http_calls.lock().unwrap().push(target.clone());
        Ok(HttpResponse {
            status: self.status.load(Ordering::SeqCst),
            body: "ok".to_string(),
        })
    }
}
