use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn};

use crate::config::Config;
use crate::db::JobRepository;
use crate::fetcher::{render_filename, MediaFetcher, YtDlpFetcher};
use crate::job::{Job, JobStatus};
use crate::notify::{build_target, LiveTransport, NotificationTransport};
use crate::sanitize;
use crate::storage::{relocate, MediaStore};

use super::error::EngineError;

/// Moves a job through its lifecycle: download, then notification.
pub struct Engine {
    config: Arc<Config>,
    repo: Arc<dyn JobRepository>,
    fetcher: Arc<dyn MediaFetcher>,
    transport: Arc<dyn NotificationTransport>,
    store: MediaStore,
}

impl Engine {
    /// Production constructor: yt-dlp fetcher and live SMTP/HTTP transport.
    pub fn from_config(
        config: Arc<Config>,
        repo: Arc<dyn JobRepository>,
    ) -> Result<Self, EngineError> {
        let fetcher = Arc::new(YtDlpFetcher::new(&config.fetcher));
        let transport = Arc::new(LiveTransport::from_config(&config)?);
        Ok(Self::new(config, repo, fetcher, transport))
    }

    /// Constructor with injected collaborators.
    pub fn new(
        config: Arc<Config>,
        repo: Arc<dyn JobRepository>,
        fetcher: Arc<dyn MediaFetcher>,
        transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        let store = MediaStore::new(config.download_path(), config.temp_path());
        Self {
            config,
            repo,
            fetcher,
            transport,
            store,
        }
    }

    pub fn repository(&self) -> &Arc<dyn JobRepository> {
        &self.repo
    }

    /// Runs every stage the job is eligible for and returns it in its new state.
    ///
    /// Fetch, storage and notification failures are recorded on the job. Only
    /// repository errors are returned.
    pub fn process(&self, mut job: Job) -> Result<Job, EngineError> {
        let url = sanitize::redact_url(&job.url);
        let _job_span = info_span!("job", job_id = job.id, url = %url).entered();

        if job.status == JobStatus::Queued {
            let _step = info_span!("download").entered();
            self.download_stage(&mut job)?;
        }

        if job.status == JobStatus::Downloaded {
            let _step = info_span!("notify").entered();
            self.notify_stage(&mut job)?;
        }

        Ok(job)
    }

    fn download_stage(&self, job: &mut Job) -> Result<(), EngineError> {
        job.status = JobStatus::InProgress;
        self.repo.update(job)?;

        match self.download(job) {
            Ok(()) => info!(
                file = %job.filename.as_deref().map(sanitize::redact_path).unwrap_or_default(),
                size = job.file_size.unwrap_or_default(),
                "Downloaded"
            ),
            Err(e) => {
                job.record_download_failure(&e.to_string());
                warn!(
                    error = %e,
                    retry_count = job.retry_count,
                    status = %job.status,
                    "Download failed"
                );
            }
        }

        self.repo.update(job)?;
        Ok(())
    }

    fn download(&self, job: &mut Job) -> Result<(), EngineError> {
        let info = {
            let _step = info_span!("probe").entered();
            self.fetcher.probe(&job.url, job.audio_only)?
        };

        let basename = render_filename(&self.config.output_template, &info);
        self.store.ensure_directories()?;
        let final_path = self.store.final_path(&basename);

        if final_path.exists() {
            info!(file = %basename, "Already downloaded, skipping fetch");
        } else {
            let _step = info_span!("fetch").entered();
            let temp_path = self.store.temp_path(&basename);
            self.fetcher.fetch(&job.url, job.audio_only, &temp_path)?;
            relocate(&temp_path, &final_path)?;
            debug!(file = %basename, "Relocated into download directory");
        }

        let file_size = self.store.file_size(&final_path)?;

        // Result attributes only appear once the file is in place.
        job.length = info.length_secs();
        job.width = info.width;
        job.height = info.height;
        job.title = info.title;
        job.file_size = Some(file_size);
        job.filename = Some(final_path);
        job.status = JobStatus::Downloaded;
        job.errors = None;
        Ok(())
    }

    fn notify_stage(&self, job: &mut Job) -> Result<(), EngineError> {
        if job.callback.trim().is_empty() {
            info!("No callback requested");
            job.status = JobStatus::Completed;
            self.repo.update(job)?;
            return Ok(());
        }

        let target = match build_target(job, &self.config) {
            Ok(target) => target,
            Err(e) => {
                let e = EngineError::from(e);
                warn!(error = %e, "Callback cannot be built, failing job");
                job.append_error("ERROR", &e.to_string());
                job.status = JobStatus::Failed;
                self.repo.update(job)?;
                return Ok(());
            }
        };

        match target.invoke(self.transport.as_ref()) {
            Ok(()) => {
                info!(kind = target.kind(), "Notification sent");
                job.status = JobStatus::Completed;
            }
            Err(e) => {
                job.record_notify_failure(&e.to_string());
                warn!(
                    error = %e,
                    kind = target.kind(),
                    notify_retry_count = job.notify_retry_count,
                    status = %job.status,
                    "Notification failed"
                );
            }
        }

        self.repo.update(job)?;
        Ok(())
    }

    /// Soft-deletes completed jobs whose retention has elapsed. Returns how many
    /// were marked.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, EngineError> {
        let expired = self.repo.list_expired(now)?;
        for job in &expired {
            self.repo.mark_deleted(job.id)?;
            debug!(job_id = job.id, "Marked expired job deleted");
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired jobs marked deleted");
        }
        Ok(expired.len())
    }
}
