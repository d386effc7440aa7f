use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, error, info};

use crate::job::Job;
use crate::pipeline::{Engine, EngineError};

/// Idle time between polls when the queue is empty.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Granularity at which an idle driver notices shutdown.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// What one iteration of the driver did.
#[derive(Debug)]
pub enum Tick {
    /// A job was taken through its eligible stages.
    Processed(Job),
    /// The queue was empty; the expiry sweep marked this many jobs deleted.
    Idle { swept: usize },
}

/// Single polling worker: one job in flight at a time.
pub struct Driver {
    engine: Engine,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl Driver {
    pub fn new(engine: Engine, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            engine,
            shutdown,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Requeues jobs a previous run left `in_progress`.
    pub fn recover(&self) -> Result<usize, EngineError> {
        let reset = self.engine.repository().reset_stuck()?;
        if reset > 0 {
            info!("Requeued {} job(s) interrupted by a previous run", reset);
        }
        Ok(reset)
    }

    /// Processes the next eligible job, or sweeps expired jobs if there is none.
    pub fn run_once(&self) -> Result<Tick, EngineError> {
        match self.engine.repository().next_eligible()? {
            Some(job) => {
                debug!("Picked up job {} ({})", job.id, job.status);
                let job = self.engine.process(job)?;
                Ok(Tick::Processed(job))
            }
            None => {
                let swept = self.engine.sweep_expired(Utc::now())?;
                Ok(Tick::Idle { swept })
            }
        }
    }

    /// Runs until the shutdown flag is set. Only a failed startup recovery is
    /// returned as an error; per-iteration failures are logged.
    pub fn run(&self) -> Result<(), EngineError> {
        self.recover()?;

        match self.engine.repository().count_queued() {
            Ok(queued) => info!("Worker started, {} job(s) queued", queued),
            Err(e) => error!("Failed to count queued jobs: {}", e),
        }

        while !self.is_shutdown() {
            match self.run_once() {
                Ok(Tick::Processed(job)) => {
                    debug!("Job {} is now {}", job.id, job.status);
                }
                Ok(Tick::Idle { .. }) => self.idle(),
                Err(e) => {
                    error!("Worker iteration failed: {}", e);
                    self.idle();
                }
            }
        }

        info!("Worker stopped");
        Ok(())
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn idle(&self) {
        let deadline = Instant::now() + self.poll_interval;
        while !self.is_shutdown() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
