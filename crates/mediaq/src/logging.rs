//! Subscriber setup for the binary.
//!
//! Library code logs through both `log` (db, import, worker driver) and
//! `tracing` (lifecycle engine, server). `log` records are forwarded into
//! tracing so both end up in the same output.

use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::error::MediaqError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(format: LogFormat) -> Result<(), MediaqError> {
    tracing_log::LogTracer::init().map_err(|e| MediaqError::Logging(e.to_string()))?;

    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().with_target(false)))
        }
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
    };

    result.map_err(|e| MediaqError::Logging(e.to_string()))
}
