//! HTTP front door: request intake, completed-file download and a built-in
//! completion callback receiver.
//!
//! The server only inserts jobs and reads completed ones; the worker runs as a
//! separate process against the same database.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::db::JobRepository;
use crate::error::MediaqError;

pub mod error;
pub mod routes;

pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn JobRepository>,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    routes::router().with_state(state)
}

/// Serves until Ctrl-C.
pub async fn serve(state: AppState, bind: &str) -> Result<(), MediaqError> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| MediaqError::Server(format!("Failed to bind {}: {}", bind, e)))?;

    tracing::info!("Listening on {}", bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await
        .map_err(|e| MediaqError::Server(e.to_string()))?;

    tracing::info!("Server stopped");
    Ok(())
}
