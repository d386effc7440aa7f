//! Intake, download and callback receiver routes.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::intake::{self, SubmitOutcome};
use crate::job::NewJob;
use crate::sanitize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/file", post(file_post))
        .route("/file/{id}", get(file_get))
        .route("/video", get(video_get))
        .route("/audio", get(audio_get))
        .route("/callback", get(callback_get).post(callback_post))
}

async fn banner() -> Html<&'static str> {
    Html("<p>mediaq downloader</p>")
}

/// Body of `POST /file`. `audio_only` may be a bool or a string like `"yes"`.
#[derive(Debug, Deserialize)]
pub struct FileRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub callback: String,
    #[serde(default)]
    pub audio_only: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub callback: String,
}

async fn file_post(
    State(state): State<AppState>,
    Json(body): Json<FileRequest>,
) -> ApiResult<String> {
    let request = NewJob {
        url: intake::percent_decode(&body.url),
        callback: intake::percent_decode(&body.callback),
        audio_only: body
            .audio_only
            .as_ref()
            .map(intake::json_to_bool)
            .unwrap_or(false),
    };
    queue(state, request).await
}

async fn video_get(State(state): State<AppState>, Query(query): Query<LinkQuery>) -> ApiResult<String> {
    queue(
        state,
        NewJob {
            url: query.url,
            callback: query.callback,
            audio_only: false,
        },
    )
    .await
}

async fn audio_get(State(state): State<AppState>, Query(query): Query<LinkQuery>) -> ApiResult<String> {
    queue(
        state,
        NewJob {
            url: query.url,
            callback: query.callback,
            audio_only: true,
        },
    )
    .await
}

async fn queue(state: AppState, request: NewJob) -> ApiResult<String> {
    let url = request.url.trim().to_string();
    let outcome = tokio::task::spawn_blocking(move || {
        intake::submit(state.repo.as_ref(), &state.config, request, Utc::now())
    })
    .await??;

    match outcome {
        SubmitOutcome::Queued { id, expiry } => Ok(format!(
            "Link queued ok: {} (job {}) expires on {}",
            url,
            id,
            expiry.to_rfc3339()
        )),
        SubmitOutcome::Duplicate => Err(ApiError::conflict(format!("Already queued: {}", url))),
    }
}

async fn file_get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Response> {
    let repo = state.repo.clone();
    let job = tokio::task::spawn_blocking(move || repo.find_completed(id))
        .await??
        .ok_or_else(|| ApiError::not_found(format!("No completed download with id {}", id)))?;

    let path = job
        .filename
        .ok_or_else(|| ApiError::not_found(format!("Download {} has no file", id)))?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(file = %sanitize::redact_path(&path), error = %e, "Completed file unavailable");
            return Err(ApiError::not_found(format!("File for download {} is missing", id)));
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let disposition = format!("attachment; filename=\"{}\"", sanitize::redact_path(&path));
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Completion report, as sent by an HTTP notification pointed back at us.
#[derive(Debug, Default, Deserialize)]
pub struct CompletedCallback {
    #[serde(default)]
    pub original_url: String,
    #[serde(default)]
    pub download_link: String,
    #[serde(default)]
    pub title: String,
}

impl CompletedCallback {
    fn acknowledge(&self) -> String {
        tracing::info!(
            original_url = %sanitize::redact_url(&self.original_url),
            download_link = %self.download_link,
            title = %self.title,
            "Download completed"
        );
        format!(
            "Callback ok: {} {} {}",
            self.original_url, self.download_link, self.title
        )
    }
}

async fn callback_get(Query(callback): Query<CompletedCallback>) -> String {
    callback.acknowledge()
}

async fn callback_post(Json(callback): Json<CompletedCallback>) -> String {
    callback.acknowledge()
}
