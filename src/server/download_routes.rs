//! Download job HTTP routes.
//!
//! Provides endpoints for:
//! - Queuing a download (by candidate or by free-text query)
//! - Polling a job snapshot by id
//! - Listing all live snapshots
//! - Best-effort cancellation

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::download_manager::{DownloadErrorKind, DownloadRequest, JobState, RequestTarget};
use crate::fetcher::{AudioFormat, AudioQuality};
use crate::search::Candidate;

use super::state::{GuardedJobRegistry, ServerState};

#[derive(Debug, Deserialize)]
struct DownloadBody {
    /// A candidate picked from a previous search response.
    pub candidate: Option<Candidate>,
    /// Alternatively, a free-text query; the first result is downloaded.
    pub query: Option<String>,
    pub quality: Option<AudioQuality>,
    pub format: Option<AudioFormat>,
}

#[derive(Debug, Serialize)]
struct DownloadAccepted {
    pub job_id: String,
    pub state: JobState,
}

/// POST /download - queue a new download job
async fn submit_download(
    State(state): State<ServerState>,
    Json(body): Json<DownloadBody>,
) -> Response {
    let target = match (body.candidate, body.query) {
        (Some(candidate), _) => RequestTarget::Resolved(candidate),
        (None, Some(query)) if !query.trim().is_empty() => {
            RequestTarget::Query(query.trim().to_string())
        }
        _ => {
            return (StatusCode::BAD_REQUEST, "Provide a candidate or a query").into_response();
        }
    };

    let request = DownloadRequest {
        target,
        dest_dir: state.config.downloads_dir.clone(),
        quality: body.quality.unwrap_or(state.config.default_quality),
        format: body.format.unwrap_or(state.config.default_format),
    };

    match state.download_manager.submit(request) {
        Ok(handle) => {
            let snapshot = handle.snapshot();
            debug!("Queued download job {} via web", handle.id());
            (
                StatusCode::ACCEPTED,
                Json(DownloadAccepted {
                    job_id: handle.id().to_string(),
                    state: snapshot.state,
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!("Download submission rejected: {}", e);
            // The destination is server-side configuration, so its failure
            // is not the client's fault.
            let status = match e.kind {
                DownloadErrorKind::InvalidDestination => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, e.to_string()).into_response()
        }
    }
}

/// GET /download/{id} - poll one job snapshot
async fn get_download(
    State(registry): State<GuardedJobRegistry>,
    Path(job_id): Path<String>,
) -> Response {
    match registry.get(&job_id) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /downloads - list all live snapshots, newest first
async fn list_downloads(State(registry): State<GuardedJobRegistry>) -> Response {
    Json(registry.list()).into_response()
}

/// POST /download/{id}/cancel - best-effort cancellation
async fn cancel_download(
    State(state): State<ServerState>,
    Path(job_id): Path<String>,
) -> Response {
    if state.download_manager.cancel_job(&job_id) {
        return (StatusCode::ACCEPTED, "Cancellation requested").into_response();
    }
    // No running worker with that id: either the job already finished (its
    // snapshot is still pollable) or it never existed.
    match state.job_registry.get(&job_id) {
        Some(_) => (StatusCode::CONFLICT, "Job already finished").into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn download_routes() -> Router<ServerState> {
    Router::new()
        .route("/download", post(submit_download))
        .route("/download/{id}", get(get_download))
        .route("/download/{id}/cancel", post(cancel_download))
        .route("/downloads", get(list_downloads))
}
