//! Search API routes

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::search::CandidateKind;

use super::state::{GuardedSearchBackend, ServerState};

const DEFAULT_SEARCH_LIMIT: usize = 20;
const MAX_SEARCH_LIMIT: usize = 50;

lazy_static! {
    // Free-text queries reach an external service; keep them to a sane
    // character set and length.
    static ref ALLOWED_QUERY_RE: Regex = Regex::new(r#"^[\w\s\-\.,!'"()&]{1,200}$"#).unwrap();
}

fn is_valid_query(query: &str) -> bool {
    !query.is_empty() && ALLOWED_QUERY_RE.is_match(query)
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    pub query: String,

    /// Restrict results to songs or albums; both when absent.
    pub kind: Option<CandidateKind>,

    /// Maximum number of results to return (default: 20).
    pub limit: Option<usize>,
}

async fn search(
    State(search_backend): State<GuardedSearchBackend>,
    Json(body): Json<SearchBody>,
) -> Response {
    let query = body.query.trim();
    if !is_valid_query(query) {
        return (StatusCode::BAD_REQUEST, "Invalid query").into_response();
    }

    let limit = body
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .min(MAX_SEARCH_LIMIT);

    match search_backend.search(query, body.kind, limit).await {
        Ok(candidates) => Json(candidates).into_response(),
        Err(e) => {
            warn!("Search for {:?} failed: {:#}", query, e);
            (StatusCode::BAD_GATEWAY, "Search backend failed").into_response()
        }
    }
}

pub fn search_routes() -> Router<ServerState> {
    Router::new().route("/search", post(search))
}
