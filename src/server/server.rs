use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::download_manager::DownloadManager;
use crate::search::SearchBackend;

use super::download_routes::download_routes;
use super::search_routes::search_routes;
use super::state::ServerState;
use super::{log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub jobs: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        jobs: state.job_registry.len(),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    search_backend: Arc<dyn SearchBackend>,
    download_manager: Arc<DownloadManager>,
) -> Router {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        search_backend,
        job_registry: download_manager.registry(),
        download_manager,
        hash: env!("GIT_HASH").to_string(),
    };

    let api_routes: Router = search_routes()
        .merge(download_routes())
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .nest("/v1", api_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(
    config: ServerConfig,
    search_backend: Arc<dyn SearchBackend>,
    download_manager: Arc<DownloadManager>,
    prune_interval_secs: u64,
) -> Result<()> {
    // Periodically evict finished jobs that nobody polls anymore.
    if prune_interval_secs > 0 {
        let registry = download_manager.registry();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(prune_interval_secs));

            // Skip the first immediate tick, wait for the first interval
            ticker.tick().await;

            loop {
                ticker.tick().await;
                registry.prune(chrono::Utc::now().timestamp());
            }
        });
    }

    let port = config.port;
    let app = make_app(config, search_backend, download_manager);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Ready to serve at port {}!", port);

    Ok(axum::serve(listener, app).await?)
}
