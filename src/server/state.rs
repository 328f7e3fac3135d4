use axum::extract::FromRef;

use crate::download_manager::{DownloadManager, JobRegistry};
use crate::search::SearchBackend;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSearchBackend = Arc<dyn SearchBackend>;
pub type GuardedDownloadManager = Arc<DownloadManager>;
pub type GuardedJobRegistry = Arc<JobRegistry>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub search_backend: GuardedSearchBackend,
    pub download_manager: GuardedDownloadManager,
    pub job_registry: GuardedJobRegistry,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedSearchBackend {
    fn from_ref(input: &ServerState) -> Self {
        input.search_backend.clone()
    }
}

impl FromRef<ServerState> for GuardedDownloadManager {
    fn from_ref(input: &ServerState) -> Self {
        input.download_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedJobRegistry {
    fn from_ref(input: &ServerState) -> Self {
        input.job_registry.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
