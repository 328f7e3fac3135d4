use std::sync::Arc;

use tempfile::TempDir;

use tunegrab::download_manager::{DownloadManager, JobRegistry};
use tunegrab::fetcher::MediaFetcher;
use tunegrab::search::SearchBackend;
use tunegrab::server::{make_app, ServerConfig};
use tunegrab::tagger::TagWriter;

use super::stubs::{
    EmptySearchBackend, FailingFetcher, FailingTagWriter, FixedSearchBackend, NoopTagWriter,
    WritingFetcher,
};

/// Which stub collaborators the test server runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    /// Search finds candidates, fetches succeed, tags succeed.
    Success,
    /// Search finds candidates, fetches fail.
    FailingFetch,
    /// Search finds candidates, fetches succeed, tag writes fail.
    FailingTags,
    /// Search finds nothing.
    EmptySearch,
}

pub struct TestServer {
    pub base_url: String,
    /// Kept alive so downloaded stub files survive until the test ends.
    pub downloads_dir: TempDir,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(StubBehavior::Success).await
    }

    pub async fn spawn_with(behavior: StubBehavior) -> Self {
        let downloads_dir = TempDir::new().expect("create downloads dir");

        let search_backend: Arc<dyn SearchBackend> = match behavior {
            StubBehavior::EmptySearch => Arc::new(EmptySearchBackend),
            _ => Arc::new(FixedSearchBackend),
        };
        let fetcher: Arc<dyn MediaFetcher> = match behavior {
            StubBehavior::FailingFetch => Arc::new(FailingFetcher),
            _ => Arc::new(WritingFetcher),
        };
        let tag_writer: Arc<dyn TagWriter> = match behavior {
            StubBehavior::FailingTags => Arc::new(FailingTagWriter),
            _ => Arc::new(NoopTagWriter),
        };

        let manager = Arc::new(DownloadManager::new(
            search_backend.clone(),
            fetcher,
            tag_writer,
            Arc::new(JobRegistry::new(3600)),
        ));

        let config = ServerConfig {
            downloads_dir: downloads_dir.path().to_path_buf(),
            ..Default::default()
        };
        let app = make_app(config, search_backend, manager);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            base_url: format!("http://{}", addr),
            downloads_dir,
        }
    }
}
