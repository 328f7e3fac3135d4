//! Search backend trait and candidate types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kind of content a search candidate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Song,
    Album,
}

impl CandidateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateKind::Song => "song",
            CandidateKind::Album => "album",
        }
    }
}

/// One search result available for download.
///
/// Immutable once returned; owned by the caller after retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Source identifier (video id for songs, browse id for albums).
    pub id: String,
    pub kind: CandidateKind,
    pub title: String,
    /// Primary artist name.
    pub artist: String,
    /// Album name, when known (songs only; albums carry their own title).
    #[serde(default)]
    pub album: Option<String>,
    /// Duration in seconds, when known.
    #[serde(default)]
    pub duration_secs: Option<u32>,
    /// Cover art URL, when available.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl Candidate {
    /// The URL handed to the media fetcher for this candidate.
    pub fn media_url(&self) -> String {
        match self.kind {
            CandidateKind::Song => format!("https://music.youtube.com/watch?v={}", self.id),
            CandidateKind::Album => format!("https://music.youtube.com/browse/{}", self.id),
        }
    }
}

/// Backend capable of resolving a free-text query into candidates.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Search for candidates matching `query`, ordered by relevance.
    ///
    /// When `kind` is None both songs and albums are returned, songs first.
    async fn search(
        &self,
        query: &str,
        kind: Option<CandidateKind>,
        limit: usize,
    ) -> anyhow::Result<Vec<Candidate>>;
}

/// A search backend that returns no results.
/// Used for tests and for running the server without network access.
pub struct NoopSearchBackend;

#[async_trait]
impl SearchBackend for NoopSearchBackend {
    async fn search(
        &self,
        _query: &str,
        _kind: Option<CandidateKind>,
        _limit: usize,
    ) -> anyhow::Result<Vec<Candidate>> {
        Ok(Vec::new())
    }
}
