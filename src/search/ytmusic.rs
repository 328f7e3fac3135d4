//! YouTube Music search backend.
//!
//! Resolves queries against the YouTube Music catalog via rustypipe.
//! Song and album searches are separate upstream queries; a combined
//! search interleaves nothing and simply lists songs before albums,
//! which matches how callers present results.

use async_trait::async_trait;
use rustypipe::client::RustyPipe;
use tracing::debug;

use super::backend::{Candidate, CandidateKind, SearchBackend};

pub struct YtMusicSearchBackend {
    client: RustyPipe,
}

impl YtMusicSearchBackend {
    pub fn new() -> Self {
        Self {
            client: RustyPipe::new(),
        }
    }

    async fn search_songs(&self, query: &str, limit: usize) -> anyhow::Result<Vec<Candidate>> {
        let result = self.client.query().music_search_tracks(query).await?;

        let candidates = result
            .items
            .items
            .into_iter()
            .take(limit)
            .map(|track| Candidate {
                id: track.id,
                kind: CandidateKind::Song,
                title: track.name,
                artist: track
                    .artists
                    .first()
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| "Unknown Artist".to_string()),
                album: track.album.map(|a| a.name),
                duration_secs: track.duration,
                thumbnail_url: track.cover.first().map(|t| t.url.clone()),
            })
            .collect();

        Ok(candidates)
    }

    async fn search_albums(&self, query: &str, limit: usize) -> anyhow::Result<Vec<Candidate>> {
        let result = self.client.query().music_search_albums(query).await?;

        let candidates = result
            .items
            .items
            .into_iter()
            .take(limit)
            .map(|album| Candidate {
                id: album.id,
                kind: CandidateKind::Album,
                title: album.name,
                artist: album
                    .artists
                    .first()
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| "Unknown Artist".to_string()),
                album: None,
                duration_secs: None,
                thumbnail_url: album.cover.first().map(|t| t.url.clone()),
            })
            .collect();

        Ok(candidates)
    }
}

impl Default for YtMusicSearchBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for YtMusicSearchBackend {
    async fn search(
        &self,
        query: &str,
        kind: Option<CandidateKind>,
        limit: usize,
    ) -> anyhow::Result<Vec<Candidate>> {
        debug!("Searching YouTube Music for {:?} (kind={:?})", query, kind);

        let results = match kind {
            Some(CandidateKind::Song) => self.search_songs(query, limit).await?,
            Some(CandidateKind::Album) => self.search_albums(query, limit).await?,
            None => {
                let mut combined = self.search_songs(query, limit).await?;
                let albums = self.search_albums(query, limit).await?;
                combined.extend(albums);
                combined.truncate(limit);
                combined
            }
        };

        debug!("Search for {:?} returned {} candidates", query, results.len());
        Ok(results)
    }
}
