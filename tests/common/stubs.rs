//! Stub collaborators for driving the server without network access.

use std::path::Path;

use async_trait::async_trait;

use tunegrab::fetcher::{
    output_dir_for, sanitize_component, FetchSpec, FetchedMedia, MediaFetcher,
};
use tunegrab::search::{Candidate, CandidateKind, SearchBackend};
use tunegrab::tagger::{TagSet, TagWriter};

pub fn fixed_candidates() -> Vec<Candidate> {
    vec![
        Candidate {
            id: "vid-1".to_string(),
            kind: CandidateKind::Song,
            title: "Nothing Matters".to_string(),
            artist: "Vince Staples".to_string(),
            album: Some("Dark Times".to_string()),
            duration_secs: Some(201),
            thumbnail_url: None,
        },
        Candidate {
            id: "vid-2".to_string(),
            kind: CandidateKind::Song,
            title: "Shame on the Devil".to_string(),
            artist: "Vince Staples".to_string(),
            album: Some("Dark Times".to_string()),
            duration_secs: Some(184),
            thumbnail_url: None,
        },
    ]
}

/// Search backend returning the same two candidates for every query.
pub struct FixedSearchBackend;

#[async_trait]
impl SearchBackend for FixedSearchBackend {
    async fn search(
        &self,
        _query: &str,
        _kind: Option<CandidateKind>,
        limit: usize,
    ) -> anyhow::Result<Vec<Candidate>> {
        Ok(fixed_candidates().into_iter().take(limit).collect())
    }
}

/// Search backend that finds nothing.
pub struct EmptySearchBackend;

#[async_trait]
impl SearchBackend for EmptySearchBackend {
    async fn search(
        &self,
        _query: &str,
        _kind: Option<CandidateKind>,
        _limit: usize,
    ) -> anyhow::Result<Vec<Candidate>> {
        Ok(Vec::new())
    }
}

/// Fetcher that writes a small file where the real one would.
pub struct WritingFetcher;

#[async_trait]
impl MediaFetcher for WritingFetcher {
    async fn fetch(&self, candidate: &Candidate, spec: &FetchSpec) -> anyhow::Result<FetchedMedia> {
        let dir = output_dir_for(candidate, &spec.dest_dir);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!(
            "{}.{}",
            sanitize_component(&candidate.title),
            spec.format.extension()
        ));
        std::fs::write(&path, b"stub audio")?;
        Ok(FetchedMedia {
            primary_path: path.clone(),
            files: vec![path],
        })
    }
}

/// Fetcher that always fails.
pub struct FailingFetcher;

#[async_trait]
impl MediaFetcher for FailingFetcher {
    async fn fetch(&self, _: &Candidate, _: &FetchSpec) -> anyhow::Result<FetchedMedia> {
        anyhow::bail!("simulated network failure")
    }
}

/// Tag writer that accepts everything.
pub struct NoopTagWriter;

impl TagWriter for NoopTagWriter {
    fn write_tags(&self, _: &Path, _: &TagSet) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Tag writer that always fails.
pub struct FailingTagWriter;

impl TagWriter for FailingTagWriter {
    fn write_tags(&self, _: &Path, _: &TagSet) -> anyhow::Result<()> {
        anyhow::bail!("simulated missing tag header")
    }
}
