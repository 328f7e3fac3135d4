//! Media fetcher backed by the yt-dlp binary.
//!
//! yt-dlp handles extraction and drives ffmpeg for transcoding; this module
//! only builds the invocation and collects what landed on disk. Albums are
//! fetched as playlists with a track-number output template so the tagger
//! can later recover track numbers from file names.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::search::{Candidate, CandidateKind};

use super::{output_dir_for, sanitize_component, FetchSpec, FetchedMedia, MediaFetcher};

/// Fetcher that shells out to yt-dlp.
pub struct YtDlpFetcher {
    binary: PathBuf,
    http: reqwest::Client,
}

impl YtDlpFetcher {
    /// Use `yt-dlp` from PATH.
    pub fn new() -> Self {
        Self::with_binary(PathBuf::from("yt-dlp"))
    }

    /// Use an explicit yt-dlp binary path.
    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            http: reqwest::Client::new(),
        }
    }

    /// Save the candidate's cover art next to the audio files.
    ///
    /// yt-dlp already embeds a thumbnail in each file; the folder copy is for
    /// library browsers that look for cover.jpg.
    async fn save_cover_art(&self, url: &str, out_dir: &Path) -> Result<()> {
        let path = out_dir.join("cover.jpg");
        if path.exists() {
            return Ok(());
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("Failed to fetch cover art")?;
        if !response.status().is_success() {
            bail!("Cover art fetch failed with status: {}", response.status());
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read cover art body")?;
        tokio::fs::write(&path, &bytes)
            .await
            .context("Failed to write cover art")?;
        Ok(())
    }

    fn output_template(candidate: &Candidate, out_dir: &Path) -> PathBuf {
        match candidate.kind {
            CandidateKind::Song => {
                out_dir.join(format!("{}.%(ext)s", sanitize_component(&candidate.title)))
            }
            // Albums are playlists; prefix each track with its index so file
            // name ordering matches track ordering.
            CandidateKind::Album => out_dir.join("%(playlist_index)02d - %(title)s.%(ext)s"),
        }
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, candidate: &Candidate, spec: &FetchSpec) -> Result<FetchedMedia> {
        let out_dir = output_dir_for(candidate, &spec.dest_dir);
        tokio::fs::create_dir_all(&out_dir)
            .await
            .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;

        let template = Self::output_template(candidate, &out_dir);

        let mut command = Command::new(&self.binary);
        command
            .arg("--format")
            .arg("bestaudio/best")
            .arg("--extract-audio")
            .arg("--audio-format")
            .arg(spec.format.extension())
            .arg("--audio-quality")
            .arg(spec.quality.ytdlp_arg())
            .arg("--embed-thumbnail")
            .arg("--embed-metadata")
            .arg("--no-progress")
            .arg("--newline")
            .arg("--output")
            .arg(&template);

        if let Some(cookies) = &spec.cookies_file {
            command.arg("--cookies").arg(cookies);
        }

        command.arg(candidate.media_url());

        debug!("Invoking yt-dlp for {:?} into {:?}", candidate.title, out_dir);

        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to run yt-dlp ({:?})", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "yt-dlp exited with {}: {}",
                output.status,
                last_lines(&stderr, 4)
            );
        }

        let mut files = collect_audio_files(&out_dir, spec.format.extension());
        if files.is_empty() {
            bail!(
                "yt-dlp reported success but produced no .{} files in {:?}",
                spec.format.extension(),
                out_dir
            );
        }
        files.sort();

        // For a single song, prefer the exact expected file over anything
        // else already in the folder.
        let expected = out_dir.join(format!(
            "{}.{}",
            sanitize_component(&candidate.title),
            spec.format.extension()
        ));
        let primary_path = if candidate.kind == CandidateKind::Song && expected.exists() {
            expected
        } else {
            files[0].clone()
        };

        // Cover art is a nicety; never fail the fetch over it.
        if let Some(thumbnail_url) = &candidate.thumbnail_url {
            if let Err(e) = self.save_cover_art(thumbnail_url, &out_dir).await {
                warn!("Could not save cover art for {:?}: {:#}", candidate.title, e);
            }
        }

        info!(
            "Fetched {} file(s) for {:?} into {:?}",
            files.len(),
            candidate.title,
            out_dir
        );

        Ok(FetchedMedia {
            primary_path,
            files,
        })
    }
}

/// All files with the given extension under `dir` (recursive, to tolerate
/// extractor-created subfolders).
fn collect_audio_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join(" | ")
}
