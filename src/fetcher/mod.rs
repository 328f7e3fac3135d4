//! Media fetcher trait and fetch models.
//!
//! The fetcher is the collaborator that actually retrieves and transcodes
//! audio. The production implementation shells out to yt-dlp; tests use
//! stubs that write files directly.

mod ytdlp;

pub use ytdlp::YtDlpFetcher;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::search::{Candidate, CandidateKind};

/// Audio container/codec for the final files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
    Opus,
    Flac,
}

impl AudioFormat {
    /// The value passed to yt-dlp's --audio-format, which doubles as the
    /// file extension of the produced files.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Opus => "opus",
            AudioFormat::Flac => "flac",
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        AudioFormat::M4a
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" => Ok(AudioFormat::M4a),
            "opus" => Ok(AudioFormat::Opus),
            "flac" => Ok(AudioFormat::Flac),
            other => Err(anyhow::anyhow!("Unknown audio format: {}", other)),
        }
    }
}

/// Requested audio quality: best available, or a target bitrate in kbps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AudioQuality {
    Best,
    Kbps(u32),
}

impl AudioQuality {
    /// The value passed to yt-dlp's --audio-quality ("0" means best).
    pub fn ytdlp_arg(&self) -> String {
        match self {
            AudioQuality::Best => "0".to_string(),
            AudioQuality::Kbps(rate) => format!("{}K", rate),
        }
    }
}

impl Default for AudioQuality {
    fn default() -> Self {
        AudioQuality::Kbps(192)
    }
}

impl std::str::FromStr for AudioQuality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        if value == "best" {
            return Ok(AudioQuality::Best);
        }
        let digits = value.trim_end_matches('k');
        match digits.parse::<u32>() {
            Ok(rate) if rate > 0 => Ok(AudioQuality::Kbps(rate)),
            _ => Err(anyhow::anyhow!(
                "Invalid audio quality (expected \"best\" or a bitrate like \"192k\"): {}",
                s
            )),
        }
    }
}

impl std::fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioQuality::Best => write!(f, "best"),
            AudioQuality::Kbps(rate) => write!(f, "{}k", rate),
        }
    }
}

impl TryFrom<String> for AudioQuality {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map_err(|e: anyhow::Error| e.to_string())
    }
}

impl From<AudioQuality> for String {
    fn from(value: AudioQuality) -> Self {
        value.to_string()
    }
}

/// Where and how the fetcher should place audio.
#[derive(Debug, Clone)]
pub struct FetchSpec {
    /// Root destination directory; artist/album subdirectories are created
    /// underneath it.
    pub dest_dir: PathBuf,
    pub format: AudioFormat,
    pub quality: AudioQuality,
    /// Optional cookies file passed through to the fetcher backend.
    pub cookies_file: Option<PathBuf>,
}

/// The files a fetch produced.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    /// The file reported back to the caller (the single track, or the first
    /// track of an album).
    pub primary_path: PathBuf,
    /// All audio files produced, in track order for albums.
    pub files: Vec<PathBuf>,
}

/// Collaborator that retrieves and encodes audio for a candidate.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, candidate: &Candidate, spec: &FetchSpec) -> anyhow::Result<FetchedMedia>;
}

/// Strip path separators and other characters that are unsafe in file names.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.').to_string();
    if trimmed.is_empty() {
        "Unknown".to_string()
    } else {
        trimmed
    }
}

/// Directory a candidate's files land in: `<dest>/<artist>/<album>`.
///
/// Songs without album metadata fall back to a "Singles" folder; for album
/// candidates the album name is the candidate title itself.
pub fn output_dir_for(candidate: &Candidate, dest_dir: &Path) -> PathBuf {
    let artist = sanitize_component(&candidate.artist);
    let album = match candidate.kind {
        CandidateKind::Album => sanitize_component(&candidate.title),
        CandidateKind::Song => candidate
            .album
            .as_deref()
            .map(sanitize_component)
            .unwrap_or_else(|| "Singles".to_string()),
    };
    dest_dir.join(artist).join(album)
}
