//! Data models for the download manager.
//!
//! Defines jobs, their states, snapshots, and the fatal error taxonomy.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::fetcher::{AudioFormat, AudioQuality};
use crate::search::Candidate;

/// State of a download job.
///
/// States only advance forward through the sequence, or jump straight to
/// Failed; a job reaches exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Searching,
    Downloading,
    Tagging,
    Complete, // terminal
    Failed,   // terminal
}

impl JobState {
    /// Returns true if this is a terminal state (Complete or Failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }
}

/// Kind of fatal error a job (or a submission) can end with.
///
/// Tag write failures are deliberately absent: they are surfaced as a
/// non-fatal warning on an otherwise complete job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadErrorKind {
    /// Destination directory missing/unwritable; rejected before a job exists.
    InvalidDestination,
    /// Query resolution failed or returned nothing.
    SearchFailed,
    /// The media fetcher failed; no partial success.
    FetchError,
    /// Cancelled while still queued.
    Cancelled,
}

impl DownloadErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadErrorKind::InvalidDestination => "invalid_destination",
            DownloadErrorKind::SearchFailed => "search_failed",
            DownloadErrorKind::FetchError => "fetch_error",
            DownloadErrorKind::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "invalid_destination" => Some(DownloadErrorKind::InvalidDestination),
            "search_failed" => Some(DownloadErrorKind::SearchFailed),
            "fetch_error" => Some(DownloadErrorKind::FetchError),
            "cancelled" => Some(DownloadErrorKind::Cancelled),
            _ => None,
        }
    }
}

/// A fatal download error with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct DownloadError {
    pub kind: DownloadErrorKind,
    pub message: String,
}

impl DownloadError {
    pub fn new(kind: DownloadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// What a download request points at: an already-resolved candidate, or a
/// free-text query the manager resolves through the Searching state.
#[derive(Debug, Clone)]
pub enum RequestTarget {
    Resolved(Candidate),
    Query(String),
}

impl RequestTarget {
    /// Display title before the candidate is known.
    pub fn display_title(&self) -> &str {
        match self {
            RequestTarget::Resolved(candidate) => &candidate.title,
            RequestTarget::Query(query) => query,
        }
    }
}

/// A download request: target plus destination and encoding options.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub target: RequestTarget,
    pub dest_dir: PathBuf,
    pub quality: AudioQuality,
    pub format: AudioFormat,
}

impl DownloadRequest {
    /// Request for an already-selected candidate with default encoding.
    pub fn new(candidate: Candidate, dest_dir: PathBuf) -> Self {
        Self {
            target: RequestTarget::Resolved(candidate),
            dest_dir,
            quality: AudioQuality::default(),
            format: AudioFormat::default(),
        }
    }

    /// Request resolving a free-text query to its first search result.
    pub fn for_query(query: impl Into<String>, dest_dir: PathBuf) -> Self {
        Self {
            target: RequestTarget::Query(query.into()),
            dest_dir,
            quality: AudioQuality::default(),
            format: AudioFormat::default(),
        }
    }

    pub fn with_quality(mut self, quality: AudioQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }
}

/// One tracked download from submission to terminal outcome.
///
/// Mutated only by the manager's worker task; everyone else sees snapshots.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub state: JobState,
    pub request: DownloadRequest,
    /// Display title; updated once a query target resolves.
    pub title: String,
    /// Last status message emitted.
    pub message: String,
    /// Non-fatal warning (tag write failures).
    pub warning: Option<String>,
    /// Final audio file path, present once Complete.
    pub file_path: Option<PathBuf>,
    /// Error detail, present once Failed.
    pub error: Option<DownloadError>,
    /// When the job was submitted (Unix timestamp).
    pub created_at: i64,
    /// When the job reached a terminal state.
    pub completed_at: Option<i64>,
}

impl Job {
    pub fn new(id: String, request: DownloadRequest) -> Self {
        let title = request.target.display_title().to_string();
        Self {
            id,
            state: JobState::Queued,
            title,
            request,
            message: "Queued".to_string(),
            warning: None,
            file_path: None,
            error: None,
            created_at: chrono::Utc::now().timestamp(),
            completed_at: None,
        }
    }

    /// Whole-value snapshot for registries and pollers.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            state: self.state,
            title: self.title.clone(),
            message: self.message.clone(),
            warning: self.warning.clone(),
            file_path: self.file_path.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

/// Point-in-time view of a job, as served to pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: String,
    pub state: JobState,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub error: Option<DownloadError>,
    pub created_at: i64,
    #[serde(default)]
    pub completed_at: Option<i64>,
}
