//! Job lifecycle orchestration.
//!
//! One worker task per submitted job drives the state machine
//! `Queued → (Searching) → Downloading → Tagging → Complete`, with `Failed`
//! reachable from any non-terminal state. Every transition publishes a whole
//! snapshot to the registry and to any per-job channels; a failing channel
//! never affects the job itself.
//!
//! Partial files from a failed download are left on disk for the caller to
//! clean up; the manager never deletes anything.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::fetcher::{FetchSpec, FetchedMedia, MediaFetcher};
use crate::search::{Candidate, CandidateKind, SearchBackend};
use crate::tagger::{track_number_from_file_name, TagSet, TagWriter};

use super::models::{
    DownloadError, DownloadErrorKind, DownloadRequest, Job, JobSnapshot, JobState, RequestTarget,
};
use super::registry::JobRegistry;
use super::status_channel::{CallbackChannel, RegistryChannel, StatusCallback, StatusChannel};

/// Handle for one submitted job.
///
/// Cheap to move around; polling goes through [`JobHandle::snapshot`], and
/// blocking callers await [`JobHandle::wait`].
#[derive(Debug)]
pub struct JobHandle {
    id: String,
    cancel: CancellationToken,
    snapshots: watch::Receiver<JobSnapshot>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest snapshot, without blocking.
    pub fn snapshot(&self) -> JobSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Request best-effort cancellation (see [`DownloadManager::cancel`]).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the job reaches a terminal state and return that snapshot.
    pub async fn wait(&mut self) -> JobSnapshot {
        loop {
            if self.snapshots.borrow().state.is_terminal() {
                return self.snapshots.borrow().clone();
            }
            // The sender lives as long as the worker; a closed channel means
            // the worker is gone and the current value is final.
            if self.snapshots.changed().await.is_err() {
                return self.snapshots.borrow().clone();
            }
        }
    }
}

/// Orchestrates download jobs across the search, fetch, and tag collaborators.
pub struct DownloadManager {
    search_backend: Arc<dyn SearchBackend>,
    fetcher: Arc<dyn MediaFetcher>,
    tag_writer: Arc<dyn TagWriter>,
    registry: Arc<JobRegistry>,
    /// Cookies file passed through to the fetcher, when configured.
    cookies_file: Option<PathBuf>,
    /// Cancellation tokens of jobs whose worker is still running.
    active: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl DownloadManager {
    pub fn new(
        search_backend: Arc<dyn SearchBackend>,
        fetcher: Arc<dyn MediaFetcher>,
        tag_writer: Arc<dyn TagWriter>,
        registry: Arc<JobRegistry>,
    ) -> Self {
        Self {
            search_backend,
            fetcher,
            tag_writer,
            registry,
            cookies_file: None,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_cookies_file(mut self, cookies_file: Option<PathBuf>) -> Self {
        self.cookies_file = cookies_file;
        self
    }

    pub fn registry(&self) -> Arc<JobRegistry> {
        self.registry.clone()
    }

    /// Validate and queue a download; the submitting context never blocks on
    /// the download itself.
    ///
    /// Fails with `InvalidDestination` (and creates no job) when the
    /// destination directory cannot be created or written.
    pub fn submit(&self, request: DownloadRequest) -> Result<JobHandle, DownloadError> {
        self.submit_with_callback(request, None)
    }

    /// Like [`DownloadManager::submit`], with a per-job status callback that
    /// receives each transition message.
    pub fn submit_with_callback(
        &self,
        request: DownloadRequest,
        on_status: Option<StatusCallback>,
    ) -> Result<JobHandle, DownloadError> {
        validate_destination(&request.dest_dir)?;

        let job = Job::new(Uuid::new_v4().to_string(), request);
        let id = job.id.clone();
        let cancel = CancellationToken::new();
        let (updates, snapshots) = watch::channel(job.snapshot());

        let mut channels: Vec<Box<dyn StatusChannel>> =
            vec![Box::new(RegistryChannel::new(self.registry.clone()))];
        if let Some(callback) = on_status {
            channels.push(Box::new(CallbackChannel::new(callback)));
        }

        // Register the Queued snapshot before the worker starts so pollers
        // can observe the job immediately after submission returns.
        self.registry.upsert(job.snapshot());
        self.active
            .lock()
            .unwrap()
            .insert(id.clone(), cancel.clone());

        let worker = Worker {
            search_backend: self.search_backend.clone(),
            fetcher: self.fetcher.clone(),
            tag_writer: self.tag_writer.clone(),
            channels,
            updates,
            cancel: cancel.clone(),
            cookies_file: self.cookies_file.clone(),
            active: self.active.clone(),
        };

        info!("Queued download job {} ({})", id, job.title);
        tokio::spawn(worker.run(job));

        Ok(JobHandle {
            id,
            cancel,
            snapshots,
        })
    }

    /// Latest snapshot for a job id, or None if unknown or already evicted.
    /// Never blocks.
    pub fn status(&self, job_id: &str) -> Option<JobSnapshot> {
        self.registry.get(job_id)
    }

    /// Best-effort cancellation: a job that has not started its fetch fails
    /// with `Cancelled`; an in-flight fetch is never pre-empted and the job
    /// completes naturally.
    pub fn cancel(&self, handle: &JobHandle) {
        handle.cancel();
    }

    /// Cancel by id. Returns false when no such job is running.
    pub fn cancel_job(&self, job_id: &str) -> bool {
        match self.active.lock().unwrap().get(job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

fn validate_destination(dest_dir: &Path) -> Result<(), DownloadError> {
    std::fs::create_dir_all(dest_dir).map_err(|e| {
        DownloadError::new(
            DownloadErrorKind::InvalidDestination,
            format!("Cannot create destination {:?}: {}", dest_dir, e),
        )
    })?;
    // Probe with an actual write, not permission bits.
    tempfile::tempfile_in(dest_dir).map_err(|e| {
        DownloadError::new(
            DownloadErrorKind::InvalidDestination,
            format!("Destination {:?} is not writable: {}", dest_dir, e),
        )
    })?;
    Ok(())
}

/// Per-job worker owning the channels and the job's cancellation token.
struct Worker {
    search_backend: Arc<dyn SearchBackend>,
    fetcher: Arc<dyn MediaFetcher>,
    tag_writer: Arc<dyn TagWriter>,
    channels: Vec<Box<dyn StatusChannel>>,
    updates: watch::Sender<JobSnapshot>,
    cancel: CancellationToken,
    cookies_file: Option<PathBuf>,
    active: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl Worker {
    async fn run(self, job: Job) {
        let id = job.id.clone();
        self.drive(job).await;
        self.active.lock().unwrap().remove(&id);
    }

    async fn drive(&self, mut job: Job) {
        // Resolve a query target through the Searching state first.
        let candidate = match job.request.target.clone() {
            RequestTarget::Resolved(candidate) => candidate,
            RequestTarget::Query(query) => {
                self.transition(&mut job, JobState::Searching, "Searching...".to_string());
                match self.search_backend.search(&query, None, 1).await {
                    Ok(results) => match results.into_iter().next() {
                        Some(candidate) => {
                            job.title = candidate.title.clone();
                            candidate
                        }
                        None => {
                            self.fail(
                                &mut job,
                                DownloadError::new(
                                    DownloadErrorKind::SearchFailed,
                                    format!("No results for {:?}", query),
                                ),
                            );
                            return;
                        }
                    },
                    Err(e) => {
                        self.fail(
                            &mut job,
                            DownloadError::new(
                                DownloadErrorKind::SearchFailed,
                                format!("Search failed: {:#}", e),
                            ),
                        );
                        return;
                    }
                }
            }
        };

        // Last point where cancellation can win; an in-flight fetch is never
        // pre-empted.
        if self.cancel.is_cancelled() {
            self.fail(
                &mut job,
                DownloadError::new(
                    DownloadErrorKind::Cancelled,
                    "Cancelled before the download started",
                ),
            );
            return;
        }

        self.transition(
            &mut job,
            JobState::Downloading,
            format!("Downloading {}...", candidate.title),
        );

        let spec = FetchSpec {
            dest_dir: job.request.dest_dir.clone(),
            format: job.request.format,
            quality: job.request.quality,
            cookies_file: self.cookies_file.clone(),
        };

        let media = match self.fetcher.fetch(&candidate, &spec).await {
            Ok(media) => media,
            Err(e) => {
                self.fail(
                    &mut job,
                    DownloadError::new(DownloadErrorKind::FetchError, format!("{:#}", e)),
                );
                return;
            }
        };

        self.transition(&mut job, JobState::Tagging, "Tagging...".to_string());

        // Tagging failures never discard a finished download.
        if let Err(warning) = self.tag_files(&candidate, &media) {
            warn!("Job {}: {}", job.id, warning);
            job.warning = Some(warning);
        }

        job.file_path = Some(media.primary_path.clone());
        let message = match &job.warning {
            Some(warning) => format!("Done: {} ({})", media.primary_path.display(), warning),
            None => format!("Done: {}", media.primary_path.display()),
        };
        self.transition(&mut job, JobState::Complete, message);
    }

    fn tag_files(&self, candidate: &Candidate, media: &FetchedMedia) -> Result<(), String> {
        let album = match candidate.kind {
            CandidateKind::Album => Some(candidate.title.clone()),
            CandidateKind::Song => candidate.album.clone(),
        };

        let mut failures = Vec::new();
        for file in &media.files {
            let tags = TagSet {
                title: None,
                artist: Some(candidate.artist.clone()),
                album_artist: Some(candidate.artist.clone()),
                album: album.clone(),
                track_number: track_number_from_file_name(file),
            };
            if let Err(e) = self.tag_writer.write_tags(file, &tags) {
                failures.push(format!(
                    "{}: {}",
                    file.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.display().to_string()),
                    e
                ));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "tag write failed for {} file(s): {}",
                failures.len(),
                failures.join("; ")
            ))
        }
    }

    fn fail(&self, job: &mut Job, error: DownloadError) {
        job.error = Some(error.clone());
        self.transition(job, JobState::Failed, format!("Failed: {}", error));
    }

    fn transition(&self, job: &mut Job, state: JobState, message: String) {
        debug!("Job {}: {:?} -> {:?} ({})", job.id, job.state, state, message);
        job.state = state;
        job.message = message;
        if state.is_terminal() {
            job.completed_at = Some(chrono::Utc::now().timestamp());
        }

        let snapshot = job.snapshot();
        // send only errors when the handle is gone; the registry below still
        // gets the update.
        let _ = self.updates.send(snapshot.clone());
        for channel in &self.channels {
            channel.publish(&snapshot);
        }
    }
}
