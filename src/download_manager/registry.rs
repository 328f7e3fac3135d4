//! In-memory job registry.
//!
//! Single writer per job id, many readers. Every write replaces the whole
//! snapshot value under the lock, so a reader observes either the previous
//! or the new snapshot, never a torn one. Terminal snapshots are retained
//! for pollers until pruned by the retention policy.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use super::models::JobSnapshot;

pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobSnapshot>>,
    /// How long terminal snapshots are kept before prune() drops them.
    retention_secs: i64,
}

impl JobRegistry {
    pub fn new(retention_secs: i64) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention_secs,
        }
    }

    /// Insert or replace the snapshot for a job id.
    pub fn upsert(&self, snapshot: JobSnapshot) {
        let mut jobs = self.jobs.write().unwrap();
        jobs.insert(snapshot.id.clone(), snapshot);
    }

    /// Latest snapshot for a job id, or None if unknown (or already evicted).
    pub fn get(&self, job_id: &str) -> Option<JobSnapshot> {
        self.jobs.read().unwrap().get(job_id).cloned()
    }

    /// All snapshots, newest submissions first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> =
            self.jobs.read().unwrap().values().cloned().collect();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().unwrap().is_empty()
    }

    /// Drop terminal snapshots whose completion is older than the retention
    /// window. Running jobs are never evicted. Returns the number removed.
    pub fn prune(&self, now: i64) -> usize {
        let cutoff = now - self.retention_secs;
        let mut jobs = self.jobs.write().unwrap();
        let before = jobs.len();
        jobs.retain(|_, snapshot| {
            !(snapshot.state.is_terminal()
                && snapshot.completed_at.map(|t| t < cutoff).unwrap_or(false))
        });
        let removed = before - jobs.len();
        if removed > 0 {
            debug!("Pruned {} finished download job(s) from registry", removed);
        }
        removed
    }
}
