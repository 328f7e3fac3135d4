//! Status delivery channels.
//!
//! A channel carries progress from the manager to a caller: a direct
//! callback for library/CLI use, or the shared registry for web pollers.
//! Delivery is fire-and-forget; a broken channel never fails the job that
//! feeds it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use super::models::JobSnapshot;
use super::registry::JobRegistry;

/// Caller-supplied function invoked with each status message.
pub type StatusCallback = Box<dyn Fn(&str) + Send + Sync>;

pub trait StatusChannel: Send + Sync {
    /// Deliver one snapshot. Must not block beyond short lock waits.
    fn publish(&self, snapshot: &JobSnapshot);
}

/// Channel that calls a caller-supplied function with the message string.
pub struct CallbackChannel {
    callback: StatusCallback,
}

impl CallbackChannel {
    pub fn new(callback: StatusCallback) -> Self {
        Self { callback }
    }
}

impl StatusChannel for CallbackChannel {
    fn publish(&self, snapshot: &JobSnapshot) {
        // A panicking callback must not take the worker down with it.
        let result = catch_unwind(AssertUnwindSafe(|| (self.callback)(&snapshot.message)));
        if result.is_err() {
            warn!("Status callback panicked for job {}", snapshot.id);
        }
    }
}

/// Channel that writes whole snapshots into the shared registry.
pub struct RegistryChannel {
    registry: Arc<JobRegistry>,
}

impl RegistryChannel {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }
}

impl StatusChannel for RegistryChannel {
    fn publish(&self, snapshot: &JobSnapshot) {
        self.registry.upsert(snapshot.clone());
    }
}
