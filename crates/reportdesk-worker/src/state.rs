//! Observable job state.
//!
//! A single `watch` cell holds the [`JobSnapshot`]. Its `job_id` field is the
//! active job slot: only the controller changes it, and every write made on
//! behalf of a job goes through [`JobState::update_if_current`], which compares
//! and modifies in one step.

use chrono::Utc;
use reportdesk_core::models::{JobId, JobPhase, JobSnapshot};
use tokio::sync::watch;

#[derive(Debug)]
pub struct JobState {
    tx: watch::Sender<JobSnapshot>,
}

impl JobState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(JobSnapshot::idle());
        Self { tx }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.tx.borrow().clone()
    }

    /// The currently active job, read fresh on every call.
    pub fn active_job(&self) -> Option<JobId> {
        self.tx.borrow().job_id
    }

    pub fn is_current(&self, job_id: JobId) -> bool {
        self.active_job() == Some(job_id)
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.tx.subscribe()
    }

    /// Apply `f` only while `job_id` is still the active job. Returns whether it ran.
    pub(crate) fn update_if_current<F>(&self, job_id: JobId, f: F) -> bool
    where
        F: FnOnce(&mut JobSnapshot),
    {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.job_id != Some(job_id) {
                return false;
            }
            f(snapshot);
            snapshot.updated_at = Utc::now();
            true
        })
    }

    /// Enter VALIDATING unless a job is in flight. Returns the snapshot to restore.
    pub(crate) fn enter_validating(&self) -> Option<JobSnapshot> {
        let mut prior = None;
        self.tx.send_if_modified(|snapshot| {
            if snapshot.phase.is_in_flight() {
                return false;
            }
            prior = Some(snapshot.clone());
            snapshot.phase = JobPhase::Validating;
            snapshot.status_message = "Validating file...".to_string();
            snapshot.updated_at = Utc::now();
            true
        });
        prior
    }

    /// Put back the snapshot saved by [`enter_validating`](Self::enter_validating).
    pub(crate) fn restore(&self, prior: JobSnapshot) {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.phase != JobPhase::Validating {
                return false;
            }
            *snapshot = prior;
            true
        });
    }

    /// Make `job_id` the active job. Result and chat readiness are cleared in the same write.
    pub(crate) fn begin_job(&self, job_id: JobId, status_message: String) {
        self.tx.send_modify(|snapshot| {
            *snapshot = JobSnapshot {
                job_id: Some(job_id),
                phase: JobPhase::Uploading,
                status_message,
                ..JobSnapshot::idle()
            };
        });
    }

    /// Back to IDLE with no active job.
    pub(crate) fn reset(&self) {
        self.tx.send_replace(JobSnapshot::idle());
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::new()
    }
}
