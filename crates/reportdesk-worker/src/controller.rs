//! Job submission controller.
//!
//! Drives `IDLE -> VALIDATING -> UPLOADING -> PROCESSING -> {COMPLETED | FAILED | TIMED_OUT}`
//! and owns the active job slot. Submitting or resetting cancels the running
//! poll loop before anything else changes.

use std::sync::{Arc, Mutex, PoisonError};

use reportdesk_core::models::{new_job_identity, JobId, JobPhase, JobSnapshot, SubmittedFile};
use reportdesk_core::{
    ClientConfig, ErrorMetadata, JobBackend, JobError, PollSettings, SubmissionValidator,
};
use tokio::sync::watch;

use crate::chat::ChatGate;
use crate::poller::{PollHandle, StatusPoller};
use crate::state::JobState;
use crate::upload::UploadCoordinator;

pub struct JobController {
    backend: Arc<dyn JobBackend>,
    validator: SubmissionValidator,
    settings: PollSettings,
    state: Arc<JobState>,
    uploads: UploadCoordinator,
    poll: Mutex<Option<PollHandle>>,
}

impl JobController {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        validator: SubmissionValidator,
        settings: PollSettings,
    ) -> Self {
        Self {
            uploads: UploadCoordinator::new(backend.clone()),
            backend,
            validator,
            settings,
            state: Arc::new(JobState::new()),
            poll: Mutex::new(None),
        }
    }

    pub fn from_config(backend: Arc<dyn JobBackend>, config: &ClientConfig) -> Self {
        Self::new(
            backend,
            SubmissionValidator::new(&config.accepted_extension, config.max_upload_bytes),
            config.poll,
        )
    }

    /// Submit one archive as a new job. Returns once polling has started.
    ///
    /// A validation failure leaves any job already in flight untouched. On
    /// success the previous poll loop is cancelled, a new id is minted, and the
    /// previous result is cleared before the upload begins.
    pub async fn submit(&self, files: Vec<SubmittedFile>) -> Result<JobId, JobError> {
        let prior = self.state.enter_validating();

        let file = match self.validator.validate(&files) {
            Ok(file) => file.clone(),
            Err(e) => {
                if let Some(prior) = prior {
                    self.state.restore(prior);
                }
                tracing::debug!(error = %e, "Submission rejected");
                return Err(e.into());
            }
        };

        self.cancel_polling();

        let job_id = new_job_identity();
        self.state
            .begin_job(job_id, format!("Uploading {}...", file.file_name));

        tracing::info!(
            job_id = %job_id,
            file_name = %file.file_name,
            size_bytes = file.size_bytes(),
            "Submitting report"
        );

        let upload = self.uploads.upload(&file, job_id).await;

        if !self.state.is_current(job_id) {
            tracing::debug!(job_id = %job_id, "Upload finished for superseded job, discarding");
            return Err(JobError::Superseded(job_id));
        }

        if let Some(failure) = upload.error {
            let error = JobError::from(failure);
            let message = error.user_message();
            // Clearing the active id makes the next submit start clean.
            self.state.update_if_current(job_id, |s| {
                s.job_id = None;
                s.phase = JobPhase::Failed;
                s.status_message = message.clone();
                s.error = Some(message);
            });
            return Err(error);
        }

        let processing = self.state.update_if_current(job_id, |s| {
            s.phase = JobPhase::Processing;
            s.status_message = "Upload complete. Waiting for processing to start...".to_string();
        });
        if !processing {
            return Err(JobError::Superseded(job_id));
        }

        self.start_polling(job_id);
        Ok(job_id)
    }

    /// Explicit "start a new job": cancel polling and return to IDLE.
    pub fn reset(&self) {
        self.cancel_polling();
        self.state.reset();
        tracing::info!("Job state reset");
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.state.snapshot()
    }

    pub fn active_job(&self) -> Option<JobId> {
        self.state.active_job()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.state.subscribe()
    }

    pub fn state(&self) -> Arc<JobState> {
        self.state.clone()
    }

    /// Chat gate bound to this controller's job state.
    pub fn chat(&self) -> ChatGate {
        ChatGate::new(self.backend.clone(), self.state.clone())
    }

    /// Wait until the current job reaches a terminal phase or the state returns to IDLE.
    pub async fn wait_until_settled(&self) -> JobSnapshot {
        let mut rx = self.state.subscribe();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if snapshot.phase.is_terminal() || snapshot.phase == JobPhase::Idle {
                    return snapshot.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.state.snapshot();
            }
        }
    }

    fn start_polling(&self, job_id: JobId) {
        let handle = StatusPoller::new(
            self.backend.clone(),
            self.state.clone(),
            self.settings,
            job_id,
        )
        .spawn();

        let mut slot = self.poll.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.cancel();
        }
    }

    fn cancel_polling(&self) {
        let previous = self
            .poll
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = previous {
            if !handle.is_finished() {
                tracing::debug!(job_id = %handle.job_id(), "Cancelling poll loop");
            }
            handle.cancel();
        }
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        self.cancel_polling();
    }
}
