//! Status poller with stale-job guard.
//!
//! One poll loop runs per job. The loop is bound to its own [`JobId`] and
//! compares it against the active job before each request and after each
//! response; every snapshot write is a guarded compare-and-modify, so a
//! superseded loop never touches the state of a newer job.

use std::sync::Arc;

use reportdesk_core::models::{JobId, JobPhase, JobResult, JobStatus, JobStatusReport};
use reportdesk_core::{BackendError, ErrorMetadata, JobBackend, JobError, PollSettings, StatusReply};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::state::JobState;

/// How a poll loop ended.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Completed(JobResult),
    Failed(JobError),
    TimedOut { attempts: u32 },
    /// A newer job (or a reset) replaced this one; nothing was written.
    Superseded,
    /// The loop's token was cancelled between ticks.
    Cancelled,
}

/// Handle to a running poll loop.
#[derive(Debug)]
pub struct PollHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Stop scheduling further ticks. A request already in flight is not aborted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Consecutive replies of one kind, counted across ticks.
#[derive(Debug, Default)]
struct Streaks {
    not_found: u32,
    network: u32,
}

/// What one tick decided.
enum Tick {
    Continue(Option<String>),
    Complete(JobResult),
    Fail(JobError),
}

pub struct StatusPoller {
    backend: Arc<dyn JobBackend>,
    state: Arc<JobState>,
    settings: PollSettings,
    job_id: JobId,
}

impl StatusPoller {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        state: Arc<JobState>,
        settings: PollSettings,
        job_id: JobId,
    ) -> Self {
        Self {
            backend,
            state,
            settings,
            job_id,
        }
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(self) -> PollHandle {
        let cancel = CancellationToken::new();
        let job_id = self.job_id;
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            match self.run(token).await {
                PollOutcome::Completed(result) => {
                    tracing::debug!(job_id = %job_id, artifact = %result.artifact_name, "Poll loop finished")
                }
                PollOutcome::Failed(error) => {
                    tracing::debug!(job_id = %job_id, error = %error, "Poll loop finished")
                }
                PollOutcome::TimedOut { attempts } => {
                    tracing::debug!(job_id = %job_id, attempts, "Poll loop finished")
                }
                outcome @ (PollOutcome::Superseded | PollOutcome::Cancelled) => {
                    tracing::debug!(job_id = %job_id, outcome = ?outcome, "Poll loop stopped")
                }
            }
        });

        PollHandle {
            job_id,
            cancel,
            task,
        }
    }

    /// Poll until a terminal status, timeout, supersession or cancellation.
    ///
    /// The first check fires one interval after start. Each tick, including its
    /// request, completes before the next one is scheduled.
    pub async fn run(self, cancel: CancellationToken) -> PollOutcome {
        let max_attempts = self.settings.max_attempts;
        let mut ticker = interval_at(Instant::now() + self.settings.interval, self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempt: u32 = 0;
        let mut streaks = Streaks::default();

        tracing::info!(
            job_id = %self.job_id,
            interval_secs = self.settings.interval.as_secs(),
            budget_secs = self.settings.budget().as_secs(),
            max_attempts,
            "Polling job status"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(job_id = %self.job_id, attempt, "Polling cancelled");
                    return PollOutcome::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            if !self.state.is_current(self.job_id) {
                tracing::debug!(job_id = %self.job_id, attempt, "Job superseded, stopping poll loop");
                return PollOutcome::Superseded;
            }

            attempt += 1;
            if attempt > max_attempts {
                return self.time_out(max_attempts);
            }

            let checking = format!("Checking status (attempt {}/{})...", attempt, max_attempts);
            let still_current = self.state.update_if_current(self.job_id, |s| {
                s.attempts = attempt;
                s.status_message = checking;
            });
            if !still_current {
                return PollOutcome::Superseded;
            }

            let reply = self.backend.job_status(&self.job_id).await;

            if !self.state.is_current(self.job_id) {
                tracing::debug!(
                    job_id = %self.job_id,
                    attempt,
                    "Discarding status response for superseded job"
                );
                return PollOutcome::Superseded;
            }

            match self.interpret(reply, attempt, &mut streaks) {
                Tick::Continue(message) => {
                    if let Some(message) = message {
                        if !self
                            .state
                            .update_if_current(self.job_id, |s| s.status_message = message)
                        {
                            return PollOutcome::Superseded;
                        }
                    }
                }
                Tick::Complete(result) => return self.complete(result),
                Tick::Fail(error) => return self.fail(error),
            }
        }
    }

    fn interpret(
        &self,
        reply: Result<StatusReply, BackendError>,
        attempt: u32,
        streaks: &mut Streaks,
    ) -> Tick {
        if !matches!(&reply, Err(e) if e.is_network()) {
            streaks.network = 0;
        }

        match reply {
            Ok(StatusReply::Report(report)) => {
                self.interpret_report(report, attempt, &mut streaks.not_found)
            }
            Ok(StatusReply::NotFound) => {
                streaks.not_found += 1;
                let not_found_streak = streaks.not_found;
                let grace = self.settings.not_found_grace;
                if not_found_streak > grace {
                    tracing::warn!(
                        job_id = %self.job_id,
                        attempt,
                        not_found = not_found_streak,
                        "Job never registered on the server"
                    );
                    return Tick::Fail(JobError::JobFailed(
                        "Could not track the job: the server never registered it".to_string(),
                    ));
                }
                tracing::debug!(job_id = %self.job_id, attempt, status = %JobStatus::NotFound, "Job not registered yet");
                Tick::Continue(Some(format!(
                    "Waiting for the job to be registered ({}/{})...",
                    not_found_streak, grace
                )))
            }
            Err(e) if e.is_network() => {
                streaks.network += 1;
                if self.network_failure_is_fatal(attempt, streaks.network) {
                    tracing::error!(
                        job_id = %self.job_id,
                        attempt,
                        error = %e,
                        failures = streaks.network,
                        "Status check failed near the attempt ceiling"
                    );
                    return Tick::Fail(JobError::PollingNetwork(e));
                }
                tracing::warn!(job_id = %self.job_id, attempt, error = %e, "Status check failed, retrying");
                Tick::Continue(Some(format!(
                    "Connection problem, retrying (attempt {}/{})...",
                    attempt, self.settings.max_attempts
                )))
            }
            Err(e) => {
                tracing::warn!(job_id = %self.job_id, attempt, error = %e, "Unexpected status response");
                Tick::Continue(None)
            }
        }
    }

    /// Network failures end the job only inside the final window, and only once
    /// they persist: the streak began before the window or spans two attempts.
    fn network_failure_is_fatal(&self, attempt: u32, streak: u32) -> bool {
        let fatal_after = self
            .settings
            .max_attempts
            .saturating_sub(self.settings.network_failure_window);
        if attempt <= fatal_after {
            return false;
        }
        let streak_start = attempt + 1 - streak;
        streak_start <= fatal_after || streak >= 2
    }

    fn interpret_report(
        &self,
        report: JobStatusReport,
        attempt: u32,
        not_found_streak: &mut u32,
    ) -> Tick {
        if let Some(reported) = report.job_id.as_deref() {
            if !self.job_id.matches(reported) {
                tracing::warn!(
                    job_id = %self.job_id,
                    reported_job_id = %reported,
                    "Status response for a different job, ignoring"
                );
                return Tick::Continue(None);
            }
        }

        match report.status.as_job_status() {
            Some(JobStatus::Completed) => match JobResult::from_report(&report) {
                Some(result) => Tick::Complete(result),
                None => Tick::Fail(JobError::JobFailed(
                    "The job completed without a downloadable artifact".to_string(),
                )),
            },
            Some(JobStatus::Failed) => Tick::Fail(JobError::JobFailed(
                report
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )),
            Some(status @ (JobStatus::Processing | JobStatus::Uploading)) => {
                *not_found_streak = 0;
                tracing::debug!(job_id = %self.job_id, attempt, status = %status, "Job still running");
                Tick::Continue(Some(progress_message(attempt, self.settings.max_attempts)))
            }
            Some(JobStatus::NotFound) | None => {
                tracing::warn!(
                    job_id = %self.job_id,
                    attempt,
                    status = ?report.status,
                    "Unexpected job status, continuing"
                );
                Tick::Continue(None)
            }
        }
    }

    fn complete(&self, result: JobResult) -> PollOutcome {
        let message = format!("Report ready: {}", result.artifact_name);
        let stored = result.clone();
        let applied = self.state.update_if_current(self.job_id, |s| {
            s.phase = JobPhase::Completed;
            s.status_message = message;
            s.result = Some(stored);
            s.error = None;
        });

        if !applied {
            return PollOutcome::Superseded;
        }

        tracing::info!(
            job_id = %self.job_id,
            artifact = %result.artifact_name,
            "Job completed"
        );
        PollOutcome::Completed(result)
    }

    fn fail(&self, error: JobError) -> PollOutcome {
        let message = error.user_message();
        let applied = self.state.update_if_current(self.job_id, |s| {
            s.phase = JobPhase::Failed;
            s.status_message = message.clone();
            s.error = Some(message);
        });

        if !applied {
            return PollOutcome::Superseded;
        }

        tracing::warn!(job_id = %self.job_id, error = %error, "Job failed");
        PollOutcome::Failed(error)
    }

    fn time_out(&self, max_attempts: u32) -> PollOutcome {
        let error = JobError::JobTimedOut {
            attempts: max_attempts,
        };
        let message = error.user_message();
        let applied = self.state.update_if_current(self.job_id, |s| {
            s.phase = JobPhase::TimedOut;
            s.status_message = message.clone();
            s.error = Some(message);
        });

        if !applied {
            return PollOutcome::Superseded;
        }

        tracing::warn!(job_id = %self.job_id, max_attempts, "Job status polling timed out");
        PollOutcome::TimedOut {
            attempts: max_attempts,
        }
    }
}

/// Progress text for a job the server reports as still running.
pub fn progress_message(attempt: u32, max_attempts: u32) -> String {
    let stage = match attempt {
        0..=4 => "Report queued for analysis",
        5..=11 => "Reading the report contents",
        12..=26 => "Analysing findings and drafting recommendations",
        _ => "Finalising results",
    };
    format!("{} (attempt {}/{})...", stage, attempt, max_attempts)
}
