//! Chat gate: questions about the finished artifact of the active job.

use std::sync::Arc;

use reportdesk_core::constants::EMPTY_ANSWER_TEXT;
use reportdesk_core::models::{ChatAnswer, ChatRequest};
use reportdesk_core::validation::validate_query;
use reportdesk_core::{JobBackend, JobError};

use crate::state::JobState;

#[derive(Clone)]
pub struct ChatGate {
    backend: Arc<dyn JobBackend>,
    state: Arc<JobState>,
}

impl ChatGate {
    pub fn new(backend: Arc<dyn JobBackend>, state: Arc<JobState>) -> Self {
        Self { backend, state }
    }

    /// True when the active job has completed with a result.
    pub fn is_ready(&self) -> bool {
        self.state.snapshot().chat_ready()
    }

    /// Ask a question about the active job's artifact.
    ///
    /// Fails with [`JobError::NotReady`] before any network I/O unless the job
    /// is COMPLETED with a result. An answer that arrives after a newer job
    /// became active is discarded.
    pub async fn ask(&self, query: &str) -> Result<ChatAnswer, JobError> {
        let query = validate_query(query)?;

        let (job_id, request) = {
            let snapshot = self.state.snapshot();
            match (snapshot.job_id, snapshot.result.as_ref()) {
                (Some(job_id), Some(result)) if snapshot.chat_ready() => {
                    (job_id, ChatRequest::scoped_to(query, job_id, result))
                }
                _ => {
                    tracing::debug!(phase = %snapshot.phase, "Chat rejected, no completed report");
                    return Err(JobError::NotReady);
                }
            }
        };

        tracing::info!(job_id = %job_id, "Sending chat question");

        let reply = self.backend.chat(&request).await.map_err(|e| {
            tracing::error!(job_id = %job_id, error = %e, "Chat request failed");
            JobError::Chat(e)
        })?;

        if !self.state.is_current(job_id) {
            tracing::debug!(job_id = %job_id, "Discarding chat answer for superseded job");
            return Err(JobError::Superseded(job_id));
        }

        let answer = if reply.answer.trim().is_empty() {
            EMPTY_ANSWER_TEXT.to_string()
        } else {
            reply.answer
        };

        Ok(ChatAnswer {
            job_id,
            query: request.query,
            answer,
        })
    }
}
