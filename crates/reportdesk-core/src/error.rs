//! Error types module
//!
//! All failures of a job attempt are unified under [`JobError`]. Each variant
//! describes itself through [`ErrorMetadata`] so front ends can render a short
//! message while the raw detail goes to the log.

use crate::backend::BackendError;
use crate::constants::FAILURE_DETAIL_DISPLAY_CHARS;
use crate::display::truncate_for_display;
use crate::models::{JobId, UploadFailure, UploadStage};
use crate::validation::ValidationError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues and server-reported failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSFER_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is retried in place
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// Short human-readable message (may differ from the internal error message)
    fn user_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upload credential request failed: {0}")]
    Credential(#[source] BackendError),

    #[error("File transfer failed: {0}")]
    Transfer(#[source] BackendError),

    #[error("Status polling failed: {0}")]
    PollingNetwork(#[source] BackendError),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Job timed out after {attempts} status checks")]
    JobTimedOut { attempts: u32 },

    #[error("No completed report is available yet")]
    NotReady,

    #[error("Chat request failed: {0}")]
    Chat(#[source] BackendError),

    #[error("Job {0} was superseded by a newer submission")]
    Superseded(JobId),
}

impl From<UploadFailure> for JobError {
    fn from(failure: UploadFailure) -> Self {
        match failure.stage {
            UploadStage::Credential => JobError::Credential(failure.error),
            UploadStage::Transfer => JobError::Transfer(failure.error),
        }
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn job_error_static_metadata(
    err: &JobError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        JobError::Validation(_) => (
            "VALIDATION_ERROR",
            false,
            Some("Select a single archive with the accepted extension"),
            LogLevel::Debug,
        ),
        JobError::Credential(_) => (
            "CREDENTIAL_ERROR",
            false,
            Some("Submit the file again"),
            LogLevel::Error,
        ),
        JobError::Transfer(_) => (
            "TRANSFER_ERROR",
            false,
            Some("Submit the file again"),
            LogLevel::Error,
        ),
        JobError::PollingNetwork(_) => (
            "POLLING_NETWORK_ERROR",
            true,
            Some("Check your connection and submit the file again"),
            LogLevel::Warn,
        ),
        JobError::JobFailed(_) => (
            "JOB_FAILED",
            false,
            Some("Check the archive contents and submit again"),
            LogLevel::Warn,
        ),
        JobError::JobTimedOut { .. } => (
            "JOB_TIMED_OUT",
            false,
            Some("The job may still finish; check its status later or submit again"),
            LogLevel::Warn,
        ),
        JobError::NotReady => (
            "NOT_READY",
            false,
            Some("Wait for the report to complete"),
            LogLevel::Debug,
        ),
        JobError::Chat(_) => (
            "CHAT_ERROR",
            false,
            Some("Ask the question again"),
            LogLevel::Error,
        ),
        JobError::Superseded(_) => ("SUPERSEDED", false, None, LogLevel::Debug),
    }
}

impl ErrorMetadata for JobError {
    fn error_code(&self) -> &'static str {
        job_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        job_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        job_error_static_metadata(self).2
    }

    fn user_message(&self) -> String {
        match self {
            JobError::Validation(err) => err.to_string(),
            JobError::Credential(_) => "Could not prepare the upload. Please try again.".to_string(),
            JobError::Transfer(_) => "Upload failed. Please try again.".to_string(),
            JobError::PollingNetwork(_) => {
                "Lost contact with the server while checking job status.".to_string()
            }
            JobError::JobFailed(detail) => format!(
                "Processing failed: {}",
                truncate_for_display(detail, FAILURE_DETAIL_DISPLAY_CHARS)
            ),
            JobError::JobTimedOut { .. } => {
                "Processing is taking longer than expected. The job may still complete on the server."
                    .to_string()
            }
            JobError::NotReady => "The report is not ready yet.".to_string(),
            JobError::Chat(_) => "The assistant could not answer right now.".to_string(),
            JobError::Superseded(_) => "A newer job replaced this one.".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        job_error_static_metadata(self).3
    }
}
