//! Backend contract
//!
//! The job controller talks to the report backend only through [`JobBackend`],
//! so the HTTP client can be swapped for a scripted fake in tests.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    ChatReply, ChatRequest, JobId, JobStatusReport, ObjectMetadata, UploadCredential,
    UploadCredentialRequest,
};

/// Backend call errors
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendError {
    /// The request never completed (connect failure, reset, client timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The server answered but the body could not be decoded.
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_network(&self) -> bool {
        matches!(self, BackendError::Network(_))
    }
}

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Reply of the job-status endpoint. HTTP 404 is reported as `NotFound`.
#[derive(Debug, Clone)]
pub enum StatusReply {
    NotFound,
    Report(JobStatusReport),
}

#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Obtain a presigned upload credential for one file.
    async fn request_upload_credential(
        &self,
        request: &UploadCredentialRequest,
    ) -> BackendResult<UploadCredential>;

    /// PUT the file body to a presigned URL, attaching object metadata.
    async fn transfer_file(
        &self,
        upload_url: &str,
        content_type: &str,
        body: Bytes,
        metadata: &ObjectMetadata,
    ) -> BackendResult<()>;

    /// Query the status of a job.
    async fn job_status(&self, job_id: &JobId) -> BackendResult<StatusReply>;

    /// Ask a question about a finished artifact.
    async fn chat(&self, request: &ChatRequest) -> BackendResult<ChatReply>;
}
