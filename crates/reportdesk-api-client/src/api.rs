//! Domain methods for the report backend.
//!
//! Request and response types live in `reportdesk_core::models`; this module
//! maps them onto the four endpoints and implements [`JobBackend`].

use crate::{decode_json, ensure_success, network_error, ApiClient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reportdesk_core::backend::BackendResult;
use reportdesk_core::constants::{
    CHAT_PATH, JOB_ID_METADATA_HEADER, JOB_STATUS_PATH, ORIGINAL_FILENAME_METADATA_HEADER,
    UPLOAD_CREDENTIAL_PATH,
};
use reportdesk_core::models::{
    ChatReply, ChatRequest, JobId, ObjectMetadata, UploadCredential, UploadCredentialRequest,
};
use reportdesk_core::{JobBackend, StatusReply};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

impl ApiClient {
    /// Download a finished artifact from its (usually presigned) URL.
    pub async fn download_artifact(&self, download_url: &str) -> Result<Bytes> {
        let response = self
            .client()
            .get(download_url)
            .send()
            .await
            .context("Failed to download artifact")?;

        let response = ensure_success(response)
            .await
            .context("Artifact download was rejected")?;

        response
            .bytes()
            .await
            .context("Failed to read artifact data")
    }
}

#[async_trait]
impl JobBackend for ApiClient {
    async fn request_upload_credential(
        &self,
        request: &UploadCredentialRequest,
    ) -> BackendResult<UploadCredential> {
        self.post_json(UPLOAD_CREDENTIAL_PATH, request).await
    }

    async fn transfer_file(
        &self,
        upload_url: &str,
        content_type: &str,
        body: Bytes,
        metadata: &ObjectMetadata,
    ) -> BackendResult<()> {
        // Header values must be visible ASCII; non-ASCII names are percent-encoded.
        let encoded_name = urlencoding::encode(&metadata.original_file_name).into_owned();

        let response = self
            .client()
            .put(upload_url)
            .header(CONTENT_TYPE, content_type)
            .header(JOB_ID_METADATA_HEADER, metadata.job_id.to_string())
            .header(ORIGINAL_FILENAME_METADATA_HEADER, encoded_name)
            .body(body)
            .send()
            .await
            .map_err(network_error)?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn job_status(&self, job_id: &JobId) -> BackendResult<StatusReply> {
        let response = self
            .get_raw(JOB_STATUS_PATH, &[("jobId", job_id.to_string())])
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(StatusReply::NotFound);
        }

        let report = decode_json(ensure_success(response).await?).await?;
        Ok(StatusReply::Report(report))
    }

    async fn chat(&self, request: &ChatRequest) -> BackendResult<ChatReply> {
        self.post_json(CHAT_PATH, request).await
    }
}
