//! Upload coordinator: presigned credential, then a direct PUT to storage.

use std::sync::Arc;

use reportdesk_core::models::{
    JobId, ObjectMetadata, SubmittedFile, UploadCredential, UploadCredentialRequest,
    UploadDescriptor, UploadResult, UploadStage,
};
use reportdesk_core::{BackendError, JobBackend};

#[derive(Clone)]
pub struct UploadCoordinator {
    backend: Arc<dyn JobBackend>,
}

impl UploadCoordinator {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    /// Obtain an upload credential for `descriptor`.
    ///
    /// An echoed job id that differs from the submitted one is logged and
    /// otherwise ignored; the client-minted id stays authoritative.
    pub async fn request_upload_credential(
        &self,
        descriptor: &UploadDescriptor,
    ) -> Result<UploadCredential, BackendError> {
        let request = UploadCredentialRequest {
            file_name: descriptor.file_name.clone(),
            content_type: descriptor.content_type.clone(),
            job_id: descriptor.target_job.to_string(),
        };

        let credential = self.backend.request_upload_credential(&request).await?;

        if let Some(echoed) = credential.job_id.as_deref() {
            if !descriptor.target_job.matches(echoed) {
                tracing::warn!(
                    job_id = %descriptor.target_job,
                    echoed_job_id = %echoed,
                    "Upload credential echoed a different job id; keeping the submitted one"
                );
            }
        }

        Ok(credential)
    }

    /// PUT the file to the presigned URL with job id and original name as object metadata.
    pub async fn transfer_file(
        &self,
        credential: &UploadCredential,
        file: &SubmittedFile,
        descriptor: &UploadDescriptor,
    ) -> UploadResult {
        let metadata = ObjectMetadata {
            job_id: descriptor.target_job,
            original_file_name: descriptor.file_name.clone(),
        };

        match self
            .backend
            .transfer_file(
                &credential.upload_url,
                &descriptor.content_type,
                file.data.clone(),
                &metadata,
            )
            .await
        {
            Ok(()) => {
                tracing::info!(
                    job_id = %descriptor.target_job,
                    storage_key = %credential.storage_key,
                    size_bytes = descriptor.size_bytes,
                    "File transferred to storage"
                );
                UploadResult::stored(
                    descriptor.file_name.clone(),
                    credential.storage_key.clone(),
                    credential.storage_container.clone(),
                )
            }
            Err(e) => {
                tracing::error!(
                    job_id = %descriptor.target_job,
                    storage_key = %credential.storage_key,
                    error = %e,
                    "File transfer failed"
                );
                UploadResult::failed(descriptor.file_name.clone(), UploadStage::Transfer, e)
            }
        }
    }

    /// Run the full handshake for one file bound to `job_id`.
    pub async fn upload(&self, file: &SubmittedFile, job_id: JobId) -> UploadResult {
        let descriptor = file.describe(job_id);

        let credential = match self.request_upload_credential(&descriptor).await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    file_name = %descriptor.file_name,
                    error = %e,
                    "Upload credential request failed"
                );
                return UploadResult::failed(descriptor.file_name, UploadStage::Credential, e);
            }
        };

        self.transfer_file(&credential, file, &descriptor).await
    }
}
