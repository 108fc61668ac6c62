use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

use super::JobId;
use crate::backend::BackendError;
use crate::constants::DEFAULT_CONTENT_TYPE;

/// A file selected by the user, held in memory until it is transferred.
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SubmittedFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    /// Read a file from disk; the file name is the path's final component.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Invalid file name: {}", path.display()),
                )
            })?
            .to_string();
        Ok(Self::new(file_name, data))
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn describe(&self, target_job: JobId) -> UploadDescriptor {
        UploadDescriptor {
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            size_bytes: self.size_bytes(),
            target_job,
        }
    }
}

/// Infer a content type from the file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("zip") => "application/zip",
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("nessus") | Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// What the upload coordinator needs to know about a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub target_job: JobId,
}

/// Request body for `POST /generate-upload-credential`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCredentialRequest {
    pub file_name: String,
    pub content_type: String,
    pub job_id: String,
}

/// Time-limited upload credential returned by the credential endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCredential {
    pub upload_url: String,
    pub storage_key: String,
    pub storage_container: String,
    /// The job id echoed back by the endpoint, if any.
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Out-of-band object metadata attached to the stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub job_id: JobId,
    pub original_file_name: String,
}

/// Stage of the upload handshake that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Credential,
    Transfer,
}

impl Display for UploadStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStage::Credential => write!(f, "credential"),
            UploadStage::Transfer => write!(f, "transfer"),
        }
    }
}

/// Why an upload did not succeed. `error` keeps the raw backend detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFailure {
    pub stage: UploadStage,
    pub error: BackendError,
}

/// Outcome of one upload; produced once per descriptor and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    pub storage_key: Option<String>,
    pub storage_container: Option<String>,
    pub original_file_name: String,
    pub error: Option<UploadFailure>,
    pub finished_at: DateTime<Utc>,
}

impl UploadResult {
    pub fn stored(
        original_file_name: impl Into<String>,
        storage_key: impl Into<String>,
        storage_container: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            storage_key: Some(storage_key.into()),
            storage_container: Some(storage_container.into()),
            original_file_name: original_file_name.into(),
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(
        original_file_name: impl Into<String>,
        stage: UploadStage,
        error: BackendError,
    ) -> Self {
        Self {
            success: false,
            storage_key: None,
            storage_container: None,
            original_file_name: original_file_name.into(),
            error: Some(UploadFailure { stage, error }),
            finished_at: Utc::now(),
        }
    }
}
