use serde::{Deserialize, Serialize};

use super::{JobId, JobResult};

/// Request body for `POST /chat`, scoped to one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    pub job_id: String,
}

impl ChatRequest {
    pub fn scoped_to(query: impl Into<String>, job_id: JobId, result: &JobResult) -> Self {
        Self {
            query: query.into(),
            s3_bucket: result.artifact_storage_container.clone(),
            s3_key: result.artifact_storage_key.clone(),
            job_id: job_id.to_string(),
        }
    }
}

/// Response body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub answer: String,
}

/// An answer delivered to the user, tied to the job it was asked about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub job_id: JobId,
    pub query: String,
    pub answer: String,
}
