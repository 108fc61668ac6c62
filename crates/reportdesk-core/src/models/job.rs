use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Client-minted identity of one submit-process-complete cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Mint a fresh identity (random UUID v4).
    pub fn generate() -> Self {
        JobId(Uuid::new_v4())
    }

    /// True when a server-echoed id string refers to this job.
    pub fn matches(&self, echoed: &str) -> bool {
        Uuid::parse_str(echoed.trim())
            .map(|id| id == self.0)
            .unwrap_or(false)
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(JobId)
    }
}

/// Produce a new job identity. Pure and infallible.
pub fn new_job_identity() -> JobId {
    JobId::generate()
}

/// Status strings reported by the job-status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    Uploading,
    Processing,
    Completed,
    Failed,
    /// Any status string the client does not know about.
    #[serde(other)]
    Unknown,
}

/// Interpreted job status, including the transient not-yet-registered case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Uploading,
    Processing,
    Completed,
    Failed,
    NotFound,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Uploading => write!(f, "UPLOADING"),
            JobStatus::Processing => write!(f, "PROCESSING"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::NotFound => write!(f, "NOT_FOUND"),
        }
    }
}

impl RemoteStatus {
    pub fn as_job_status(&self) -> Option<JobStatus> {
        match self {
            RemoteStatus::Uploading => Some(JobStatus::Uploading),
            RemoteStatus::Processing => Some(JobStatus::Processing),
            RemoteStatus::Completed => Some(JobStatus::Completed),
            RemoteStatus::Failed => Some(JobStatus::Failed),
            RemoteStatus::Unknown => None,
        }
    }
}

/// Body of a successful `GET /job-status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    pub status: RemoteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    /// Server detail; older backends send it as `errorDetails`.
    #[serde(default, alias = "errorDetails", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobStatusReport {
    pub fn processing() -> Self {
        Self::with_status(RemoteStatus::Processing)
    }

    pub fn with_status(status: RemoteStatus) -> Self {
        Self {
            status,
            job_id: None,
            download_url: None,
            file_name: None,
            s3_key: None,
            s3_bucket: None,
            message: None,
        }
    }
}

/// Artifact produced by a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub download_url: String,
    pub artifact_name: String,
    pub artifact_storage_key: Option<String>,
    pub artifact_storage_container: Option<String>,
}

impl JobResult {
    /// Build the result from a COMPLETED report. Returns `None` without a download URL.
    pub fn from_report(report: &JobStatusReport) -> Option<Self> {
        let download_url = report
            .download_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())?
            .to_string();

        let artifact_name = report
            .file_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| artifact_name_from_url(&download_url));

        Some(Self {
            download_url,
            artifact_name,
            artifact_storage_key: report.s3_key.clone(),
            artifact_storage_container: report.s3_bucket.clone(),
        })
    }
}

fn artifact_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("report")
        .to_string()
}

/// Client-side state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    Validating,
    Uploading,
    Processing,
    Completed,
    Failed,
    TimedOut,
}

impl JobPhase {
    /// COMPLETED, FAILED and TIMED_OUT: no further polling occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobPhase::Completed | JobPhase::Failed | JobPhase::TimedOut
        )
    }

    /// A job is being uploaded or processed.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, JobPhase::Uploading | JobPhase::Processing)
    }
}

impl Display for JobPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobPhase::Idle => write!(f, "idle"),
            JobPhase::Validating => write!(f, "validating"),
            JobPhase::Uploading => write!(f, "uploading"),
            JobPhase::Processing => write!(f, "processing"),
            JobPhase::Completed => write!(f, "completed"),
            JobPhase::Failed => write!(f, "failed"),
            JobPhase::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Observable state of the current job. `job_id` is the active identity slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Option<JobId>,
    pub phase: JobPhase,
    pub status_message: String,
    pub result: Option<JobResult>,
    pub error: Option<String>,
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}

impl JobSnapshot {
    pub fn idle() -> Self {
        Self {
            job_id: None,
            phase: JobPhase::Idle,
            status_message: String::new(),
            result: None,
            error: None,
            attempts: 0,
            updated_at: Utc::now(),
        }
    }

    /// Chat is available only for a completed job with a result.
    pub fn chat_ready(&self) -> bool {
        self.phase == JobPhase::Completed && self.result.is_some()
    }
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
