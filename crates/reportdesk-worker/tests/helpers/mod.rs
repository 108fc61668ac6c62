//! Scripted backend for driving the job controller in tests.
//!
//! Status replies are scripted per submission (in the order credential
//! requests arrive); once a script runs out every further check answers
//! PROCESSING. Individual status checks and transfers can be held back with a
//! `Notify` gate to control response timing.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use reportdesk_core::backend::BackendResult;
use reportdesk_core::models::{
    ChatReply, ChatRequest, JobId, JobStatusReport, ObjectMetadata, RemoteStatus,
    SubmittedFile, UploadCredential, UploadCredentialRequest,
};
use reportdesk_core::{BackendError, JobBackend, PollSettings, StatusReply};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub type ScriptedReply = BackendResult<StatusReply>;

pub fn processing() -> ScriptedReply {
    Ok(StatusReply::Report(JobStatusReport::processing()))
}

pub fn completed(download_url: &str, file_name: &str) -> ScriptedReply {
    let mut report = JobStatusReport::with_status(RemoteStatus::Completed);
    report.download_url = Some(download_url.to_string());
    report.file_name = Some(file_name.to_string());
    report.s3_key = Some(format!("processed/{}", file_name));
    report.s3_bucket = Some("reports".to_string());
    Ok(StatusReply::Report(report))
}

pub fn failed(message: &str) -> ScriptedReply {
    let mut report = JobStatusReport::with_status(RemoteStatus::Failed);
    report.message = Some(message.to_string());
    Ok(StatusReply::Report(report))
}

pub fn not_found() -> ScriptedReply {
    Ok(StatusReply::NotFound)
}

pub fn network_down() -> ScriptedReply {
    Err(BackendError::Network("connection reset by peer".to_string()))
}

pub fn server_error() -> ScriptedReply {
    Err(BackendError::Http {
        status: 502,
        body: "Bad Gateway".to_string(),
    })
}

pub fn report(report: JobStatusReport) -> ScriptedReply {
    Ok(StatusReply::Report(report))
}

pub fn zip_file(name: &str) -> SubmittedFile {
    SubmittedFile::new(name, b"PK\x03\x04scan-data".to_vec())
}

/// Default settings: 10 s interval, 36 attempts, grace 6, network window 3.
pub fn settings() -> PollSettings {
    PollSettings::default()
}

#[derive(Default)]
pub struct ScriptedBackend {
    submissions: Mutex<Vec<JobId>>,
    credential_requests: Mutex<Vec<UploadCredentialRequest>>,
    credential_failures: Mutex<HashMap<usize, BackendError>>,
    echo_override: Mutex<Option<String>>,
    transfers: Mutex<Vec<ObjectMetadata>>,
    transfer_failures: Mutex<HashMap<usize, BackendError>>,
    transfer_gates: Mutex<HashMap<usize, Arc<Notify>>>,
    scripts: Mutex<HashMap<usize, VecDeque<ScriptedReply>>>,
    status_gates: Mutex<HashMap<(usize, usize), Arc<Notify>>>,
    status_calls: Mutex<Vec<JobId>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    chat_requests: Mutex<Vec<ChatRequest>>,
    chat_answer: Mutex<String>,
    chat_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the status replies for the `submission`-th upload (0-based).
    pub fn script(&self, submission: usize, replies: Vec<ScriptedReply>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(submission, replies.into_iter().collect());
    }

    pub fn fail_credential(&self, submission: usize, error: BackendError) {
        self.credential_failures
            .lock()
            .unwrap()
            .insert(submission, error);
    }

    pub fn fail_transfer(&self, submission: usize, error: BackendError) {
        self.transfer_failures
            .lock()
            .unwrap()
            .insert(submission, error);
    }

    /// Echo this job id from the credential endpoint instead of the submitted one.
    pub fn echo_job_id(&self, job_id: &str) {
        *self.echo_override.lock().unwrap() = Some(job_id.to_string());
    }

    /// Hold the transfer of `submission` until the returned gate is notified.
    pub fn gate_transfer(&self, submission: usize) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.transfer_gates
            .lock()
            .unwrap()
            .insert(submission, gate.clone());
        gate
    }

    /// Hold status check `attempt` (1-based) of `submission` until the gate is notified.
    pub fn gate_status(&self, submission: usize, attempt: usize) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.status_gates
            .lock()
            .unwrap()
            .insert((submission, attempt), gate.clone());
        gate
    }

    /// Hold the next chat request until the returned gate is notified.
    pub fn gate_chat(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.chat_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_chat_answer(&self, answer: &str) {
        *self.chat_answer.lock().unwrap() = answer.to_string();
    }

    pub fn submissions(&self) -> Vec<JobId> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn credential_requests(&self) -> Vec<UploadCredentialRequest> {
        self.credential_requests.lock().unwrap().clone()
    }

    pub fn transfers(&self) -> Vec<ObjectMetadata> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }

    pub fn status_calls_for(&self, job_id: JobId) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| **id == job_id)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    fn submission_of(&self, job_id: &JobId) -> Option<usize> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .position(|id| id == job_id)
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn request_upload_credential(
        &self,
        request: &UploadCredentialRequest,
    ) -> BackendResult<UploadCredential> {
        let job_id: JobId = request.job_id.parse().unwrap();
        let submission = {
            let mut submissions = self.submissions.lock().unwrap();
            submissions.push(job_id);
            submissions.len() - 1
        };
        self.credential_requests.lock().unwrap().push(request.clone());

        if let Some(error) = self.credential_failures.lock().unwrap().remove(&submission) {
            return Err(error);
        }

        let echoed = self
            .echo_override
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| request.job_id.clone());

        Ok(UploadCredential {
            upload_url: format!("https://storage.test/uploads/{}?sig=test", request.file_name),
            storage_key: format!("uploads/{}/{}", request.job_id, request.file_name),
            storage_container: "incoming".to_string(),
            job_id: Some(echoed),
        })
    }

    async fn transfer_file(
        &self,
        _upload_url: &str,
        _content_type: &str,
        _body: Bytes,
        metadata: &ObjectMetadata,
    ) -> BackendResult<()> {
        self.transfers.lock().unwrap().push(metadata.clone());
        let submission = self.submission_of(&metadata.job_id).unwrap();

        let gate = self.transfer_gates.lock().unwrap().remove(&submission);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.transfer_failures.lock().unwrap().remove(&submission) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn job_status(&self, job_id: &JobId) -> BackendResult<StatusReply> {
        let attempt = {
            let mut calls = self.status_calls.lock().unwrap();
            calls.push(*job_id);
            calls.iter().filter(|id| *id == job_id).count()
        };
        let submission = self.submission_of(job_id).unwrap();

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let gate = self.status_gates.lock().unwrap().remove(&(submission, attempt));
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&submission)
            .and_then(|script| script.pop_front())
            .unwrap_or_else(processing);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }

    async fn chat(&self, request: &ChatRequest) -> BackendResult<ChatReply> {
        self.chat_requests.lock().unwrap().push(request.clone());

        let gate = self.chat_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        Ok(ChatReply {
            answer: self.chat_answer.lock().unwrap().clone(),
        })
    }
}

/// Let paused time run forward until `condition` holds (checked every 100 ms).
pub async fn advance_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("condition not reached");
}
