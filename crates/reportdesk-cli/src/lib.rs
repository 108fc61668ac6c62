use anyhow::Context;
use reportdesk_core::models::{JobPhase, JobSnapshot, SubmittedFile};
use reportdesk_core::{ErrorMetadata, JobError, LogLevel};
use std::path::{Path, PathBuf};

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Read the files named on the command line.
pub fn load_files(paths: &[PathBuf]) -> anyhow::Result<Vec<SubmittedFile>> {
    paths
        .iter()
        .map(|path| {
            SubmittedFile::from_path(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))
        })
        .collect()
}

/// One status line for a snapshot.
pub fn render_snapshot(snapshot: &JobSnapshot) -> String {
    let job = snapshot
        .job_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());

    match snapshot.phase {
        JobPhase::Idle => "[idle]".to_string(),
        JobPhase::Failed | JobPhase::TimedOut => format!(
            "[{}] {} {}",
            snapshot.phase,
            job,
            snapshot.error.as_deref().unwrap_or(&snapshot.status_message)
        ),
        _ => format!("[{}] {} {}", snapshot.phase, job, snapshot.status_message),
    }
}

/// Log a job error at its own level and return the short message for the user.
pub fn report_job_error(err: &JobError) -> String {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(code = err.error_code(), error = %err, "Job error"),
        LogLevel::Warn => tracing::warn!(code = err.error_code(), error = %err, "Job error"),
        LogLevel::Error => tracing::error!(code = err.error_code(), error = %err, "Job error"),
    }

    match err.suggested_action() {
        Some(action) => format!("{} ({})", err.user_message(), action),
        None => err.user_message(),
    }
}

/// Where to save a downloaded artifact: `dir` joined with the artifact's bare file name.
pub fn artifact_path(dir: &Path, artifact_name: &str) -> PathBuf {
    let name = Path::new(artifact_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "..")
        .unwrap_or("report");
    dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportdesk_core::models::JobId;
    use std::io::Write;

    #[test]
    fn load_files_reads_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.zip");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"PK\x03\x04")
            .unwrap();

        let files = load_files(&[path]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "scan.zip");
        assert_eq!(files[0].size_bytes(), 4);
    }

    #[test]
    fn load_files_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_files(&[dir.path().join("missing.zip")]).unwrap_err();
        assert!(err.to_string().contains("missing.zip"));
    }

    #[test]
    fn render_snapshot_lines() {
        assert_eq!(render_snapshot(&JobSnapshot::idle()), "[idle]");

        let job = JobId::generate();
        let mut snapshot = JobSnapshot::idle();
        snapshot.job_id = Some(job);
        snapshot.phase = JobPhase::Processing;
        snapshot.status_message = "Checking status (attempt 1/36)...".into();
        assert_eq!(
            render_snapshot(&snapshot),
            format!("[processing] {} Checking status (attempt 1/36)...", job)
        );

        snapshot.phase = JobPhase::TimedOut;
        snapshot.error = Some("took too long".into());
        assert!(render_snapshot(&snapshot).ends_with("took too long"));
    }

    #[test]
    fn report_job_error_adds_suggestion() {
        let message = report_job_error(&JobError::NotReady);
        assert_eq!(
            message,
            "The report is not ready yet. (Wait for the report to complete)"
        );
    }

    #[test]
    fn artifact_path_strips_directories() {
        let dir = Path::new("/tmp/out");
        assert_eq!(artifact_path(dir, "report.xlsx"), dir.join("report.xlsx"));
        assert_eq!(artifact_path(dir, "../../etc/passwd"), dir.join("passwd"));
        assert_eq!(artifact_path(dir, ""), dir.join("report"));
    }
}
