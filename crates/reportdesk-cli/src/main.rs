//! Reportdesk CLI: submit a report archive, follow its processing, and ask
//! questions about the finished artifact.
//!
//! Set REPORTDESK_API_URL (or pass --api-url). Other settings are read from
//! REPORTDESK_* environment variables or a `.env` file.

use anyhow::Context;
use clap::{Parser, Subcommand};
use reportdesk_api_client::ApiClient;
use reportdesk_cli::{artifact_path, init_tracing, load_files, render_snapshot, report_job_error};
use reportdesk_core::models::{JobId, JobPhase, JobSnapshot};
use reportdesk_core::{ClientConfig, JobBackend, StatusReply};
use reportdesk_worker::JobController;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "reportdesk", about = "Report analysis client")]
struct Cli {
    /// Backend base URL (overrides REPORTDESK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an archive, wait for the report, then answer questions about it
    Run {
        /// Archive to submit (exactly one is accepted)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Question to ask once the report is ready (repeatable)
        #[arg(long = "ask")]
        questions: Vec<String>,
        /// Read further questions from stdin, one per line
        #[arg(long)]
        interactive: bool,
        /// Directory to save the finished artifact in
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Look up the status of a job once
    Status {
        /// Job UUID
        job_id: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config = config.with_api_base_url(url);
    }
    config.validate()?;

    let client = Arc::new(ApiClient::from_config(&config).context(
        "Failed to create API client. Set REPORTDESK_API_URL or pass --api-url",
    )?);

    match cli.command {
        Commands::Run {
            files,
            questions,
            interactive,
            download,
        } => {
            let controller = JobController::from_config(client.clone(), &config);
            tokio::select! {
                result = run(&controller, &client, files, questions, interactive, download) => result,
                _ = tokio::signal::ctrl_c() => {
                    controller.reset();
                    eprintln!("Cancelled.");
                    Ok(())
                }
            }
        }
        Commands::Status { job_id } => {
            let job_id: JobId = job_id
                .parse()
                .with_context(|| format!("Invalid job id: {}", job_id))?;
            let reply = client
                .job_status(&job_id)
                .await
                .context("Status request failed")?;
            match reply {
                StatusReply::NotFound => print_json(&serde_json::json!({
                    "jobId": job_id,
                    "status": "NOT_FOUND",
                })),
                StatusReply::Report(report) => print_json(&report),
            }
        }
    }
}

async fn run(
    controller: &JobController,
    client: &ApiClient,
    files: Vec<PathBuf>,
    questions: Vec<String>,
    interactive: bool,
    download: Option<PathBuf>,
) -> anyhow::Result<()> {
    let files = load_files(&files)?;

    let mut rx = controller.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = String::new();
        while rx.changed().await.is_ok() {
            let line = render_snapshot(&rx.borrow_and_update());
            if line != last {
                eprintln!("{}", line);
                last = line;
            }
        }
    });

    let submitted = controller.submit(files).await;
    let snapshot = match submitted {
        Ok(_) => controller.wait_until_settled().await,
        Err(err) => {
            printer.abort();
            return Err(anyhow::anyhow!(report_job_error(&err)));
        }
    };
    printer.abort();

    finish(controller, client, snapshot, questions, interactive, download).await
}

async fn finish(
    controller: &JobController,
    client: &ApiClient,
    snapshot: JobSnapshot,
    questions: Vec<String>,
    interactive: bool,
    download: Option<PathBuf>,
) -> anyhow::Result<()> {
    let result = match (snapshot.phase, snapshot.result) {
        (JobPhase::Completed, Some(result)) => result,
        (phase, _) => {
            let reason = snapshot
                .error
                .unwrap_or_else(|| format!("Job ended in phase {}", phase));
            return Err(anyhow::anyhow!(reason));
        }
    };

    print_json(&result)?;

    if let Some(dir) = download {
        let bytes = client.download_artifact(&result.download_url).await?;
        let path = artifact_path(&dir, &result.artifact_name);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Saved {} ({} bytes)", path.display(), bytes.len());
    }

    let chat = controller.chat();
    for question in questions {
        ask(&chat, &question).await?;
    }

    if interactive {
        eprintln!("Ask a question about the report (empty line or Ctrl-D to quit):");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            if line.trim().is_empty() {
                break;
            }
            ask(&chat, &line).await?;
        }
    }

    Ok(())
}

async fn ask(chat: &reportdesk_worker::ChatGate, question: &str) -> anyhow::Result<()> {
    match chat.ask(question).await {
        Ok(answer) => print_json(&answer),
        Err(err) => Err(anyhow::anyhow!(report_job_error(&err))),
    }
}
