mod config;
mod decision;
mod domain;
mod engine;
mod event_store;
mod gateway;
mod notify;
mod projections;
mod tools;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use config::EngineConfig;
use decision::StubDecisionService;
use domain::types::{CaseNumber, CaseStatus};
use gateway::{await_status, CourtSystem};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "court")]
#[command(about = "Durable court case processing engine")]
#[command(version)]
struct Cli {
    /// Data directory for event logs and snapshots
    #[arg(long, default_value = ".court-data")]
    data_dir: PathBuf,

    /// YAML config file (overrides --data-dir)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a new case and drive it with the stubbed decision service
    Run {
        /// Case number to open
        case_number: String,

        /// Approve automatically once the draft is ready
        #[arg(long)]
        auto_approve: bool,

        /// Reject the first draft with this reason, then approve the revision
        #[arg(long)]
        reject_reason: Option<String>,
    },
    /// Re-open a persisted case and resume processing
    Attach {
        /// Case number to re-open
        case_number: String,

        /// Approve automatically once the draft is ready
        #[arg(long)]
        auto_approve: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::new(&cli.data_dir),
    };

    let service = Arc::new(StubDecisionService::new());
    let system = Arc::new(
        CourtSystem::new(config, service)
            .await
            .context("failed to start court system")?,
    );

    match cli.command {
        Command::Run {
            case_number,
            auto_approve,
            reject_reason,
        } => {
            let case_number = CaseNumber::from(case_number);
            system
                .start(&case_number)
                .await
                .map_err(|e| anyhow!("could not start case: {}", e))?;
            drive_case(&system, &case_number, auto_approve, reject_reason).await?;
        }
        Command::Attach {
            case_number,
            auto_approve,
        } => {
            let case_number = CaseNumber::from(case_number);
            system
                .attach(&case_number)
                .await
                .map_err(|e| anyhow!("could not attach case: {}", e))?;
            drive_case(&system, &case_number, auto_approve, None).await?;
        }
    }

    system.shutdown().await;
    Ok(())
}

/// Follows a case to its first pause, optionally exercising the human
/// commands, and prints what happened.
async fn drive_case(
    system: &Arc<CourtSystem>,
    case_number: &CaseNumber,
    auto_approve: bool,
    reject_reason: Option<String>,
) -> Result<()> {
    let mut updates = system
        .updates_from(case_number, 0)
        .await
        .map_err(|e| anyhow!("{}", e))?;
    let printer = tokio::spawn(async move {
        while let Some(notification) = updates.recv().await {
            println!("[{}] {}", notification.seq, notification.message);
        }
    });

    let mut view_rx = system
        .watch_view(case_number)
        .await
        .map_err(|e| anyhow!("{}", e))?;
    let paused = await_status(
        &mut view_rx,
        &[
            CaseStatus::AwaitingHumanApproval,
            CaseStatus::AuditFailed,
            CaseStatus::Failed,
        ],
    )
    .await?;

    match paused.status() {
        Some(CaseStatus::AwaitingHumanApproval) => {
            if let Some(reason) = reject_reason {
                println!("> rejecting draft: {}", reason);
                system
                    .reject(case_number, reason)
                    .await
                    .map_err(|e| anyhow!("{}", e))?;
                await_status(&mut view_rx, &[CaseStatus::AwaitingHumanApproval]).await?;
            }
            if auto_approve {
                println!("> approving draft");
                system
                    .approve(case_number)
                    .await
                    .map_err(|e| anyhow!("{}", e))?;
                let published = await_status(&mut view_rx, &[CaseStatus::Published]).await?;
                if let Some(draft) = published.draft() {
                    println!("\nPublished draft ({} citations):", draft.citations.len());
                    println!("{}", draft.content);
                }
            } else {
                println!(
                    "\nCase {} is awaiting human approval. Re-run with --auto-approve, \
                     or attach later to continue.",
                    case_number
                );
            }
        }
        Some(CaseStatus::AuditFailed) => {
            let issues = paused
                .audit()
                .map(|a| a.issues.join("; "))
                .unwrap_or_default();
            println!(
                "\nCase {} paused on a failed audit: {}. Use continue_from_audit to override.",
                case_number, issues
            );
        }
        Some(CaseStatus::Failed) => {
            println!(
                "\nCase {} failed: {}",
                case_number,
                paused.failure_message().unwrap_or("unknown failure")
            );
        }
        other => {
            println!("\nCase {} stopped in state {:?}", case_number, other);
        }
    }

    println!("\nQueue:");
    for row in system.all_cases() {
        println!(
            "  {} {} {} {}",
            row.case_number, row.status, row.procedure_type, row.urgency
        );
    }

    printer.abort();
    Ok(())
}
