//! Per-case pipeline driver.
//!
//! One engine task runs per open case. It watches the case's view
//! snapshot, maps the current status to the next stage, runs that stage
//! through the decision service with the configured timeout and retry
//! policy, and records the result as a command against the case actor.
//! Pause statuses (awaiting approval, audit failed, failed) park the
//! task on the watch channel; a human command moves the status and the
//! watch wakes the engine.
//!
//! All writes still flow through the case actor, so human commands and
//! engine progress serialize on the same mailbox. A stage result that
//! arrives after a human command already moved the case is rejected by
//! the aggregate guard and discarded here.

pub mod executor;

use crate::config::EngineConfig;
use crate::decision::DecisionService;
use crate::domain::types::{CaseNumber, CaseStatus, StageKind};
use crate::domain::{execute_command, failed_stage_label, CaseCommand, CaseError, CaseMessage};
use crate::domain::CaseView;
use crate::notify::Notifier;
use executor::{execute_stage, RetryPolicy, StageOutput};
use ractor::ActorRef;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Outcome of one command send from the engine.
enum SendOutcome {
    /// Command applied; keep driving.
    Applied,
    /// The case moved underneath us; re-read the view and re-plan.
    Stale,
    /// The actor is unavailable (respawning or torn down); back off.
    Unavailable,
}

pub struct CaseEngine {
    case_number: CaseNumber,
    actor_name: String,
    view_rx: watch::Receiver<CaseView>,
    service: Arc<dyn DecisionService>,
    notifier: Arc<Notifier>,
    policy: RetryPolicy,
}

impl CaseEngine {
    pub fn new(
        case_number: CaseNumber,
        actor_name: String,
        view_rx: watch::Receiver<CaseView>,
        service: Arc<dyn DecisionService>,
        notifier: Arc<Notifier>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            case_number,
            actor_name,
            view_rx,
            service,
            notifier,
            policy: RetryPolicy {
                attempt_timeout: config.step_timeout(),
                max_retries: config.max_retries,
            },
        }
    }

    /// Spawns the driver task for this case.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drives the case until it is published or the actor tree is torn down.
    pub async fn run(mut self) {
        loop {
            let view = self.view_rx.borrow_and_update().clone();
            let Some(status) = view.status() else {
                // Not started yet; wait for the first event.
                if self.view_rx.changed().await.is_err() {
                    return;
                }
                continue;
            };

            match status {
                CaseStatus::Received | CaseStatus::Screening => {
                    self.run_stage(StageKind::Screening, &view, status).await;
                }
                CaseStatus::ScreeningComplete | CaseStatus::SecretariatProcessing => {
                    self.run_stage(StageKind::Secretariat, &view, status).await;
                }
                CaseStatus::SecretariatComplete | CaseStatus::Auditing => {
                    self.run_stage(StageKind::Audit, &view, status).await;
                }
                CaseStatus::AuditPassed | CaseStatus::Rejected | CaseStatus::Drafting => {
                    self.run_stage(StageKind::Drafting, &view, status).await;
                }
                CaseStatus::Approved => {
                    self.publish_case().await;
                }
                CaseStatus::Published => {
                    info!(case_number = %self.case_number, "case published, engine done");
                    return;
                }
                // DraftReady only shows up alone if the approval-request
                // event of the same commit has not landed yet; wait it out.
                CaseStatus::DraftReady
                | CaseStatus::AwaitingHumanApproval
                | CaseStatus::AuditFailed
                | CaseStatus::Failed => {
                    if self.view_rx.changed().await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Runs one stage end to end: begin marker, decision call with retry,
    /// result command, notifications.
    async fn run_stage(&mut self, stage: StageKind, view: &CaseView, status: CaseStatus) {
        let revision = status == CaseStatus::Rejected
            || (status == CaseStatus::Drafting && view.rejection_reason().is_some());

        // Mark the stage in flight unless a prior run (interrupted by a
        // crash) already did.
        if status != stage.in_progress_status() {
            match self.send(CaseCommand::BeginStage { stage }).await {
                SendOutcome::Applied => {}
                SendOutcome::Stale => {
                    debug!(case_number = %self.case_number, stage = stage.label(),
                           "stage entry rejected, re-planning");
                    return;
                }
                SendOutcome::Unavailable => return,
            }
        }

        self.notifier
            .publish(&self.case_number, self.start_message(stage, revision));

        let context = if stage == StageKind::Drafting {
            drafting_context(view, revision)
        } else {
            String::new()
        };

        let Some(output) =
            execute_stage(&self.service, stage, &self.case_number, &context, self.policy).await
        else {
            self.fail_stage(stage, revision).await;
            return;
        };

        let completion = completion_message(&output, revision);
        let is_draft = matches!(output, StageOutput::Draft(_));
        let record = match output {
            StageOutput::Screening(result) => CaseCommand::RecordScreening { result },
            StageOutput::Secretariat(result) => CaseCommand::RecordSecretariat { result },
            StageOutput::Audit(result) => CaseCommand::RecordAudit { result },
            StageOutput::Draft(result) => CaseCommand::RecordDraft { result },
        };

        match self.send(record).await {
            SendOutcome::Applied => {}
            SendOutcome::Stale => {
                debug!(case_number = %self.case_number, stage = stage.label(),
                       "stale stage result discarded");
                return;
            }
            SendOutcome::Unavailable => return,
        }

        self.notifier.publish(&self.case_number, completion);
        if is_draft {
            self.notifier
                .publish(&self.case_number, "Awaiting human approval");
        }
    }

    /// Records exhausted retries and parks the case as failed.
    async fn fail_stage(&mut self, stage: StageKind, revision: bool) {
        let label = failed_stage_label(stage, revision);
        match self
            .send(CaseCommand::RecordStageFailure { stage, revision })
            .await
        {
            SendOutcome::Applied => {
                self.notifier
                    .publish(&self.case_number, format!("Workflow failed during: {label}"));
            }
            SendOutcome::Stale => {
                debug!(case_number = %self.case_number, stage = stage.label(),
                       "stage failure superseded by another command");
            }
            SendOutcome::Unavailable => {}
        }
    }

    /// Publication side effect after human approval.
    async fn publish_case(&mut self) {
        match self.send(CaseCommand::RecordPublication).await {
            SendOutcome::Applied => {
                self.notifier
                    .publish(&self.case_number, "Case approved and published");
            }
            SendOutcome::Stale => {
                debug!(case_number = %self.case_number, "publication superseded");
            }
            SendOutcome::Unavailable => {}
        }
    }

    fn start_message(&self, stage: StageKind, revision: bool) -> String {
        match stage {
            StageKind::Screening => {
                format!("Screening started for case {}", self.case_number)
            }
            StageKind::Secretariat => "Secretariat processing started".to_string(),
            StageKind::Audit => "Consistency audit started".to_string(),
            StageKind::Drafting if revision => "Revising draft after rejection".to_string(),
            StageKind::Drafting => "Draft generation started".to_string(),
        }
    }

    /// Sends a command through the case actor, classifying the outcome.
    async fn send(&self, command: CaseCommand) -> SendOutcome {
        let Some(cell) = ractor::registry::where_is(self.actor_name.clone()) else {
            // The supervisor may be mid-respawn; give it a beat.
            tokio::time::sleep(Duration::from_millis(50)).await;
            return SendOutcome::Unavailable;
        };
        let actor: ActorRef<CaseMessage> = cell.into();
        match execute_command(&actor, command).await {
            Ok(_) => SendOutcome::Applied,
            Err(CaseError::InvalidTransition { .. }) => SendOutcome::Stale,
            Err(e) => {
                warn!(case_number = %self.case_number, "engine command failed: {}", e);
                tokio::time::sleep(Duration::from_millis(50)).await;
                SendOutcome::Unavailable
            }
        }
    }
}

/// Context handed to the drafting service.
fn drafting_context(view: &CaseView, revision: bool) -> String {
    if revision {
        let reason = view.rejection_reason().unwrap_or("unspecified");
        format!("Previous draft was rejected. Reason: {reason}. Please revise the draft.")
    } else if view.audit().is_some() {
        "Audit passed. No issues found.".to_string()
    } else {
        "No audit available.".to_string()
    }
}

fn completion_message(output: &StageOutput, revision: bool) -> String {
    match output {
        StageOutput::Screening(result) => format!(
            "Screening completed: {}, urgency {}",
            result.procedure_type, result.urgency
        ),
        StageOutput::Secretariat(result) => format!(
            "Secretariat completed: {} acts generated",
            result.generated_acts.len()
        ),
        StageOutput::Audit(result) if result.consistent => {
            "Audit passed: no issues found".to_string()
        }
        StageOutput::Audit(result) => format!(
            "Audit failed: {} issues found - human intervention required",
            result.issues.len()
        ),
        StageOutput::Draft(_) if revision => "Revised draft ready".to_string(),
        StageOutput::Draft(result) => {
            format!("Draft ready with {} citations", result.citations.len())
        }
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
