//! CQRS core types for the event-sourced case state machine.
//!
//! - **Commands**: intent to change case state
//! - **Events**: facts that have happened
//! - **Aggregate**: guard validation and event application
//! - **Query**: read-side projection hook

pub mod commands;
pub mod events;
pub mod query;

pub use commands::CaseCommand;
pub use events::CaseEvent;
pub use query::CaseQuery;

use crate::domain::errors::CaseError;
use crate::domain::services::CaseServices;
use crate::domain::types::{
    AuditResult, CaseStatus, DraftResult, ScreeningResult, SecretariatResult, StageKind,
};
use async_trait::async_trait;
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

/// Active case data once the aggregate is initialized.
///
/// Stage result fields are set exactly once per stage execution and may be
/// overwritten by a later re-execution of the same stage (audit re-run after
/// resume, draft regenerated after rejection). The case number itself is the
/// aggregate id and is not duplicated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseData {
    status: CaseStatus,
    screening: Option<ScreeningResult>,
    secretariat: Option<SecretariatResult>,
    audit: Option<AuditResult>,
    draft: Option<DraftResult>,
    rejection_reason: Option<String>,
    failure_message: Option<String>,
}

impl CaseData {
    fn received() -> Self {
        Self {
            status: CaseStatus::Received,
            screening: None,
            secretariat: None,
            audit: None,
            draft: None,
            rejection_reason: None,
            failure_message: None,
        }
    }

    pub fn status(&self) -> CaseStatus {
        self.status
    }

    pub fn screening(&self) -> Option<&ScreeningResult> {
        self.screening.as_ref()
    }

    pub fn secretariat(&self) -> Option<&SecretariatResult> {
        self.secretariat.as_ref()
    }

    pub fn audit(&self) -> Option<&AuditResult> {
        self.audit.as_ref()
    }

    pub fn draft(&self) -> Option<&DraftResult> {
        self.draft.as_ref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }
}

/// Case aggregate state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum CaseState {
    /// Aggregate has not been initialized (no `start` yet).
    #[default]
    Uninitialized,
    /// Aggregate is active with case data.
    Active(Box<CaseData>),
}

/// The case aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaseAggregate {
    pub state: CaseState,
}

/// Statuses from which a stage's decision operation may (re-)enter.
///
/// The stage's own in-progress status is legal so that an interrupted stage
/// can be retried from the last committed state after a process restart.
fn stage_entry_guard(stage: StageKind, status: CaseStatus) -> bool {
    let legal: &[CaseStatus] = match stage {
        StageKind::Screening => &[CaseStatus::Received, CaseStatus::Screening],
        StageKind::Secretariat => &[
            CaseStatus::ScreeningComplete,
            CaseStatus::SecretariatProcessing,
        ],
        StageKind::Audit => &[CaseStatus::SecretariatComplete, CaseStatus::Auditing],
        StageKind::Drafting => &[
            CaseStatus::AuditPassed,
            CaseStatus::Rejected,
            CaseStatus::Drafting,
        ],
    };
    legal.contains(&status)
}

/// Label of the logical work that failed, for failure messages.
pub fn failed_stage_label(stage: StageKind, revision: bool) -> &'static str {
    if revision && stage == StageKind::Drafting {
        "Draft revision"
    } else {
        stage.label()
    }
}

#[async_trait]
impl Aggregate for CaseAggregate {
    type Command = CaseCommand;
    type Event = CaseEvent;
    type Error = CaseError;
    type Services = CaseServices;

    fn aggregate_type() -> String {
        "case".to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        let now = services.clock.now();

        let data = match (&self.state, &command) {
            (CaseState::Uninitialized, CaseCommand::Start) => {
                return Ok(vec![CaseEvent::CaseStarted { started_at: now }]);
            }
            (CaseState::Uninitialized, _) => return Err(CaseError::NotStarted),
            (CaseState::Active(_), CaseCommand::Start) => return Err(CaseError::AlreadyStarted),
            (CaseState::Active(data), _) => data,
        };

        let status = data.status();
        let command_name = command.name();
        let invalid = move |expected: &'static str| CaseError::InvalidTransition {
            command: command_name,
            expected,
            actual: status,
        };

        match command {
            CaseCommand::BeginStage { stage } => {
                if stage_entry_guard(stage, status) {
                    Ok(vec![CaseEvent::StageStarted {
                        stage,
                        started_at: now,
                    }])
                } else {
                    Err(invalid("the stage's predecessor status"))
                }
            }

            CaseCommand::RecordScreening { result } => {
                if status == CaseStatus::Screening {
                    Ok(vec![CaseEvent::ScreeningRecorded {
                        result,
                        recorded_at: now,
                    }])
                } else {
                    Err(invalid("SCREENING"))
                }
            }

            CaseCommand::RecordSecretariat { result } => {
                if status == CaseStatus::SecretariatProcessing {
                    Ok(vec![CaseEvent::SecretariatRecorded {
                        result,
                        recorded_at: now,
                    }])
                } else {
                    Err(invalid("SECRETARIAT_PROCESSING"))
                }
            }

            CaseCommand::RecordAudit { result } => {
                if status != CaseStatus::Auditing {
                    return Err(invalid("AUDITING"));
                }
                if result.consistent {
                    Ok(vec![CaseEvent::AuditPassed {
                        result,
                        recorded_at: now,
                    }])
                } else {
                    Ok(vec![CaseEvent::AuditFailed {
                        result,
                        recorded_at: now,
                    }])
                }
            }

            CaseCommand::RecordDraft { result } => {
                if status == CaseStatus::Drafting {
                    Ok(vec![
                        CaseEvent::DraftRecorded {
                            result,
                            recorded_at: now,
                        },
                        CaseEvent::ApprovalRequested { requested_at: now },
                    ])
                } else {
                    Err(invalid("DRAFTING"))
                }
            }

            CaseCommand::Approve => {
                if status == CaseStatus::AwaitingHumanApproval {
                    Ok(vec![CaseEvent::CaseApproved { approved_at: now }])
                } else {
                    Err(invalid("AWAITING_HUMAN_APPROVAL"))
                }
            }

            CaseCommand::Reject { reason } => {
                if status == CaseStatus::AwaitingHumanApproval {
                    Ok(vec![CaseEvent::CaseRejected {
                        reason,
                        rejected_at: now,
                    }])
                } else {
                    Err(invalid("AWAITING_HUMAN_APPROVAL"))
                }
            }

            CaseCommand::RecordPublication => {
                if status == CaseStatus::Approved {
                    Ok(vec![CaseEvent::CasePublished { published_at: now }])
                } else {
                    Err(invalid("APPROVED"))
                }
            }

            CaseCommand::Resume => {
                if status == CaseStatus::Failed {
                    Ok(vec![CaseEvent::CaseResumed { resumed_at: now }])
                } else {
                    Err(invalid("FAILED"))
                }
            }

            CaseCommand::ContinueFromAudit => {
                if status == CaseStatus::AuditFailed {
                    Ok(vec![CaseEvent::AuditOverridden { overridden_at: now }])
                } else {
                    Err(invalid("AUDIT_FAILED"))
                }
            }

            // Explicit abort is legal from any initialized status.
            CaseCommand::Fail { reason } => Ok(vec![CaseEvent::CaseFailed {
                message: reason,
                failed_at: now,
            }]),

            CaseCommand::RecordStageFailure { stage, revision } => {
                if status == stage.in_progress_status() {
                    let message = format!(
                        "{} failed after retries. Human intervention required.",
                        failed_stage_label(stage, revision)
                    );
                    Ok(vec![CaseEvent::CaseFailed {
                        message,
                        failed_at: now,
                    }])
                } else {
                    Err(invalid("the stage's in-progress status"))
                }
            }

            // Start is fully handled above.
            CaseCommand::Start => unreachable!("start handled before guard dispatch"),
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match (&mut self.state, event) {
            (CaseState::Uninitialized, CaseEvent::CaseStarted { .. }) => {
                self.state = CaseState::Active(Box::new(CaseData::received()));
            }

            (CaseState::Active(data), CaseEvent::StageStarted { stage, .. }) => {
                data.status = stage.in_progress_status();
            }

            (CaseState::Active(data), CaseEvent::ScreeningRecorded { result, .. }) => {
                data.screening = Some(result);
                data.status = CaseStatus::ScreeningComplete;
            }

            (CaseState::Active(data), CaseEvent::SecretariatRecorded { result, .. }) => {
                data.secretariat = Some(result);
                data.status = CaseStatus::SecretariatComplete;
            }

            (CaseState::Active(data), CaseEvent::AuditPassed { result, .. }) => {
                data.audit = Some(result);
                data.status = CaseStatus::AuditPassed;
            }

            (CaseState::Active(data), CaseEvent::AuditFailed { result, .. }) => {
                data.audit = Some(result);
                data.status = CaseStatus::AuditFailed;
            }

            (CaseState::Active(data), CaseEvent::DraftRecorded { result, .. }) => {
                data.draft = Some(result);
                data.status = CaseStatus::DraftReady;
            }

            (CaseState::Active(data), CaseEvent::ApprovalRequested { .. }) => {
                data.status = CaseStatus::AwaitingHumanApproval;
            }

            (CaseState::Active(data), CaseEvent::CaseApproved { .. }) => {
                data.status = CaseStatus::Approved;
            }

            (CaseState::Active(data), CaseEvent::CasePublished { .. }) => {
                data.status = CaseStatus::Published;
            }

            (CaseState::Active(data), CaseEvent::CaseRejected { reason, .. }) => {
                data.rejection_reason = Some(reason);
                data.status = CaseStatus::Rejected;
            }

            (CaseState::Active(data), CaseEvent::CaseResumed { .. }) => {
                // The pipeline restarts from the beginning; a rejection
                // reason from the aborted cycle must not flag the next
                // drafting run as a revision.
                data.failure_message = None;
                data.rejection_reason = None;
                data.status = CaseStatus::Received;
            }

            (CaseState::Active(data), CaseEvent::AuditOverridden { .. }) => {
                data.status = CaseStatus::AuditPassed;
            }

            (CaseState::Active(data), CaseEvent::CaseFailed { message, .. }) => {
                data.failure_message = Some(message);
                data.status = CaseStatus::Failed;
            }

            // Events on the wrong state only happen with a corrupted log.
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "../tests/aggregate_tests.rs"]
mod tests;
