//! Per-case read view derived from committed events.
//!
//! `CaseView` is the Case State snapshot returned by `get()` and fed to the
//! projector. It is derived from `CaseEvent` only (no direct mutation) and is
//! rebuilt by replay when a case is re-attached after a process restart.

use crate::domain::types::{
    AuditResult, CaseNumber, CaseStatus, DraftResult, ScreeningResult, SecretariatResult,
};
use crate::domain::CaseEvent;
use serde::{Deserialize, Serialize};

/// Read-only view of case state derived from events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseView {
    case_number: Option<CaseNumber>,
    status: Option<CaseStatus>,
    screening: Option<ScreeningResult>,
    secretariat: Option<SecretariatResult>,
    audit: Option<AuditResult>,
    draft: Option<DraftResult>,
    rejection_reason: Option<String>,
    failure_message: Option<String>,
    last_event_sequence: u64,
}

impl CaseView {
    /// Apply one committed event to update the view.
    pub fn apply_event(&mut self, aggregate_id: &str, event: &CaseEvent, sequence: u64) {
        self.case_number = Some(CaseNumber::from(aggregate_id));
        self.last_event_sequence = sequence;

        match event {
            CaseEvent::CaseStarted { .. } => {
                self.status = Some(CaseStatus::Received);
                self.screening = None;
                self.secretariat = None;
                self.audit = None;
                self.draft = None;
                self.rejection_reason = None;
                self.failure_message = None;
            }

            CaseEvent::StageStarted { stage, .. } => {
                self.status = Some(stage.in_progress_status());
            }

            CaseEvent::ScreeningRecorded { result, .. } => {
                self.screening = Some(result.clone());
                self.status = Some(CaseStatus::ScreeningComplete);
            }

            CaseEvent::SecretariatRecorded { result, .. } => {
                self.secretariat = Some(result.clone());
                self.status = Some(CaseStatus::SecretariatComplete);
            }

            CaseEvent::AuditPassed { result, .. } => {
                self.audit = Some(result.clone());
                self.status = Some(CaseStatus::AuditPassed);
            }

            CaseEvent::AuditFailed { result, .. } => {
                self.audit = Some(result.clone());
                self.status = Some(CaseStatus::AuditFailed);
            }

            CaseEvent::DraftRecorded { result, .. } => {
                self.draft = Some(result.clone());
                self.status = Some(CaseStatus::DraftReady);
            }

            CaseEvent::ApprovalRequested { .. } => {
                self.status = Some(CaseStatus::AwaitingHumanApproval);
            }

            CaseEvent::CaseApproved { .. } => {
                self.status = Some(CaseStatus::Approved);
            }

            CaseEvent::CasePublished { .. } => {
                self.status = Some(CaseStatus::Published);
            }

            CaseEvent::CaseRejected { reason, .. } => {
                self.rejection_reason = Some(reason.clone());
                self.status = Some(CaseStatus::Rejected);
            }

            CaseEvent::CaseResumed { .. } => {
                // The pipeline restarts from the beginning; a rejection
                // reason from the aborted cycle must not flag the next
                // drafting run as a revision.
                self.failure_message = None;
                self.rejection_reason = None;
                self.status = Some(CaseStatus::Received);
            }

            CaseEvent::AuditOverridden { .. } => {
                self.status = Some(CaseStatus::AuditPassed);
            }

            CaseEvent::CaseFailed { message, .. } => {
                self.failure_message = Some(message.clone());
                self.status = Some(CaseStatus::Failed);
            }
        }
    }

    /// Returns the case number once the view has seen any event.
    pub fn case_number(&self) -> Option<&CaseNumber> {
        self.case_number.as_ref()
    }

    /// Returns the current status, or `None` before `start`.
    pub fn status(&self) -> Option<CaseStatus> {
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

    /// Sequence number of the last event applied, used as a stream cursor.
    pub fn last_event_sequence(&self) -> u64 {
        self.last_event_sequence
    }

    /// True once the view has seen any event for its case.
    pub fn is_started(&self) -> bool {
        self.status.is_some()
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
