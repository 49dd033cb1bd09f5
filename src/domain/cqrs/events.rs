//! Case events for the CQRS aggregate.
//!
//! Events represent facts that have happened. They are the single source of
//! truth for case state and are persisted to the event log before the engine
//! acts on them.

use crate::domain::types::{
    AuditResult, DraftResult, ScreeningResult, SecretariatResult, StageKind, TimestampUtc,
};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

/// Events emitted by the case aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseEvent {
    /// Case was started and entered the pipeline.
    CaseStarted { started_at: TimestampUtc },

    /// A stage's decision operation went in flight.
    StageStarted {
        stage: StageKind,
        started_at: TimestampUtc,
    },

    /// Screening classification recorded.
    ScreeningRecorded {
        result: ScreeningResult,
        recorded_at: TimestampUtc,
    },

    /// Secretariat acts recorded.
    SecretariatRecorded {
        result: SecretariatResult,
        recorded_at: TimestampUtc,
    },

    /// Audit found the case consistent.
    AuditPassed {
        result: AuditResult,
        recorded_at: TimestampUtc,
    },

    /// Audit found inconsistencies; the case pauses for intervention.
    AuditFailed {
        result: AuditResult,
        recorded_at: TimestampUtc,
    },

    /// Decision draft recorded.
    DraftRecorded {
        result: DraftResult,
        recorded_at: TimestampUtc,
    },

    /// Case paused awaiting human approval of the draft.
    ApprovalRequested { requested_at: TimestampUtc },

    /// Human approved the draft.
    CaseApproved { approved_at: TimestampUtc },

    /// Case published (terminal).
    CasePublished { published_at: TimestampUtc },

    /// Human rejected the draft with a reason.
    CaseRejected {
        reason: String,
        rejected_at: TimestampUtc,
    },

    /// Failed case resumed from the beginning of the pipeline.
    CaseResumed { resumed_at: TimestampUtc },

    /// Failed audit overridden; drafting may proceed.
    AuditOverridden { overridden_at: TimestampUtc },

    /// Case failed, either by explicit command or exhausted retries.
    CaseFailed {
        message: String,
        failed_at: TimestampUtc,
    },
}

impl DomainEvent for CaseEvent {
    fn event_type(&self) -> String {
        match self {
            Self::CaseStarted { .. } => "CaseStarted".to_string(),
            Self::StageStarted { .. } => "StageStarted".to_string(),
            Self::ScreeningRecorded { .. } => "ScreeningRecorded".to_string(),
            Self::SecretariatRecorded { .. } => "SecretariatRecorded".to_string(),
            Self::AuditPassed { .. } => "AuditPassed".to_string(),
            Self::AuditFailed { .. } => "AuditFailed".to_string(),
            Self::DraftRecorded { .. } => "DraftRecorded".to_string(),
            Self::ApprovalRequested { .. } => "ApprovalRequested".to_string(),
            Self::CaseApproved { .. } => "CaseApproved".to_string(),
            Self::CasePublished { .. } => "CasePublished".to_string(),
            Self::CaseRejected { .. } => "CaseRejected".to_string(),
            Self::CaseResumed { .. } => "CaseResumed".to_string(),
            Self::AuditOverridden { .. } => "AuditOverridden".to_string(),
            Self::CaseFailed { .. } => "CaseFailed".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1".to_string()
    }
}
