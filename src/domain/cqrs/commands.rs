//! Case commands for the CQRS aggregate.
//!
//! Commands represent intent to change state. The aggregate validates each
//! command against the current status (the guard table) and produces events
//! that are persisted to the event log before any further side effect runs.

use crate::domain::types::{
    AuditResult, DraftResult, ScreeningResult, SecretariatResult, StageKind,
};
use serde::{Deserialize, Serialize};

/// Commands that can be executed against the case aggregate.
///
/// `Start` and the human commands (`Approve`, `Reject`, `Resume`,
/// `ContinueFromAudit`, `Fail`) arrive through the gateway. `BeginStage`,
/// the `Record*` results, `RecordStageFailure` and `RecordPublication` are
/// issued by the engine driver as it sequences stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseCommand {
    /// Initialize aggregate state for a new case.
    Start,

    /// Mark a stage's decision operation as in flight.
    BeginStage { stage: StageKind },

    /// Screening operation produced a classification.
    RecordScreening { result: ScreeningResult },

    /// Secretariat operation generated administrative acts.
    RecordSecretariat { result: SecretariatResult },

    /// Audit operation finished; the aggregate branches on consistency.
    RecordAudit { result: AuditResult },

    /// Drafting operation produced a decision draft. Emits both the
    /// draft-ready event and the awaiting-approval pause event.
    RecordDraft { result: DraftResult },

    /// Human approved the draft.
    Approve,

    /// Human rejected the draft; the reason feeds the revision context.
    Reject { reason: String },

    /// Publication side effect completed after approval.
    RecordPublication,

    /// Human resumed a failed case from the beginning of the pipeline.
    Resume,

    /// Human overrode a failed audit and let drafting proceed.
    ContinueFromAudit,

    /// Human aborted the case from any state.
    Fail { reason: String },

    /// A stage exhausted its retries; records which stage failed.
    RecordStageFailure { stage: StageKind, revision: bool },
}

impl CaseCommand {
    /// Human-readable command name for guard-violation error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::BeginStage { .. } => "begin_stage",
            Self::RecordScreening { .. } => "record_screening",
            Self::RecordSecretariat { .. } => "record_secretariat",
            Self::RecordAudit { .. } => "record_audit",
            Self::RecordDraft { .. } => "record_draft",
            Self::Approve => "approve",
            Self::Reject { .. } => "reject",
            Self::RecordPublication => "record_publication",
            Self::Resume => "resume",
            Self::ContinueFromAudit => "continue_from_audit",
            Self::Fail { .. } => "fail",
            Self::RecordStageFailure { .. } => "record_stage_failure",
        }
    }
}
