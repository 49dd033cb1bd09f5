//! Decision services backing each processing stage.
//!
//! The engine talks to these through the [`DecisionService`] trait so a
//! deployment can plug in clerks, model-backed assistants, or the canned
//! stub used by tests and the demo binary.

use crate::domain::types::{
    AuditResult, CaseNumber, DraftResult, ScreeningResult, SecretariatResult,
};
use anyhow::Result;
use async_trait::async_trait;

pub mod stub;

pub use stub::StubDecisionService;

/// Produces the outcome of each stage for a given case.
///
/// Implementations are expected to be idempotent per case: the engine may
/// re-run a stage after a crash or timeout, and a late result for a stage
/// the case has already left is discarded.
#[async_trait]
pub trait DecisionService: Send + Sync {
    /// Classifies the case: procedure type, urgency, document completeness.
    async fn screening(&self, case_number: &CaseNumber) -> Result<ScreeningResult>;

    /// Determines the administrative acts the secretariat must issue.
    async fn secretariat(&self, case_number: &CaseNumber) -> Result<SecretariatResult>;

    /// Checks the case record for formal consistency.
    async fn audit(&self, case_number: &CaseNumber) -> Result<AuditResult>;

    /// Drafts a decision suggestion. `context` carries the audit summary
    /// or, on revision, the rejection reason.
    async fn drafting(&self, case_number: &CaseNumber, context: &str) -> Result<DraftResult>;
}
