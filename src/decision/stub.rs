//! Canned decision service for the demo binary and tests.
//!
//! Returns deterministic fixtures modelled on a civil liability claim,
//! with per-stage overrides so tests can force audit failures, timeouts,
//! or hard errors.

use super::DecisionService;
use crate::domain::types::{
    AuditResult, CaseNumber, DraftResult, ProcedureType, ScreeningResult, SecretariatResult,
    StageKind, Urgency,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// How a stubbed stage should behave.
#[derive(Debug, Clone, Default)]
pub enum StageBehavior {
    /// Return the canned fixture.
    #[default]
    Succeed,
    /// Fail the next `n` calls with an error, then return the fixture.
    FailTimes(u32),
    /// Fail every call with an error.
    AlwaysFail,
    /// Sleep this long before answering, to trip the engine timeout.
    Delay(Duration),
}

#[derive(Debug, Default)]
struct StubState {
    screening: StageBehavior,
    secretariat: StageBehavior,
    audit: StageBehavior,
    drafting: StageBehavior,
    audit_issues: Vec<String>,
}

/// Deterministic [`DecisionService`] with overridable per-stage behavior.
#[derive(Debug, Default)]
pub struct StubDecisionService {
    state: Mutex<StubState>,
}

impl StubDecisionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the audit stage report the given issues instead of passing.
    pub fn with_audit_issues(self, issues: &[&str]) -> Self {
        self.state.lock().unwrap().audit_issues = issues.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Overrides one stage's behavior.
    pub fn set_behavior(&self, stage: StageKind, behavior: StageBehavior) {
        let mut state = self.state.lock().unwrap();
        match stage {
            StageKind::Screening => state.screening = behavior,
            StageKind::Secretariat => state.secretariat = behavior,
            StageKind::Audit => state.audit = behavior,
            StageKind::Drafting => state.drafting = behavior,
        }
    }

    async fn run_behavior(&self, stage: StageKind) -> Result<()> {
        let behavior = {
            let mut state = self.state.lock().unwrap();
            let slot = match stage {
                StageKind::Screening => &mut state.screening,
                StageKind::Secretariat => &mut state.secretariat,
                StageKind::Audit => &mut state.audit,
                StageKind::Drafting => &mut state.drafting,
            };
            match slot {
                StageBehavior::FailTimes(0) => StageBehavior::Succeed,
                StageBehavior::FailTimes(n) => {
                    *n -= 1;
                    StageBehavior::AlwaysFail
                }
                other => other.clone(),
            }
        };
        match behavior {
            StageBehavior::Succeed | StageBehavior::FailTimes(_) => Ok(()),
            StageBehavior::AlwaysFail => bail!("stubbed {} failure", stage.label()),
            StageBehavior::Delay(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DecisionService for StubDecisionService {
    async fn screening(&self, case_number: &CaseNumber) -> Result<ScreeningResult> {
        self.run_behavior(StageKind::Screening).await?;
        debug!(case_number = %case_number, "stub screening");
        Ok(ScreeningResult {
            procedure_type: ProcedureType::Ordinary,
            urgency: Urgency::Medium,
            documents_complete: true,
            missing_documents: Vec::new(),
        })
    }

    async fn secretariat(&self, case_number: &CaseNumber) -> Result<SecretariatResult> {
        self.run_behavior(StageKind::Secretariat).await?;
        debug!(case_number = %case_number, "stub secretariat");
        Ok(SecretariatResult {
            generated_acts: vec![
                "Subpoena for response".to_string(),
                "Deadline notification".to_string(),
            ],
        })
    }

    async fn audit(&self, case_number: &CaseNumber) -> Result<AuditResult> {
        self.run_behavior(StageKind::Audit).await?;
        debug!(case_number = %case_number, "stub audit");
        let issues = self.state.lock().unwrap().audit_issues.clone();
        Ok(AuditResult {
            consistent: issues.is_empty(),
            issues,
        })
    }

    async fn drafting(&self, case_number: &CaseNumber, context: &str) -> Result<DraftResult> {
        self.run_behavior(StageKind::Drafting).await?;
        debug!(case_number = %case_number, context, "stub drafting");
        Ok(DraftResult {
            content: format!(
                "Draft decision for case {case_number}. {context} The party causing damage \
                 through an unlawful act is obligated to repair it (Civil Code Art. 927). \
                 Moral damages from traffic accidents are presumed when bodily injury is \
                 proven (Court Precedent STJ-331/2024). The insurer is directly liable to \
                 the injured third party up to the policy limit (Insurance Regulatory Norm \
                 SUSEP-42)."
            ),
            citations: vec![
                "Civil Code Art. 927".to_string(),
                "Court Precedent STJ-331/2024".to_string(),
                "Insurance Regulatory Norm SUSEP-42".to_string(),
            ],
        })
    }
}
