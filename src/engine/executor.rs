//! Bounded single-stage execution.
//!
//! Wraps one decision-service call in the configured timeout and retry
//! policy. The executor knows nothing about case state; it just turns a
//! [`StageKind`] into a [`StageOutput`] or reports exhaustion.

use crate::decision::DecisionService;
use crate::domain::types::{
    AuditResult, CaseNumber, DraftResult, ScreeningResult, SecretariatResult, StageKind,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Result payload of a completed stage.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Screening(ScreeningResult),
    Secretariat(SecretariatResult),
    Audit(AuditResult),
    Draft(DraftResult),
}

/// Timeout and retry policy for one stage attempt sequence.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempt_timeout: Duration,
    /// Attempts after the first one.
    pub max_retries: u32,
}

impl RetryPolicy {
    fn attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Runs one stage to completion or exhaustion.
///
/// Each attempt is bounded by `policy.attempt_timeout`; a timed-out or
/// failed attempt is retried until the policy is spent. Returns `None`
/// when every attempt failed.
pub async fn execute_stage(
    service: &Arc<dyn DecisionService>,
    stage: StageKind,
    case_number: &CaseNumber,
    drafting_context: &str,
    policy: RetryPolicy,
) -> Option<StageOutput> {
    for attempt in 1..=policy.attempts() {
        let call = run_once(service, stage, case_number, drafting_context);
        match tokio::time::timeout(policy.attempt_timeout, call).await {
            Ok(Ok(output)) => return Some(output),
            Ok(Err(e)) => {
                warn!(case_number = %case_number, stage = stage.label(), attempt,
                      "stage attempt failed: {:#}", e);
            }
            Err(_) => {
                warn!(case_number = %case_number, stage = stage.label(), attempt,
                      timeout_secs = policy.attempt_timeout.as_secs(),
                      "stage attempt timed out");
            }
        }
    }
    None
}

async fn run_once(
    service: &Arc<dyn DecisionService>,
    stage: StageKind,
    case_number: &CaseNumber,
    drafting_context: &str,
) -> anyhow::Result<StageOutput> {
    match stage {
        StageKind::Screening => service
            .screening(case_number)
            .await
            .map(StageOutput::Screening),
        StageKind::Secretariat => service
            .secretariat(case_number)
            .await
            .map(StageOutput::Secretariat),
        StageKind::Audit => service.audit(case_number).await.map(StageOutput::Audit),
        StageKind::Drafting => service
            .drafting(case_number, drafting_context)
            .await
            .map(StageOutput::Draft),
    }
}

#[cfg(test)]
#[path = "tests/executor_tests.rs"]
mod tests;
