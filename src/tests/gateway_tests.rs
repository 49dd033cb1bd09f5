//! End-to-end tests through the `CourtSystem` facade: full pipeline
//! runs, duplicate-start rejection, restart recovery from the event
//! log, and notification replay across reconnects.

use crate::config::EngineConfig;
use crate::decision::{DecisionService, StubDecisionService};
use crate::domain::types::{CaseNumber, CaseStatus};
use crate::domain::CaseError;
use crate::gateway::{await_status, CourtSystem};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn test_config(dir: &tempfile::TempDir) -> EngineConfig {
    EngineConfig {
        step_timeout_secs: 5,
        ..EngineConfig::new(dir.path())
    }
}

async fn system_in(dir: &tempfile::TempDir) -> CourtSystem {
    let service: Arc<dyn DecisionService> = Arc::new(StubDecisionService::new());
    CourtSystem::new(test_config(dir), service)
        .await
        .expect("system spawn")
}

async fn wait_for(
    system: &CourtSystem,
    case: &CaseNumber,
    statuses: &[CaseStatus],
) -> crate::domain::CaseView {
    let mut rx = system.watch_view(case).await.expect("watch view");
    timeout(WAIT, await_status(&mut rx, statuses))
        .await
        .expect("timed out waiting for status")
        .expect("view channel closed")
}

#[tokio::test]
async fn full_pipeline_start_approve_publish() {
    let dir = tempfile::tempdir().unwrap();
    let system = system_in(&dir).await;
    let case = CaseNumber::from("CASE-G-1");

    let started = system.start(&case).await.expect("start");
    assert_eq!(started.status(), Some(CaseStatus::Received));

    let paused = wait_for(&system, &case, &[CaseStatus::AwaitingHumanApproval]).await;
    assert!(paused.draft().is_some());

    system.approve(&case).await.expect("approve");
    let published = wait_for(&system, &case, &[CaseStatus::Published]).await;
    assert_eq!(published.status(), Some(CaseStatus::Published));

    // Projections caught up with the terminal state.
    let rows = system.all_cases();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "PUBLISHED");
    assert_eq!(rows[0].procedure_type, "ORDINARY");

    system.shutdown().await;
}

#[tokio::test]
async fn duplicate_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let system = system_in(&dir).await;
    let case = CaseNumber::from("CASE-G-2");

    system.start(&case).await.expect("first start");
    assert_eq!(system.start(&case).await, Err(CaseError::AlreadyStarted));

    system.shutdown().await;
}

#[tokio::test]
async fn racing_starts_leave_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let system = system_in(&dir).await;
    let case = CaseNumber::from("CASE-G-9");

    // Both starts pass the optimistic checks before either registers;
    // the loser must still see AlreadyStarted, not a storage error.
    let (a, b) = tokio::join!(system.start(&case), system.start(&case));
    let (won, lost) = if a.is_ok() { (a, b) } else { (b, a) };
    assert!(won.is_ok());
    assert_eq!(lost, Err(CaseError::AlreadyStarted));

    system.shutdown().await;
}

#[tokio::test]
async fn commands_against_unknown_cases_report_not_started() {
    let dir = tempfile::tempdir().unwrap();
    let system = system_in(&dir).await;
    let case = CaseNumber::from("CASE-G-3");

    assert_eq!(system.get(&case).await, Err(CaseError::NotStarted));
    assert_eq!(system.approve(&case).await, Err(CaseError::NotStarted));
    assert_eq!(system.attach(&case).await, Err(CaseError::NotStarted));

    system.shutdown().await;
}

#[tokio::test]
async fn approve_outside_the_pause_is_an_invalid_transition() {
    let dir = tempfile::tempdir().unwrap();
    let system = system_in(&dir).await;
    let case = CaseNumber::from("CASE-G-4");

    system.start(&case).await.expect("start");
    wait_for(&system, &case, &[CaseStatus::AwaitingHumanApproval]).await;
    system.approve(&case).await.expect("approve");
    wait_for(&system, &case, &[CaseStatus::Published]).await;

    let err = system.approve(&case).await.unwrap_err();
    assert!(matches!(err, CaseError::InvalidTransition { .. }));

    system.shutdown().await;
}

#[tokio::test]
async fn restart_recovers_paused_case_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let case = CaseNumber::from("CASE-G-5");

    {
        let system = system_in(&dir).await;
        system.start(&case).await.expect("start");
        wait_for(&system, &case, &[CaseStatus::AwaitingHumanApproval]).await;
        system.shutdown().await;
    }

    // A fresh process over the same data dir sees the committed state.
    let system = system_in(&dir).await;
    assert_eq!(system.start(&case).await, Err(CaseError::AlreadyStarted));

    let attached = system.attach(&case).await.expect("attach");
    assert_eq!(attached.status(), Some(CaseStatus::AwaitingHumanApproval));
    assert!(attached.draft().is_some());

    system.approve(&case).await.expect("approve");
    let published = wait_for(&system, &case, &[CaseStatus::Published]).await;
    assert_eq!(published.status(), Some(CaseStatus::Published));

    system.shutdown().await;
}

#[tokio::test]
async fn rejection_is_revised_and_can_then_be_approved() {
    let dir = tempfile::tempdir().unwrap();
    let system = system_in(&dir).await;
    let case = CaseNumber::from("CASE-G-6");

    system.start(&case).await.expect("start");
    wait_for(&system, &case, &[CaseStatus::AwaitingHumanApproval]).await;

    system
        .reject(&case, "Missing jurisprudence section")
        .await
        .expect("reject");
    let revised = wait_for(&system, &case, &[CaseStatus::AwaitingHumanApproval]).await;
    assert!(revised
        .draft()
        .unwrap()
        .content
        .contains("Missing jurisprudence section"));

    system.approve(&case).await.expect("approve");
    wait_for(&system, &case, &[CaseStatus::Published]).await;

    system.shutdown().await;
}

#[tokio::test]
async fn updates_from_replays_every_notification_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let system = system_in(&dir).await;
    let case = CaseNumber::from("CASE-G-7");

    system.start(&case).await.expect("start");
    wait_for(&system, &case, &[CaseStatus::AwaitingHumanApproval]).await;

    // Subscribe after the fact; replay covers everything missed.
    let mut stream = system.updates_from(&case, 0).await.expect("stream");
    let mut seqs = Vec::new();
    let mut messages = Vec::new();
    loop {
        let notification = timeout(WAIT, stream.recv())
            .await
            .expect("timed out")
            .expect("notifier closed");
        seqs.push(notification.seq);
        let done = notification.message == "Awaiting human approval";
        messages.push(notification.message);
        if done {
            break;
        }
    }
    let expected_seqs: Vec<u64> = (1..=seqs.len() as u64).collect();
    assert_eq!(seqs, expected_seqs);
    assert_eq!(messages.first().unwrap(), "Screening started for case CASE-G-7");

    // Resuming from the cursor yields nothing until new progress happens.
    let cursor = stream.cursor();
    drop(stream);
    let mut resumed = system.updates_from(&case, cursor).await.expect("stream");
    system.approve(&case).await.expect("approve");
    let next = timeout(WAIT, resumed.recv())
        .await
        .expect("timed out")
        .expect("notifier closed");
    assert_eq!(next.seq, cursor + 1);
    assert_eq!(next.message, "Case approved and published");

    system.shutdown().await;
}

#[tokio::test]
async fn failed_case_shows_up_in_queue_and_resume_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    let stub = Arc::new(StubDecisionService::new());
    stub.set_behavior(
        crate::domain::types::StageKind::Screening,
        crate::decision::stub::StageBehavior::AlwaysFail,
    );
    let service: Arc<dyn DecisionService> = stub.clone();
    let system = CourtSystem::new(test_config(&dir), service)
        .await
        .expect("system spawn");
    let case = CaseNumber::from("CASE-G-8");

    system.start(&case).await.expect("start");
    let failed = wait_for(&system, &case, &[CaseStatus::Failed]).await;
    assert_eq!(
        failed.failure_message(),
        Some("Screening failed after retries. Human intervention required.")
    );
    let rows = system.cases_by_status(CaseStatus::Failed);
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].failure_message,
        "Screening failed after retries. Human intervention required."
    );

    stub.set_behavior(
        crate::domain::types::StageKind::Screening,
        crate::decision::stub::StageBehavior::Succeed,
    );
    system.resume(&case).await.expect("resume");
    let recovered = wait_for(&system, &case, &[CaseStatus::AwaitingHumanApproval]).await;
    assert_eq!(recovered.failure_message(), None);

    system.shutdown().await;
}
