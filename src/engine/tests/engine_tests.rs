//! Driver-loop tests: autonomous progress, pauses, retries, failover,
//! and the human commands that wake a paused case.

use crate::config::EngineConfig;
use crate::decision::stub::{StageBehavior, StubDecisionService};
use crate::decision::DecisionService;
use crate::domain::types::{CaseNumber, CaseStatus, StageKind};
use crate::domain::{create_actor_args, execute_command, CaseActor, CaseCommand, CaseView};
use crate::engine::CaseEngine;
use crate::gateway::await_status;
use crate::notify::Notifier;
use crate::projections::Projector;
use ractor::{Actor, ActorRef};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

struct Harness {
    case_number: CaseNumber,
    actor: ActorRef<crate::domain::CaseMessage>,
    actor_join: tokio::task::JoinHandle<()>,
    engine: tokio::task::JoinHandle<()>,
    view_rx: watch::Receiver<CaseView>,
    notifier: Arc<Notifier>,
    stub: Arc<StubDecisionService>,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn spawn(stub: StubDecisionService) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            step_timeout_secs: 5,
            ..EngineConfig::new(dir.path())
        };
        let case_number = CaseNumber::from("CASE-E-1");
        let projector = Arc::new(Projector::new());
        let (args, view_rx) = create_actor_args(&case_number, &config, projector);

        let name = format!("case-{}-{}", uuid::Uuid::new_v4(), case_number);
        let (actor, join) = Actor::spawn(Some(name.clone()), CaseActor, args)
            .await
            .unwrap();

        let stub = Arc::new(stub);
        let service: Arc<dyn DecisionService> = stub.clone();
        let notifier = Arc::new(Notifier::new());
        let engine = CaseEngine::new(
            case_number.clone(),
            name,
            view_rx.clone(),
            service,
            notifier.clone(),
            &config,
        )
        .spawn();

        let harness = Self {
            case_number,
            actor,
            actor_join: tokio::spawn(async move {
                let _ = join.await;
            }),
            engine,
            view_rx,
            notifier,
            stub,
            _dir: dir,
        };
        execute_command(&harness.actor, CaseCommand::Start)
            .await
            .unwrap();
        harness
    }

    async fn wait_for(&mut self, statuses: &[CaseStatus]) -> CaseView {
        timeout(WAIT, await_status(&mut self.view_rx, statuses))
            .await
            .expect("timed out waiting for status")
            .expect("view channel closed")
    }

    async fn teardown(self) {
        self.engine.abort();
        self.actor.stop(None);
        let _ = self.actor_join.await;
    }
}

#[tokio::test]
async fn happy_path_runs_to_approval_then_publish() {
    let mut harness = Harness::spawn(StubDecisionService::new()).await;
    let mut updates = harness.notifier.subscribe_from(0);

    let paused = harness
        .wait_for(&[CaseStatus::AwaitingHumanApproval])
        .await;
    assert!(paused.screening().is_some());
    assert!(paused.secretariat().is_some());
    assert!(paused.audit().unwrap().consistent);
    assert_eq!(paused.draft().unwrap().citations.len(), 3);

    execute_command(&harness.actor, CaseCommand::Approve)
        .await
        .unwrap();
    let published = harness.wait_for(&[CaseStatus::Published]).await;
    assert_eq!(published.status(), Some(CaseStatus::Published));

    // Notifications arrive as ordered start/complete pairs.
    let expected = [
        "Screening started for case CASE-E-1",
        "Screening completed: ORDINARY, urgency MEDIUM",
        "Secretariat processing started",
        "Secretariat completed: 2 acts generated",
        "Consistency audit started",
        "Audit passed: no issues found",
        "Draft generation started",
        "Draft ready with 3 citations",
        "Awaiting human approval",
        "Case approved and published",
    ];
    for wanted in expected {
        let got = timeout(WAIT, updates.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("notifier closed");
        assert_eq!(got.message, wanted);
    }

    harness.teardown().await;
}

#[tokio::test]
async fn inconsistent_audit_pauses_until_overridden() {
    let stub = StubDecisionService::new()
        .with_audit_issues(&["Claimed value does not match documents", "Dates contradict"]);
    let mut harness = Harness::spawn(stub).await;
    let mut updates = harness.notifier.subscribe_from(0);

    let paused = harness.wait_for(&[CaseStatus::AuditFailed]).await;
    assert_eq!(paused.audit().unwrap().issues.len(), 2);
    assert!(paused.draft().is_none());

    execute_command(&harness.actor, CaseCommand::ContinueFromAudit)
        .await
        .unwrap();
    let approval = harness
        .wait_for(&[CaseStatus::AwaitingHumanApproval])
        .await;
    // Drafting saw the recorded audit, not an empty context.
    assert!(approval
        .draft()
        .unwrap()
        .content
        .contains("Audit passed. No issues found."));

    let mut saw_audit_failure = false;
    while let Ok(Some(notification)) = timeout(Duration::from_millis(200), updates.recv()).await {
        if notification.message == "Audit failed: 2 issues found - human intervention required" {
            saw_audit_failure = true;
        }
        if notification.message == "Awaiting human approval" {
            break;
        }
    }
    assert!(saw_audit_failure);

    harness.teardown().await;
}

#[tokio::test]
async fn exhausted_stage_fails_case_and_resume_restarts_pipeline() {
    let stub = StubDecisionService::new();
    stub.set_behavior(StageKind::Screening, StageBehavior::AlwaysFail);
    let mut harness = Harness::spawn(stub).await;
    let mut updates = harness.notifier.subscribe_from(0);

    let failed = harness.wait_for(&[CaseStatus::Failed]).await;
    assert_eq!(
        failed.failure_message(),
        Some("Screening failed after retries. Human intervention required.")
    );
    let started = timeout(WAIT, updates.recv())
        .await
        .expect("timed out")
        .expect("notifier closed");
    assert_eq!(started.message, "Screening started for case CASE-E-1");
    let failure_note = timeout(WAIT, updates.recv())
        .await
        .expect("timed out")
        .expect("notifier closed");
    assert_eq!(failure_note.message, "Workflow failed during: Screening");

    // Fix the stage and resume; the pipeline restarts from screening.
    harness
        .stub
        .set_behavior(StageKind::Screening, StageBehavior::Succeed);
    execute_command(&harness.actor, CaseCommand::Resume)
        .await
        .unwrap();

    let recovered = harness
        .wait_for(&[CaseStatus::AwaitingHumanApproval])
        .await;
    assert_eq!(recovered.failure_message(), None);
    assert!(recovered.screening().is_some());

    harness.teardown().await;
}

#[tokio::test]
async fn rejection_triggers_revision_with_the_reason_in_context() {
    let mut harness = Harness::spawn(StubDecisionService::new()).await;

    harness
        .wait_for(&[CaseStatus::AwaitingHumanApproval])
        .await;
    execute_command(
        &harness.actor,
        CaseCommand::Reject {
            reason: "Cite the insurance norm".into(),
        },
    )
    .await
    .unwrap();

    let revised = harness
        .wait_for(&[CaseStatus::AwaitingHumanApproval])
        .await;
    let content = &revised.draft().unwrap().content;
    assert!(content.contains("Previous draft was rejected"));
    assert!(content.contains("Reason: Cite the insurance norm"));

    execute_command(&harness.actor, CaseCommand::Approve)
        .await
        .unwrap();
    let published = harness.wait_for(&[CaseStatus::Published]).await;
    assert!(published
        .draft()
        .unwrap()
        .content
        .contains("Previous draft was rejected"));

    harness.teardown().await;
}
