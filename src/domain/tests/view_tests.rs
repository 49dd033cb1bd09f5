//! Unit tests for CaseView event application.

use crate::domain::types::{
    AuditResult, CaseStatus, DraftResult, ProcedureType, ScreeningResult, SecretariatResult,
    StageKind, TimestampUtc, Urgency,
};
use crate::domain::{CaseEvent, CaseView};

const CASE: &str = "CASE-2024-0001";

fn now() -> TimestampUtc {
    TimestampUtc::now()
}

fn view_after(events: &[CaseEvent]) -> CaseView {
    let mut view = CaseView::default();
    for (i, event) in events.iter().enumerate() {
        view.apply_event(CASE, event, i as u64 + 1);
    }
    view
}

#[test]
fn default_view_is_not_started() {
    let view = CaseView::default();
    assert!(!view.is_started());
    assert_eq!(view.status(), None);
    assert_eq!(view.last_event_sequence(), 0);
}

#[test]
fn case_started_initializes_view() {
    let view = view_after(&[CaseEvent::CaseStarted { started_at: now() }]);
    assert!(view.is_started());
    assert_eq!(view.case_number().unwrap().as_str(), CASE);
    assert_eq!(view.status(), Some(CaseStatus::Received));
    assert_eq!(view.last_event_sequence(), 1);
}

#[test]
fn stage_results_accumulate() {
    let screening = ScreeningResult {
        procedure_type: ProcedureType::FastTrack,
        urgency: Urgency::Urgent,
        documents_complete: false,
        missing_documents: vec!["insurance_policy.pdf".into()],
    };
    let secretariat = SecretariatResult {
        generated_acts: vec!["Deadline notification".into()],
    };
    let view = view_after(&[
        CaseEvent::CaseStarted { started_at: now() },
        CaseEvent::StageStarted {
            stage: StageKind::Screening,
            started_at: now(),
        },
        CaseEvent::ScreeningRecorded {
            result: screening.clone(),
            recorded_at: now(),
        },
        CaseEvent::StageStarted {
            stage: StageKind::Secretariat,
            started_at: now(),
        },
        CaseEvent::SecretariatRecorded {
            result: secretariat.clone(),
            recorded_at: now(),
        },
    ]);

    assert_eq!(view.status(), Some(CaseStatus::SecretariatComplete));
    assert_eq!(view.screening(), Some(&screening));
    assert_eq!(view.secretariat(), Some(&secretariat));
    assert_eq!(view.last_event_sequence(), 5);
}

#[test]
fn draft_then_approval_request_pauses_for_human() {
    let draft = DraftResult {
        content: "Draft".into(),
        citations: vec!["Civil Code Art. 927".into(), "STJ-331/2024".into()],
    };
    let view = view_after(&[
        CaseEvent::CaseStarted { started_at: now() },
        CaseEvent::DraftRecorded {
            result: draft.clone(),
            recorded_at: now(),
        },
        CaseEvent::ApprovalRequested { requested_at: now() },
    ]);
    assert_eq!(view.status(), Some(CaseStatus::AwaitingHumanApproval));
    assert_eq!(view.draft(), Some(&draft));
}

#[test]
fn rejection_keeps_previous_draft_and_records_reason() {
    let view = view_after(&[
        CaseEvent::CaseStarted { started_at: now() },
        CaseEvent::DraftRecorded {
            result: DraftResult {
                content: "v1".into(),
                citations: vec![],
            },
            recorded_at: now(),
        },
        CaseEvent::ApprovalRequested { requested_at: now() },
        CaseEvent::CaseRejected {
            reason: "Too terse".into(),
            rejected_at: now(),
        },
    ]);
    assert_eq!(view.status(), Some(CaseStatus::Rejected));
    assert_eq!(view.rejection_reason(), Some("Too terse"));
    assert_eq!(view.draft().unwrap().content, "v1");
}

#[test]
fn failure_and_resume_round_trip() {
    let failed = view_after(&[
        CaseEvent::CaseStarted { started_at: now() },
        CaseEvent::CaseFailed {
            message: "Screening failed after retries. Human intervention required.".into(),
            failed_at: now(),
        },
    ]);
    assert_eq!(failed.status(), Some(CaseStatus::Failed));
    assert!(failed.failure_message().unwrap().starts_with("Screening"));

    let resumed = view_after(&[
        CaseEvent::CaseStarted { started_at: now() },
        CaseEvent::CaseFailed {
            message: "boom".into(),
            failed_at: now(),
        },
        CaseEvent::CaseResumed { resumed_at: now() },
    ]);
    assert_eq!(resumed.status(), Some(CaseStatus::Received));
    assert_eq!(resumed.failure_message(), None);
}

#[test]
fn resume_clears_stale_rejection_reason() {
    // Rejected, then failed during revision, then resumed: the new cycle
    // starts clean, so drafting interrupted mid-cycle is not a revision.
    let view = view_after(&[
        CaseEvent::CaseStarted { started_at: now() },
        CaseEvent::CaseRejected {
            reason: "Too terse".into(),
            rejected_at: now(),
        },
        CaseEvent::CaseFailed {
            message: "Draft revision failed after retries. Human intervention required.".into(),
            failed_at: now(),
        },
        CaseEvent::CaseResumed { resumed_at: now() },
        CaseEvent::StageStarted {
            stage: StageKind::Drafting,
            started_at: now(),
        },
    ]);
    assert_eq!(view.status(), Some(CaseStatus::Drafting));
    assert_eq!(view.rejection_reason(), None);
}

#[test]
fn audit_override_keeps_inconsistent_result() {
    let audit = AuditResult {
        consistent: false,
        issues: vec!["Dates contradict".into()],
    };
    let view = view_after(&[
        CaseEvent::CaseStarted { started_at: now() },
        CaseEvent::AuditFailed {
            result: audit.clone(),
            recorded_at: now(),
        },
        CaseEvent::AuditOverridden {
            overridden_at: now(),
        },
    ]);
    assert_eq!(view.status(), Some(CaseStatus::AuditPassed));
    assert_eq!(view.audit(), Some(&audit));
}
