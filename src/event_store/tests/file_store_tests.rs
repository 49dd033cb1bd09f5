//! Tests for the JSONL event store: persistence, rehydration, optimistic
//! concurrency, and snapshots.

use crate::domain::types::TimestampUtc;
use crate::domain::{CaseAggregate, CaseEvent, CaseState};
use crate::event_store::FileEventStore;
use cqrs_es::{Aggregate, AggregateContext, AggregateError, EventStore};
use std::collections::HashMap;
use std::path::Path;

const CASE: &str = "CASE-ES-1";

fn store_in(dir: &Path) -> FileEventStore {
    FileEventStore::new(
        dir.join("events.jsonl"),
        dir.join("snapshot.json"),
        0, // snapshots off unless a test opts in
    )
}

fn started_event() -> CaseEvent {
    CaseEvent::CaseStarted {
        started_at: TimestampUtc::now(),
    }
}

fn failed_event(message: &str) -> CaseEvent {
    CaseEvent::CaseFailed {
        message: message.to_string(),
        failed_at: TimestampUtc::now(),
    }
}

#[tokio::test]
async fn commit_then_reload_rehydrates_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    let context = store.load_aggregate(CASE).await.unwrap();
    store
        .commit(vec![started_event()], context, HashMap::new())
        .await
        .unwrap();

    let context = store.load_aggregate(CASE).await.unwrap();
    store
        .commit(
            vec![failed_event("operator abort")],
            context,
            HashMap::new(),
        )
        .await
        .unwrap();

    let events = store.load_events(CASE).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].sequence, 1);
    assert_eq!(events[1].sequence, 2);

    let rehydrated = store.load_aggregate(CASE).await.unwrap();
    match &rehydrated.aggregate().state {
        CaseState::Active(data) => {
            assert_eq!(data.failure_message(), Some("operator abort"));
        }
        CaseState::Uninitialized => panic!("aggregate not rehydrated"),
    }
}

#[tokio::test]
async fn missing_log_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    assert!(store.load_events(CASE).await.unwrap().is_empty());
    let context = store.load_aggregate(CASE).await.unwrap();
    assert!(matches!(
        context.aggregate().state,
        CaseState::Uninitialized
    ));
}

#[tokio::test]
async fn stale_context_commit_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    let fresh = store.load_aggregate(CASE).await.unwrap();
    let stale = store.load_aggregate(CASE).await.unwrap();

    store
        .commit(vec![started_event()], fresh, HashMap::new())
        .await
        .unwrap();

    let err = store
        .commit(vec![started_event()], stale, HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AggregateError::AggregateConflict));

    // The conflicting commit left no trace in the log.
    assert_eq!(store.load_events(CASE).await.unwrap().len(), 1);
}

#[tokio::test]
async fn snapshot_written_at_configured_interval() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileEventStore::new(
        dir.path().join("events.jsonl"),
        dir.path().join("snapshot.json"),
        2,
    );

    let context = store.load_aggregate(CASE).await.unwrap();
    store
        .commit(vec![started_event()], context, HashMap::new())
        .await
        .unwrap();
    assert!(!dir.path().join("snapshot.json").exists());

    let context = store.load_aggregate(CASE).await.unwrap();
    store
        .commit(
            vec![failed_event("first failure")],
            context,
            HashMap::new(),
        )
        .await
        .unwrap();
    assert!(dir.path().join("snapshot.json").exists());

    // Loading from snapshot plus tail gives the same state.
    let rehydrated = store.load_aggregate(CASE).await.unwrap();
    match &rehydrated.aggregate().state {
        CaseState::Active(data) => {
            assert_eq!(data.failure_message(), Some("first failure"));
        }
        CaseState::Uninitialized => panic!("aggregate not rehydrated"),
    }
}

#[tokio::test]
async fn empty_commit_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    let context = store.load_aggregate(CASE).await.unwrap();
    let envelopes = store.commit(vec![], context, HashMap::new()).await.unwrap();
    assert!(envelopes.is_empty());
    assert!(!dir.path().join("events.jsonl").exists());
}

#[tokio::test]
async fn corrupted_log_line_is_a_deserialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    let context = store.load_aggregate(CASE).await.unwrap();
    store
        .commit(vec![started_event()], context, HashMap::new())
        .await
        .unwrap();

    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(dir.path().join("events.jsonl"))
        .unwrap();
    writeln!(file, "not json").unwrap();

    let err = store.load_events(CASE).await.unwrap_err();
    assert!(matches!(err, AggregateError::DeserializationError(_)));
}

#[tokio::test]
async fn events_of_other_aggregates_are_filtered_out() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());

    let context = store.load_aggregate(CASE).await.unwrap();
    store
        .commit(vec![started_event()], context, HashMap::new())
        .await
        .unwrap();

    let other = store.load_aggregate("CASE-ES-OTHER").await.unwrap();
    store
        .commit(vec![started_event()], other, HashMap::new())
        .await
        .unwrap();

    let events = store.load_events(CASE).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].aggregate_id, CASE);

    let mut agg = CaseAggregate::default();
    for event in events {
        agg.apply(event.payload);
    }
    assert!(matches!(agg.state, CaseState::Active(_)));
}
