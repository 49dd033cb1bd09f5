//! CQRS query handler for the per-case view projection.
//!
//! The query hook runs after events are committed to the event log. It
//! applies them to the case's `CaseView`, publishes the updated snapshot on
//! the watch channel the engine driver waits on, and hands the snapshot to
//! the shared projector so the read-side tables stay current.

use super::CaseAggregate;
use crate::domain::view::CaseView;
use crate::projections::Projector;
use async_trait::async_trait;
use cqrs_es::Query;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Query handler that maintains the per-case view and feeds the projector.
pub struct CaseQuery {
    /// In-memory view of this case.
    projection: Arc<RwLock<CaseView>>,
    /// Watch channel for view snapshots (pause/resume wake-ups).
    snapshot_tx: watch::Sender<CaseView>,
    /// Shared read-side projector.
    projector: Arc<Projector>,
}

impl CaseQuery {
    pub fn new(
        projection: Arc<RwLock<CaseView>>,
        snapshot_tx: watch::Sender<CaseView>,
        projector: Arc<Projector>,
    ) -> Self {
        Self {
            projection,
            snapshot_tx,
            projector,
        }
    }
}

#[async_trait]
impl Query<CaseAggregate> for CaseQuery {
    async fn dispatch(&self, aggregate_id: &str, events: &[cqrs_es::EventEnvelope<CaseAggregate>]) {
        let mut view = self.projection.write().await;

        for event in events {
            view.apply_event(aggregate_id, &event.payload, event.sequence as u64);
        }

        self.projector.apply(&view);

        // Receivers may be gone while the case is idle; that is fine.
        let _ = self.snapshot_tx.send(view.clone());
    }
}

#[cfg(test)]
#[path = "../tests/query_tests.rs"]
mod tests;
