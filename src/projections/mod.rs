//! Materialized views over committed case snapshots.
//!
//! The per-case query hook hands every committed `CaseView` snapshot to
//! the shared [`Projector`], which upserts one row per case into each
//! table. Per-case ordering is guaranteed by the single-writer case
//! actor; cross-case ordering is unconstrained. Re-delivery of a
//! snapshot is harmless: upserting an identical row changes nothing.

pub mod audit_trail;
pub mod kpi;
pub mod queue;

pub use audit_trail::{AuditTrailRow, AuditTrailTable};
pub use kpi::{KpiRow, KpiTable};
pub use queue::{QueueDelta, QueueRow, QueueStream, QueueTable};

use crate::domain::CaseView;

/// Holds the three projection tables and routes snapshots into them.
#[derive(Debug, Default)]
pub struct Projector {
    queue: QueueTable,
    audit_trail: AuditTrailTable,
    kpi: KpiTable,
}

impl Projector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts the snapshot into all three tables. Views without a case
    /// number or status (nothing committed yet) are skipped.
    pub fn apply(&self, view: &CaseView) {
        if let Some(row) = QueueRow::from_view(view) {
            self.queue.upsert(row);
        }
        if let Some(row) = AuditTrailRow::from_view(view) {
            self.audit_trail.upsert(row);
        }
        if let Some(row) = KpiRow::from_view(view) {
            self.kpi.upsert(row);
        }
    }

    pub fn queue(&self) -> &QueueTable {
        &self.queue
    }

    pub fn audit_trail(&self) -> &AuditTrailTable {
        &self.audit_trail
    }

    pub fn kpi(&self) -> &KpiTable {
        &self.kpi
    }
}

#[cfg(test)]
#[path = "tests/projections_tests.rs"]
mod tests;
