//! Work-queue projection.
//!
//! One row per case with the operational fields a clerk's queue needs.
//! Besides the upsert table this projection keeps a sequence-stamped
//! delta log so stream consumers can resume from a cursor after a
//! disconnect without gaps or duplicates.

use crate::domain::CaseView;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// One queue row. Optional view fields flatten to defaults so the row
/// shape is total over every reachable view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRow {
    pub case_number: String,
    pub status: String,
    pub procedure_type: String,
    pub urgency: String,
    pub failure_message: String,
    pub audit_issues: String,
}

impl QueueRow {
    pub fn from_view(view: &CaseView) -> Option<Self> {
        let case_number = view.case_number()?.to_string();
        let status = view.status()?.as_str().to_string();
        let (procedure_type, urgency) = match view.screening() {
            Some(s) => (s.procedure_type.to_string(), s.urgency.to_string()),
            None => ("UNKNOWN".to_string(), "UNKNOWN".to_string()),
        };
        let audit_issues = view
            .audit()
            .filter(|a| !a.issues.is_empty())
            .map(|a| a.issues.join("; "))
            .unwrap_or_default();
        Some(Self {
            case_number,
            status,
            procedure_type,
            urgency,
            failure_message: view.failure_message().unwrap_or_default().to_string(),
            audit_issues,
        })
    }
}

/// A row change, stamped with the table-wide delta sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDelta {
    pub seq: u64,
    pub row: QueueRow,
}

/// Upsert table plus delta log for the queue projection.
#[derive(Debug)]
pub struct QueueTable {
    rows: RwLock<HashMap<String, QueueRow>>,
    deltas: Arc<RwLock<Vec<QueueDelta>>>,
    tx: broadcast::Sender<QueueDelta>,
}

impl Default for QueueTable {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueTable {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            rows: RwLock::new(HashMap::new()),
            deltas: Arc::new(RwLock::new(Vec::new())),
            tx,
        }
    }

    /// Inserts or replaces the case's row. An unchanged row produces no
    /// delta, so re-applying a snapshot is invisible to stream consumers.
    pub fn upsert(&self, row: QueueRow) {
        let mut rows = self.rows.write().unwrap();
        if rows.get(&row.case_number) == Some(&row) {
            return;
        }
        rows.insert(row.case_number.clone(), row.clone());
        // Delta log lock nests inside the row lock so deltas are stamped
        // in the same order the rows were applied.
        let mut deltas = self.deltas.write().unwrap();
        let delta = QueueDelta {
            seq: deltas.len() as u64 + 1,
            row,
        };
        deltas.push(delta.clone());
        let _ = self.tx.send(delta);
    }

    pub fn all(&self) -> Vec<QueueRow> {
        let mut rows: Vec<QueueRow> = self.rows.read().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.case_number.cmp(&b.case_number));
        rows
    }

    pub fn by_status(&self, status: &str) -> Vec<QueueRow> {
        let mut rows: Vec<QueueRow> = self
            .rows
            .read()
            .unwrap()
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.case_number.cmp(&b.case_number));
        rows
    }

    /// Live delta stream starting after the current log position.
    pub fn stream(&self) -> QueueStream {
        let deltas = self.deltas.read().unwrap();
        QueueStream {
            rx: self.tx.subscribe(),
            log: Arc::clone(&self.deltas),
            last_seen: deltas.len() as u64,
            backlog: Vec::new(),
        }
    }

    /// Delta stream resuming after `cursor` (0 replays everything).
    pub fn stream_from(&self, cursor: u64) -> QueueStream {
        let deltas = self.deltas.read().unwrap();
        let backlog = deltas
            .iter()
            .filter(|d| d.seq > cursor)
            .rev()
            .cloned()
            .collect();
        QueueStream {
            rx: self.tx.subscribe(),
            log: Arc::clone(&self.deltas),
            last_seen: cursor,
            backlog,
        }
    }
}

/// Ordered, gap-free queue delta subscription.
#[derive(Debug)]
pub struct QueueStream {
    rx: broadcast::Receiver<QueueDelta>,
    log: Arc<RwLock<Vec<QueueDelta>>>,
    last_seen: u64,
    // Newest-first so recv pops from the back.
    backlog: Vec<QueueDelta>,
}

impl QueueStream {
    /// Next delta in sequence order, or `None` once the table is gone
    /// and the backlog is drained.
    pub async fn recv(&mut self) -> Option<QueueDelta> {
        loop {
            if let Some(delta) = self.backlog.pop() {
                if delta.seq <= self.last_seen {
                    continue;
                }
                self.last_seen = delta.seq;
                return Some(delta);
            }
            match self.rx.recv().await {
                Ok(delta) => {
                    if delta.seq <= self.last_seen {
                        continue;
                    }
                    self.last_seen = delta.seq;
                    return Some(delta);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    let log = self.log.read().unwrap();
                    self.backlog = log
                        .iter()
                        .filter(|d| d.seq > self.last_seen)
                        .rev()
                        .cloned()
                        .collect();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    if self.backlog.is_empty() {
                        return None;
                    }
                }
            }
        }
    }

    /// Sequence of the last delta returned; feed to `stream_from` to resume.
    pub fn cursor(&self) -> u64 {
        self.last_seen
    }
}
