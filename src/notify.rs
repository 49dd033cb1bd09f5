//! Case notification fan-out.
//!
//! Every stage transition publishes a human-readable notification. The
//! notifier keeps an in-memory ordered log so late subscribers (or slow
//! ones that lag the broadcast channel) can backfill from a cursor
//! without losing or reordering messages.

use crate::domain::types::CaseNumber;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::info;

const CHANNEL_CAPACITY: usize = 256;

/// One published notification, stamped with a process-wide sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub seq: u64,
    pub case_number: CaseNumber,
    pub message: String,
}

/// Publishes notifications and hands out resumable subscriptions.
#[derive(Debug)]
pub struct Notifier {
    log: Arc<RwLock<Vec<Notification>>>,
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            log: Arc::new(RwLock::new(Vec::new())),
            tx,
        }
    }

    /// Publishes a notification, assigning the next sequence number.
    pub fn publish(&self, case_number: &CaseNumber, message: impl Into<String>) {
        let message = message.into();
        let mut log = self.log.write().unwrap();
        let notification = Notification {
            seq: log.len() as u64 + 1,
            case_number: case_number.clone(),
            message,
        };
        info!(case_number = %notification.case_number, seq = notification.seq,
              "{}", notification.message);
        log.push(notification.clone());
        let _ = self.tx.send(notification);
    }

    /// Subscribes to notifications published after this call.
    pub fn subscribe(&self) -> NotificationStream {
        // Hold the log lock while subscribing so no publish can slip
        // between the cursor read and the channel subscription.
        let log = self.log.read().unwrap();
        NotificationStream {
            rx: self.tx.subscribe(),
            log: Arc::clone(&self.log),
            last_seen: log.len() as u64,
            backlog: Vec::new(),
        }
    }

    /// Subscribes with replay of everything published after `cursor`
    /// (pass 0 for the full history).
    pub fn subscribe_from(&self, cursor: u64) -> NotificationStream {
        let log = self.log.read().unwrap();
        let backlog: Vec<Notification> = log
            .iter()
            .filter(|n| n.seq > cursor)
            .rev()
            .cloned()
            .collect();
        NotificationStream {
            rx: self.tx.subscribe(),
            log: Arc::clone(&self.log),
            last_seen: cursor,
            backlog,
        }
    }

    /// Notifications with `seq > cursor`, oldest first.
    pub fn replay_after(&self, cursor: u64) -> Vec<Notification> {
        self.log
            .read()
            .unwrap()
            .iter()
            .filter(|n| n.seq > cursor)
            .cloned()
            .collect()
    }
}

/// Ordered, gap-free notification subscription.
///
/// Duplicates (a backlogged entry also arriving over the channel) are
/// dropped by sequence; a lagged channel is repaired by refilling the
/// backlog from the notifier's log.
#[derive(Debug)]
pub struct NotificationStream {
    rx: broadcast::Receiver<Notification>,
    log: Arc<RwLock<Vec<Notification>>>,
    last_seen: u64,
    // Stored newest-first so recv can pop from the back.
    backlog: Vec<Notification>,
}

impl NotificationStream {
    /// Next notification in sequence order. Returns `None` once the
    /// notifier is dropped and the backlog is drained.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            if let Some(notification) = self.backlog.pop() {
                if notification.seq <= self.last_seen {
                    continue;
                }
                self.last_seen = notification.seq;
                return Some(notification);
            }
            match self.rx.recv().await {
                Ok(notification) => {
                    if notification.seq <= self.last_seen {
                        continue;
                    }
                    self.last_seen = notification.seq;
                    return Some(notification);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Slow consumer dropped off the channel; refill the
                    // gap from the ordered log and keep going.
                    let log = self.log.read().unwrap();
                    self.backlog = log
                        .iter()
                        .filter(|n| n.seq > self.last_seen)
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

    /// Sequence of the last notification returned.
    pub fn cursor(&self) -> u64 {
        self.last_seen
    }
}

#[cfg(test)]
#[path = "tests/notify_tests.rs"]
mod tests;
