//! Durable event storage for case aggregates.
//!
//! Events are written to a JSONL log (one JSON object per line) and fsynced
//! before the engine takes the next step, which is what makes transitions
//! durable: on restart the aggregate is rebuilt from the last committed
//! state and any interrupted stage is re-executed.

mod file_store;

pub use file_store::{FileEventStore, StoredEvent, StoredSnapshot};
