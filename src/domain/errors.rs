//! Error types for the case workflow domain.

use crate::domain::types::CaseStatus;
use std::fmt::{Display, Formatter};

/// Errors that can occur during case command handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseError {
    /// Command addressed to a case that has not been started.
    NotStarted,
    /// Start issued for a case that already exists.
    AlreadyStarted,
    /// Command guard not met for the current status.
    InvalidTransition {
        command: &'static str,
        expected: &'static str,
        actual: CaseStatus,
    },
    /// Storage/persistence failure.
    StorageFailure { message: String },
    /// Optimistic lock failure (concurrent modification detected).
    ConcurrencyConflict { message: String },
}

impl Display for CaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "case not started"),
            Self::AlreadyStarted => write!(f, "case already started"),
            Self::InvalidTransition {
                command,
                expected,
                actual,
            } => write!(
                f,
                "command '{}' requires status {}, current status: {}",
                command, expected, actual
            ),
            Self::StorageFailure { message } => write!(f, "storage failure: {}", message),
            Self::ConcurrencyConflict { message } => {
                write!(f, "concurrency conflict: {}", message)
            }
        }
    }
}

impl std::error::Error for CaseError {}
