//! Strongly typed domain primitives for the case aggregate.
//!
//! These types mirror the contracts of the external decision operations
//! (screening, secretariat, audit, drafting) and the fixed case status
//! taxonomy. They are used throughout the domain model and projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Court case number. Uniquely identifies a case and doubles as the
/// aggregate_id in the event store and the actor routing key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseNumber(pub String);

impl CaseNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CaseNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CaseNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for CaseNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discrete state-machine value for a case.
///
/// Serialized names match the wire form used by the projection tables
/// (`RECEIVED`, `AWAITING_HUMAN_APPROVAL`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Received,
    Screening,
    ScreeningComplete,
    SecretariatProcessing,
    SecretariatComplete,
    Auditing,
    AuditPassed,
    AuditFailed,
    Drafting,
    DraftReady,
    AwaitingHumanApproval,
    Approved,
    Rejected,
    Published,
    Failed,
}

impl CaseStatus {
    /// Wire name of the status, as stored in projection rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Screening => "SCREENING",
            Self::ScreeningComplete => "SCREENING_COMPLETE",
            Self::SecretariatProcessing => "SECRETARIAT_PROCESSING",
            Self::SecretariatComplete => "SECRETARIAT_COMPLETE",
            Self::Auditing => "AUDITING",
            Self::AuditPassed => "AUDIT_PASSED",
            Self::AuditFailed => "AUDIT_FAILED",
            Self::Drafting => "DRAFTING",
            Self::DraftReady => "DRAFT_READY",
            Self::AwaitingHumanApproval => "AWAITING_HUMAN_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Published => "PUBLISHED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(Self::Received),
            "SCREENING" => Ok(Self::Screening),
            "SCREENING_COMPLETE" => Ok(Self::ScreeningComplete),
            "SECRETARIAT_PROCESSING" => Ok(Self::SecretariatProcessing),
            "SECRETARIAT_COMPLETE" => Ok(Self::SecretariatComplete),
            "AUDITING" => Ok(Self::Auditing),
            "AUDIT_PASSED" => Ok(Self::AuditPassed),
            "AUDIT_FAILED" => Ok(Self::AuditFailed),
            "DRAFTING" => Ok(Self::Drafting),
            "DRAFT_READY" => Ok(Self::DraftReady),
            "AWAITING_HUMAN_APPROVAL" => Ok(Self::AwaitingHumanApproval),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "PUBLISHED" => Ok(Self::Published),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown case status: {}", other)),
        }
    }
}

/// One of the four externally executed processing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Screening,
    Secretariat,
    Audit,
    Drafting,
}

impl StageKind {
    /// Human-readable stage label used in failure messages and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Screening => "Screening",
            Self::Secretariat => "Secretariat processing",
            Self::Audit => "Consistency audit",
            Self::Drafting => "Draft generation",
        }
    }

    /// In-progress status entered while this stage's decision operation
    /// is outstanding.
    pub fn in_progress_status(&self) -> CaseStatus {
        match self {
            Self::Screening => CaseStatus::Screening,
            Self::Secretariat => CaseStatus::SecretariatProcessing,
            Self::Audit => CaseStatus::Auditing,
            Self::Drafting => CaseStatus::Drafting,
        }
    }
}

/// Procedure classification produced by the screening stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcedureType {
    Ordinary,
    Summary,
    FastTrack,
}

impl ProcedureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ordinary => "ORDINARY",
            Self::Summary => "SUMMARY",
            Self::FastTrack => "FAST_TRACK",
        }
    }
}

impl std::fmt::Display for ProcedureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Urgency classification produced by the screening stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Urgent,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of the screening stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub procedure_type: ProcedureType,
    pub urgency: Urgency,
    pub documents_complete: bool,
    pub missing_documents: Vec<String>,
}

/// Output of the secretariat routing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretariatResult {
    pub generated_acts: Vec<String>,
}

/// Output of the consistency audit stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    pub consistent: bool,
    pub issues: Vec<String>,
}

/// Output of the drafting (or draft revision) stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftResult {
    pub content: String,
    pub citations: Vec<String>,
}

/// UTC timestamp wrapper used on all events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampUtc(pub DateTime<Utc>);

impl TimestampUtc {
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for TimestampUtc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
