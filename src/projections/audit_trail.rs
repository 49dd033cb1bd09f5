//! Audit-trail projection: which stages have produced results per case.

use crate::domain::CaseView;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrailRow {
    pub case_number: String,
    pub status: String,
    pub has_screening: bool,
    pub has_secretariat: bool,
    pub has_audit: bool,
    pub has_draft: bool,
    pub citation_count: usize,
}

impl AuditTrailRow {
    pub fn from_view(view: &CaseView) -> Option<Self> {
        Some(Self {
            case_number: view.case_number()?.to_string(),
            status: view.status()?.as_str().to_string(),
            has_screening: view.screening().is_some(),
            has_secretariat: view.secretariat().is_some(),
            has_audit: view.audit().is_some(),
            has_draft: view.draft().is_some(),
            citation_count: view.draft().map(|d| d.citations.len()).unwrap_or(0),
        })
    }
}

#[derive(Debug, Default)]
pub struct AuditTrailTable {
    rows: RwLock<HashMap<String, AuditTrailRow>>,
}

impl AuditTrailTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, row: AuditTrailRow) {
        self.rows
            .write()
            .unwrap()
            .insert(row.case_number.clone(), row);
    }

    pub fn all(&self) -> Vec<AuditTrailRow> {
        let mut rows: Vec<AuditTrailRow> = self.rows.read().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.case_number.cmp(&b.case_number));
        rows
    }

    pub fn by_case_number(&self, case_number: &str) -> Option<AuditTrailRow> {
        self.rows.read().unwrap().get(case_number).cloned()
    }
}
