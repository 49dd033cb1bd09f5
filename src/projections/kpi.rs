//! KPI projection: document completeness and audit health per case.

use crate::domain::CaseView;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiRow {
    pub case_number: String,
    pub status: String,
    pub documents_complete: bool,
    pub audit_consistent: bool,
    pub audit_issue_count: usize,
}

impl KpiRow {
    pub fn from_view(view: &CaseView) -> Option<Self> {
        Some(Self {
            case_number: view.case_number()?.to_string(),
            status: view.status()?.as_str().to_string(),
            // No screening yet counts as incomplete, no audit as inconsistent.
            documents_complete: view.screening().is_some_and(|s| s.documents_complete),
            audit_consistent: view.audit().is_some_and(|a| a.consistent),
            audit_issue_count: view.audit().map(|a| a.issues.len()).unwrap_or(0),
        })
    }
}

#[derive(Debug, Default)]
pub struct KpiTable {
    rows: RwLock<HashMap<String, KpiRow>>,
}

impl KpiTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, row: KpiRow) {
        self.rows
            .write()
            .unwrap()
            .insert(row.case_number.clone(), row);
    }

    pub fn all(&self) -> Vec<KpiRow> {
        let mut rows: Vec<KpiRow> = self.rows.read().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.case_number.cmp(&b.case_number));
        rows
    }

    pub fn incomplete_documents(&self) -> Vec<KpiRow> {
        let mut rows: Vec<KpiRow> = self
            .rows
            .read()
            .unwrap()
            .values()
            .filter(|r| !r.documents_complete)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.case_number.cmp(&b.case_number));
        rows
    }

    pub fn failed_audits(&self) -> Vec<KpiRow> {
        let mut rows: Vec<KpiRow> = self
            .rows
            .read()
            .unwrap()
            .values()
            .filter(|r| !r.audit_consistent)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.case_number.cmp(&b.case_number));
        rows
    }
}
