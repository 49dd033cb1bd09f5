//! Engine configuration.
//!
//! Loaded from a YAML file or built programmatically. Every knob has a
//! default matching the production pipeline: a three minute step timeout
//! and two retries after the first attempt.

use crate::domain::types::CaseNumber;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding per-case event logs and snapshots.
    pub data_dir: PathBuf,
    /// Timeout for one attempt of one stage's decision operation, seconds.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    /// Additional attempts after the first one fails or times out.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Snapshot the aggregate after every N events (0 = disabled).
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u64,
}

fn default_step_timeout_secs() -> u64 {
    180
}

fn default_max_retries() -> u32 {
    2
}

fn default_snapshot_every() -> u64 {
    50
}

impl EngineConfig {
    /// Creates a config with default knobs rooted at the given data dir.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            step_timeout_secs: default_step_timeout_secs(),
            max_retries: default_max_retries(),
            snapshot_every: default_snapshot_every(),
        }
    }

    /// Loads a config from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Timeout for one stage attempt.
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    /// Path of a case's JSONL event log.
    pub fn case_log_path(&self, case_number: &CaseNumber) -> PathBuf {
        self.case_dir(case_number).join("events.jsonl")
    }

    /// Path of a case's aggregate snapshot.
    pub fn case_snapshot_path(&self, case_number: &CaseNumber) -> PathBuf {
        self.case_dir(case_number).join("snapshot.json")
    }

    fn case_dir(&self, case_number: &CaseNumber) -> PathBuf {
        // Case numbers come from the court system and may contain path
        // separators; flatten them so every case maps to one directory.
        let safe: String = case_number
            .as_str()
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.data_dir.join("cases").join(safe)
    }
}
