use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::atomic::{read_json_opt, write_json_atomic};
use crate::config::MAX_STATUS_ERRORS;

/// Outcome of the most recent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunResult {
    pub success: bool,
    pub timestamp: String,
    pub boards_fetched: usize,
    pub event_ids_fixed: usize,
    pub errors: usize,
}

/// Counts from the last consistency report (full updates only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationSummary {
    pub hand_issues: usize,
    pub orphan_results: usize,
    pub events_missing_rankings: usize,
}

/// `pipeline_status.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineStatus {
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub last_success: Option<String>,
    #[serde(default)]
    pub last_full_update: Option<String>,
    #[serde(default)]
    pub total_runs: u64,
    #[serde(default)]
    pub total_boards_fetched: u64,
    #[serde(default)]
    pub last_errors: Vec<String>,
    /// Boards still missing after the last run, per event id.
    #[serde(default)]
    pub unfetched: BTreeMap<String, Vec<u32>>,
    #[serde(default)]
    pub last_attempts: u32,
    #[serde(default)]
    pub last_mode: Option<String>,
    #[serde(default)]
    pub last_result: Option<RunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validation: Option<ValidationSummary>,
}

impl PipelineStatus {
    /// Append errors, keeping only the most recent ones.
    pub fn push_errors<I: IntoIterator<Item = String>>(&mut self, errors: I) {
        self.last_errors.extend(errors);
        let excess = self.last_errors.len().saturating_sub(MAX_STATUS_ERRORS);
        self.last_errors.drain(..excess);
    }

    pub fn unfetched_count(&self) -> usize {
        self.unfetched.values().map(Vec::len).sum()
    }
}

/// Reads and writes the status journal.
pub struct StatusJournal {
    path: PathBuf,
}

impl StatusJournal {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<PipelineStatus> {
        Ok(read_json_opt(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, status: &PipelineStatus) -> Result<()> {
        write_json_atomic(&self.path, status)
    }
}
