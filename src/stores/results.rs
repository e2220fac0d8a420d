use anyhow::Result;
use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::atomic::{read_json_opt, write_json_atomic};
use crate::domain::{BoardKey, BoardResult, EventDate, EventId};

/// Per-event summary shown by the viewer next to the board tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<EventDate>,
    #[serde(default)]
    pub ns_pairs: u32,
    #[serde(default)]
    pub ew_pairs: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResultDocument {
    #[serde(default)]
    boards: BTreeMap<String, BoardResult>,
    #[serde(default)]
    events: BTreeMap<String, EventSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

/// `board_results.json`: one ranked table per `(event_id, board)`.
pub struct ResultStore {
    path: PathBuf,
    document: ResultDocument,
    dirty: bool,
}

impl ResultStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let document: ResultDocument = read_json_opt(&path)?.unwrap_or_default();
        info!(
            "Loaded {} board results for {} events from {}",
            document.boards.len(),
            document.events.len(),
            path.display()
        );
        Ok(Self {
            path,
            document,
            dirty: false,
        })
    }

    pub fn len(&self) -> usize {
        self.document.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.boards.is_empty()
    }

    pub fn get(&self, key: &BoardKey) -> Option<&BoardResult> {
        self.document.boards.get(&key.store_key())
    }

    /// True when the board has a table with at least one row.
    pub fn has_rows(&self, key: &BoardKey) -> bool {
        self.get(key).is_some_and(|r| !r.is_empty())
    }

    /// Replace the table for the board wholesale.
    pub fn put(&mut self, result: BoardResult) {
        let key = BoardKey::new(result.event_id.clone(), result.board).store_key();
        if self.document.boards.get(&key) == Some(&result) {
            return;
        }
        self.document.boards.insert(key, result);
        self.dirty = true;
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoardKey, &BoardResult)> {
        self.document
            .boards
            .iter()
            .filter_map(|(k, v)| BoardKey::parse_store_key(k).map(|key| (key, v)))
    }

    /// Re-sort and re-rank every table; returns how many changed.
    pub fn rerank_all(&mut self) -> usize {
        let mut changed = 0;
        for result in self.document.boards.values_mut() {
            let before = result.clone();
            result.rank();
            if *result != before {
                changed += 1;
            }
        }
        if changed > 0 {
            self.dirty = true;
        }
        changed
    }

    pub fn event_summary(&self, event_id: &EventId) -> Option<&EventSummary> {
        self.document.events.get(event_id.as_str())
    }

    pub fn set_event_summary(&mut self, event_id: &EventId, summary: EventSummary) {
        if self.document.events.get(event_id.as_str()) == Some(&summary) {
            return;
        }
        self.document.events.insert(event_id.to_string(), summary);
        self.dirty = true;
    }

    /// Stored board numbers per event.
    pub fn boards_by_event(&self) -> BTreeMap<EventId, Vec<u32>> {
        let mut boards: BTreeMap<EventId, Vec<u32>> = BTreeMap::new();
        for (key, _) in self.iter() {
            boards.entry(key.event_id).or_default().push(key.board);
        }
        for list in boards.values_mut() {
            list.sort_unstable();
        }
        boards
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the store if anything changed; `updated_at` moves only then.
    pub fn save(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.document.updated_at = Some(Local::now().to_rfc3339());
        write_json_atomic(&self.path, &self.document)?;
        self.dirty = false;
        info!("Saved {} board results to {}", self.document.boards.len(), self.path.display());
        Ok(true)
    }
}
