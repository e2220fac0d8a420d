use anyhow::Result;
use chrono::Local;
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

use super::atomic::{read_json_opt, write_json_atomic};
use crate::domain::{Direction, EventDate, EventId, Standing, event::lenient_date};

const INDEX_VERSION: &str = "2.0";

/// Entry of the authoritative event table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEvent {
    pub id: EventId,
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "lenient_date")]
    pub date: Option<EventDate>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexDocument {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    events: IndexMap<String, IndexedEvent>,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    legacy_records: Vec<Map<String, Value>>,
}

fn default_version() -> String {
    INDEX_VERSION.to_string()
}

impl Default for IndexDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            last_updated: None,
            events: IndexMap::new(),
            metadata: json!({"total_tournaments": 0}),
            legacy_records: Vec::new(),
        }
    }
}

/// Older files are a bare array of legacy rows.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredIndex {
    Document(IndexDocument),
    Legacy(Vec<Map<String, Value>>),
}

/// `database.json`: the authoritative event table plus legacy standings rows.
pub struct TournamentIndex {
    path: PathBuf,
    document: IndexDocument,
    dirty: bool,
}

impl TournamentIndex {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (document, dirty) = match read_json_opt::<StoredIndex>(&path)? {
            Some(StoredIndex::Document(document)) => (document, false),
            Some(StoredIndex::Legacy(rows)) => {
                warn!("{} is in the legacy list format; upgrading", path.display());
                let document = IndexDocument {
                    legacy_records: rows,
                    ..IndexDocument::default()
                };
                (document, true)
            }
            None => (IndexDocument::default(), false),
        };
        info!(
            "Loaded {} indexed events and {} legacy records from {}",
            document.events.len(),
            document.legacy_records.len(),
            path.display()
        );
        Ok(Self { path, document, dirty })
    }

    /// Events in document order.
    pub fn events(&self) -> impl Iterator<Item = &IndexedEvent> {
        self.document.events.values()
    }

    pub fn event(&self, event_id: &EventId) -> Option<&IndexedEvent> {
        self.document.events.get(&event_id.index_key())
    }

    pub fn legacy_records(&self) -> &[Map<String, Value>] {
        &self.document.legacy_records
    }

    /// Register a fetched event under `event_<id>`. Standings become legacy
    /// rows (`Sıra, Tarih, Oyuncu 1, Oyuncu 2, Skor, Direction, Turnuva,
    /// Link`) unless an identical row already exists.
    pub fn record_event(
        &mut self,
        event_id: &EventId,
        name: &str,
        date: EventDate,
        standings: &[Standing],
        link: &str,
    ) {
        let rows: Vec<Map<String, Value>> = standings
            .iter()
            .map(|s| legacy_row(s, name, date, link))
            .collect();

        let mut extra = Map::new();
        if !rows.is_empty() {
            let by_direction = |d: Direction| {
                Value::Array(
                    rows.iter()
                        .filter(|r| r.get("Direction").and_then(Value::as_str) == Some(d.as_str()))
                        .cloned()
                        .map(Value::Object)
                        .collect(),
                )
            };
            extra.insert(
                "results".to_string(),
                json!({"NS": by_direction(Direction::NS), "EW": by_direction(Direction::EW)}),
            );
        }

        let entry = IndexedEvent {
            id: event_id.clone(),
            name: name.to_string(),
            date: Some(date),
            extra,
        };
        let key = event_id.index_key();
        if self.document.events.get(&key) != Some(&entry) {
            self.document.events.insert(key, entry);
            self.dirty = true;
        }

        for row in rows {
            if !self.document.legacy_records.iter().any(|r| same_legacy_row(r, &row)) {
                self.document.legacy_records.push(row);
                self.dirty = true;
            }
        }
    }

    /// Register an event seen on the calendar whose roster could not be
    /// read. An existing entry is never touched.
    pub fn ensure_event(&mut self, event_id: &EventId, name: &str, date: EventDate) {
        let key = event_id.index_key();
        if self.document.events.contains_key(&key) {
            return;
        }
        self.document.events.insert(
            key,
            IndexedEvent {
                id: event_id.clone(),
                name: name.to_string(),
                date: Some(date),
                extra: Map::new(),
            },
        );
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn save(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.document.last_updated = Some(Local::now().to_rfc3339());
        let total = self.document.events.len();
        match self.document.metadata.as_object_mut() {
            Some(metadata) => {
                metadata.insert("total_tournaments".to_string(), json!(total));
            }
            None => self.document.metadata = json!({"total_tournaments": total}),
        }
        write_json_atomic(&self.path, &self.document)?;
        self.dirty = false;
        info!("Saved {} indexed events to {}", total, self.path.display());
        Ok(true)
    }
}

fn legacy_row(standing: &Standing, name: &str, date: EventDate, link: &str) -> Map<String, Value> {
    let (first, second) = standing
        .names
        .split_once(" - ")
        .map(|(a, b)| (a.trim().to_string(), b.trim().to_string()))
        .unwrap_or_else(|| (standing.names.trim().to_string(), String::new()));
    let score = standing
        .score
        .replace(',', ".")
        .parse::<f64>()
        .map(|v| json!(v))
        .unwrap_or_else(|_| json!(standing.score));

    let mut row = Map::new();
    row.insert("Sıra".to_string(), json!(standing.rank));
    row.insert("Tarih".to_string(), json!(date.to_string()));
    row.insert("Oyuncu 1".to_string(), json!(first));
    row.insert("Oyuncu 2".to_string(), json!(second));
    row.insert("Skor".to_string(), score);
    row.insert("Direction".to_string(), json!(standing.direction.as_str()));
    row.insert("Turnuva".to_string(), json!(name));
    row.insert("Link".to_string(), json!(link));
    row
}

fn same_legacy_row(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    ["Tarih", "Oyuncu 1", "Oyuncu 2", "Direction"]
        .iter()
        .all(|k| a.get(*k) == b.get(*k))
}
