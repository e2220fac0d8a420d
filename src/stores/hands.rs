use anyhow::Result;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::atomic::{read_json_opt, write_json_atomic};
use crate::domain::{BoardKey, Deal, Enrichment, EventId};

/// What `HandStore::upsert` did with a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Same key and same cards already stored.
    Unchanged,
    /// Same key, different cards; the stored deal was kept.
    Conflict,
}

/// `hands_database.json`: deals in insertion order with an index on
/// `(event_id, board)`. Cards are written once and never replaced.
pub struct HandStore {
    path: PathBuf,
    deals: Vec<Deal>,
    index: HashMap<BoardKey, usize>,
    dirty: bool,
}

impl HandStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let deals: Vec<Deal> = read_json_opt(&path)?.unwrap_or_default();

        let mut store = Self {
            path,
            deals: Vec::with_capacity(deals.len()),
            index: HashMap::with_capacity(deals.len()),
            dirty: false,
        };
        let loaded = deals.len();
        for deal in deals {
            if store.index.contains_key(&deal.key()) {
                warn!("Duplicate hand record {} in {}; keeping the first", deal.key(), store.path.display());
                store.dirty = true;
                continue;
            }
            store.push(deal);
        }
        info!("Loaded {} hand records from {}", loaded, store.path.display());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    pub fn get(&self, key: &BoardKey) -> Option<&Deal> {
        self.index.get(key).map(|&i| &self.deals[i])
    }

    pub fn contains(&self, key: &BoardKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Deal> {
        self.deals.iter()
    }

    /// Append a new deal. A deal for a known key is only accepted when its
    /// cards match what is stored; enrichment is never taken from `deal`.
    pub fn upsert(&mut self, deal: Deal) -> UpsertOutcome {
        let key = deal.key();
        match self.get(&key) {
            None => {
                self.push(deal);
                self.dirty = true;
                UpsertOutcome::Inserted
            }
            Some(existing) if existing.same_cards(&deal) => UpsertOutcome::Unchanged,
            Some(_) => {
                warn!("Card conflict for {}: stored distribution kept, new one rejected", key);
                UpsertOutcome::Conflict
            }
        }
    }

    /// Attach DD analysis to a stored deal. Returns false for unknown keys.
    pub fn set_enrichment(&mut self, key: &BoardKey, enrichment: Enrichment) -> bool {
        let Some(&i) = self.index.get(key) else {
            return false;
        };
        self.deals[i].set_enrichment(enrichment);
        self.dirty = true;
        true
    }

    /// Move a deal to another event id. Refused when the target key is
    /// already taken so two records never share a key.
    pub fn retag(&mut self, key: &BoardKey, event_id: &EventId) -> bool {
        let target = BoardKey::new(event_id.clone(), key.board);
        if self.index.contains_key(&target) {
            warn!("Cannot re-tag {} as {}: target already stored", key, target);
            return false;
        }
        let Some(i) = self.index.remove(key) else {
            return false;
        };
        self.deals[i].retag(event_id.clone());
        self.index.insert(target, i);
        self.dirty = true;
        true
    }

    pub fn unenriched_keys(&self) -> Vec<BoardKey> {
        self.deals
            .iter()
            .filter(|d| !d.is_enriched())
            .map(Deal::key)
            .collect()
    }

    /// Stored board numbers per event.
    pub fn boards_by_event(&self) -> BTreeMap<EventId, Vec<u32>> {
        let mut boards: BTreeMap<EventId, Vec<u32>> = BTreeMap::new();
        for deal in &self.deals {
            boards.entry(deal.event_id.clone()).or_default().push(deal.board);
        }
        for list in boards.values_mut() {
            list.sort_unstable();
        }
        boards
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the store if anything changed since the last load or save.
    pub fn save(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        write_json_atomic(&self.path, &self.deals)?;
        self.dirty = false;
        info!("Saved {} hand records to {}", self.deals.len(), self.path.display());
        Ok(true)
    }

    /// Move the records out, leaving an empty, clean store on the same path.
    pub fn take(&mut self) -> HandStore {
        let empty = HandStore {
            path: self.path.clone(),
            deals: Vec::new(),
            index: HashMap::new(),
            dirty: false,
        };
        std::mem::replace(self, empty)
    }

    fn push(&mut self, deal: Deal) {
        self.index.insert(deal.key(), self.deals.len());
        self.deals.push(deal);
    }
}
