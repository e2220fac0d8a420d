//! Canonical mapping between event ids, dates and tournament names.
//!
//! Rebuilt from `database.json` on every load: the authoritative `events`
//! table first, in document order, then ids recovered from the `Link`
//! column of legacy rows. A date may carry several events; an event has
//! exactly one date. The first id registered for a date is the one
//! `event_id_of` returns.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use log::{debug, info, warn};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::domain::{BoardKey, EventDate, EventId};
use crate::stores::{HandStore, TournamentIndex};

#[derive(Debug, Clone, PartialEq)]
struct RegistryEntry {
    date: EventDate,
    name: String,
}

/// A legacy row placing a known event on a different date.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConflict {
    pub event_id: EventId,
    pub registered: EventDate,
    pub legacy: EventDate,
}

impl fmt::Display for RegistryConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "event {} is dated {} but a legacy record says {}",
            self.event_id, self.registered, self.legacy
        )
    }
}

/// A stored deal whose event id is not registered for its date.
#[derive(Debug, Clone, PartialEq)]
pub struct HandInconsistency {
    pub key: BoardKey,
    pub date: EventDate,
    pub expected: EventId,
}

impl fmt::Display for HandInconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dated {} should be event {}", self.key, self.date, self.expected)
    }
}

#[derive(Debug, Default)]
pub struct EventRegistry {
    by_id: HashMap<EventId, RegistryEntry>,
    by_date: BTreeMap<EventDate, Vec<EventId>>,
    conflicts: Vec<RegistryConflict>,
}

impl EventRegistry {
    pub fn from_index(index: &TournamentIndex) -> Result<Self> {
        let link_regex = Regex::new(r"event=(\d+)").context("Failed to compile event link pattern")?;
        let mut registry = Self::default();

        for event in index.events() {
            match event.date {
                Some(date) => registry.register(event.id.clone(), date, &event.name),
                None => warn!("Indexed event {} has no usable date; skipped", event.id),
            }
        }

        let mut recovered = 0;
        for row in index.legacy_records() {
            let Some(date) = row
                .get("Tarih")
                .and_then(|v| v.as_str())
                .and_then(|t| t.parse::<EventDate>().ok())
            else {
                continue;
            };
            let Some(id) = row
                .get("Link")
                .and_then(|v| v.as_str())
                .and_then(|link| link_regex.captures(link))
                .map(|c| EventId::new(&c[1]))
            else {
                continue;
            };

            match registry.by_id.get(&id) {
                Some(entry) if entry.date == date => {}
                Some(entry) => {
                    let conflict = RegistryConflict {
                        event_id: id,
                        registered: entry.date,
                        legacy: date,
                    };
                    if !registry.conflicts.contains(&conflict) {
                        warn!("Registry conflict: {}", conflict);
                        registry.conflicts.push(conflict);
                    }
                }
                None => {
                    let name = row.get("Turnuva").and_then(|v| v.as_str()).unwrap_or_default();
                    registry.register(id, date, name);
                    recovered += 1;
                }
            }
        }

        info!(
            "Event registry: {} events over {} dates ({} recovered from legacy records)",
            registry.by_id.len(),
            registry.by_date.len(),
            recovered
        );
        Ok(registry)
    }

    fn register(&mut self, id: EventId, date: EventDate, name: &str) {
        if let Some(existing) = self.by_id.get(&id) {
            if existing.date != date {
                warn!("Event {} listed twice with dates {} and {}; keeping the first", id, existing.date, date);
            }
            return;
        }
        self.by_date.entry(date).or_default().push(id.clone());
        self.by_id.insert(
            id,
            RegistryEntry {
                date,
                name: name.to_string(),
            },
        );
    }

    /// Canonical event for a date.
    pub fn event_id_of(&self, date: EventDate) -> Option<&EventId> {
        self.by_date.get(&date).and_then(|ids| ids.first())
    }

    /// Every event registered for a date, canonical first.
    pub fn events_on(&self, date: EventDate) -> &[EventId] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn date_of(&self, event_id: &EventId) -> Option<EventDate> {
        self.by_id.get(event_id).map(|e| e.date)
    }

    pub fn name_of(&self, event_id: &EventId) -> Option<&str> {
        self.by_id
            .get(event_id)
            .map(|e| e.name.as_str())
            .filter(|n| !n.is_empty())
    }

    pub fn contains(&self, event_id: &EventId) -> bool {
        self.by_id.contains_key(event_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Canonical event per date.
    pub fn all_events(&self) -> BTreeMap<EventDate, EventId> {
        self.by_date
            .iter()
            .filter_map(|(date, ids)| ids.first().map(|id| (*date, id.clone())))
            .collect()
    }

    /// Canonical events dated within the last `days` days of `today`.
    pub fn recent(&self, days: i64, today: NaiveDate) -> BTreeMap<EventDate, EventId> {
        let cutoff = EventDate::new(today - Duration::days(days));
        let today = EventDate::new(today);
        self.all_events()
            .into_iter()
            .filter(|(date, _)| *date >= cutoff && *date <= today)
            .collect()
    }

    pub fn conflicts(&self) -> &[RegistryConflict] {
        &self.conflicts
    }

    /// Deals whose event id is registered, but under another date than the
    /// deal's. Ids the registry has never seen are left alone.
    pub fn validate_hands(&self, store: &HandStore) -> Vec<HandInconsistency> {
        store
            .iter()
            .filter_map(|deal| {
                let date = deal.date?;
                if !self.contains(&deal.event_id) || self.events_on(date).contains(&deal.event_id) {
                    return None;
                }
                let expected = self.event_id_of(date)?;
                Some(HandInconsistency {
                    key: deal.key(),
                    date,
                    expected: expected.clone(),
                })
            })
            .collect()
    }

    /// Re-tag inconsistent deals with the canonical id for their date.
    /// Only the id changes. Returns how many deals were (or would be) fixed.
    pub fn fix_hands(&self, store: &mut HandStore, dry_run: bool) -> usize {
        let issues = self.validate_hands(store);
        if dry_run {
            for issue in &issues {
                info!("  → Would fix {}", issue);
            }
            return issues.len();
        }

        let mut fixed = 0;
        for issue in issues {
            if store.retag(&issue.key, &issue.expected) {
                debug!("Fixed {}", issue);
                fixed += 1;
            }
        }
        fixed
    }
}
