use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::cards::Direction;
use super::event::{EventDate, EventId};
use super::results::ScoringVariant;

/// Pair counts assumed when the roster table cannot be recognised.
pub const DEFAULT_PAIR_COUNT: u32 = 13;

/// Pair names for one event, keyed by pair (or table) number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRoster {
    pub ns_count: u32,
    pub ew_count: u32,
    pub ns_names: BTreeMap<u32, String>,
    pub ew_names: BTreeMap<u32, String>,
    pub scoring: ScoringVariant,
    /// Final standings from an MP roster page; empty for IMP events.
    #[serde(default)]
    pub standings: Vec<Standing>,
}

impl Default for PairRoster {
    fn default() -> Self {
        Self {
            ns_count: DEFAULT_PAIR_COUNT,
            ew_count: DEFAULT_PAIR_COUNT,
            ns_names: BTreeMap::new(),
            ew_names: BTreeMap::new(),
            scoring: ScoringVariant::MP,
            standings: Vec::new(),
        }
    }
}

impl PairRoster {
    pub fn name(&self, direction: Direction, pair: u32) -> Option<&str> {
        let names = match direction {
            Direction::NS => &self.ns_names,
            Direction::EW => &self.ew_names,
        };
        names.get(&pair).map(String::as_str)
    }

    pub fn count(&self, direction: Direction) -> u32 {
        match direction {
            Direction::NS => self.ns_count,
            Direction::EW => self.ew_count,
        }
    }

    pub fn is_recognised(&self) -> bool {
        !self.ns_names.is_empty() || !self.ew_names.is_empty()
    }
}

/// One line of the overall event ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: u32,
    pub direction: Direction,
    pub names: String,
    pub score: String,
}

/// Title block of an event results page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventInfo {
    pub name: Option<String>,
    pub date: Option<EventDate>,
}

/// An event link found on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: EventId,
    pub name: String,
}

/// Calendar contents: events per day, in page order within a day.
pub type CalendarListing = BTreeMap<EventDate, Vec<CalendarEvent>>;
