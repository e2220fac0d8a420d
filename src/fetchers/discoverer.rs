use anyhow::{Result, bail};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;

use super::urls::SourceUrls;
use crate::domain::{CalendarListing, EventDate, EventId};
use crate::errors::fetch_context;
use crate::http::{FetchOutcome, PageSource};
use crate::parsers::SourceParser;
use crate::registry::EventRegistry;
use crate::stores::{HandStore, ResultStore};

/// An event the calendar lists.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredEvent {
    pub id: EventId,
    pub name: String,
    pub date: EventDate,
}

/// Reads the site calendar.
pub struct Discoverer<'a, S: PageSource + ?Sized> {
    source: &'a S,
    parser: &'a SourceParser,
    urls: &'a SourceUrls,
}

impl<'a, S: PageSource + ?Sized> Discoverer<'a, S> {
    pub fn new(source: &'a S, parser: &'a SourceParser, urls: &'a SourceUrls) -> Self {
        Self { source, parser, urls }
    }

    /// Every event on the calendar, per date.
    pub async fn discover(&self, today: NaiveDate) -> Result<CalendarListing> {
        let url = self.urls.calendar();
        let page = match self.source.fetch(&url).await {
            FetchOutcome::Page(page) => page,
            FetchOutcome::NotFound => {
                warn!("Calendar page not found: {}", url);
                return Ok(CalendarListing::new());
            }
            FetchOutcome::Unavailable(failure) => bail!("{}: {}", fetch_context(&url), failure),
        };

        let listing = self.parser.parse_calendar(&page.body, today);
        let total: usize = listing.values().map(Vec::len).sum();
        info!("  → Calendar lists {} events over {} dates", total, listing.len());
        Ok(listing)
    }
}

/// Flatten a calendar listing in date order.
pub fn all_events(listing: &CalendarListing) -> Vec<DiscoveredEvent> {
    listing
        .iter()
        .flat_map(|(date, events)| {
            events.iter().map(move |e| DiscoveredEvent {
                id: e.id.clone(),
                name: e.name.clone(),
                date: *date,
            })
        })
        .collect()
}

/// Calendar events the registry does not know yet.
pub fn new_events(listing: &CalendarListing, registry: &EventRegistry) -> Vec<DiscoveredEvent> {
    all_events(listing)
        .into_iter()
        .filter(|e| !registry.contains(&e.id))
        .collect()
}

/// An event is complete when every board it has in the hand store also
/// has a result table with at least one row.
pub fn incomplete_events(results: &ResultStore, hands: &HandStore) -> BTreeMap<EventId, Vec<u32>> {
    hands
        .iter()
        .filter(|deal| !results.has_rows(&deal.key()))
        .fold(BTreeMap::new(), |mut missing: BTreeMap<EventId, Vec<u32>>, deal| {
            missing.entry(deal.event_id.clone()).or_default().push(deal.board);
            missing
        })
        .into_iter()
        .map(|(id, mut boards)| {
            boards.sort_unstable();
            (id, boards)
        })
        .collect()
}
