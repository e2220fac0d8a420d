use log::info;
use std::collections::BTreeMap;

use crate::domain::{Direction, EventId};
use crate::registry::EventRegistry;
use crate::stores::{EventSummary, ResultStore};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingsReport {
    pub tables_reranked: usize,
    pub events_summarised: usize,
}

/// Re-ranks every stored board table and refreshes the per-event
/// summaries the viewer shows next to them.
pub struct BoardRankingsGenerator<'a> {
    registry: &'a EventRegistry,
}

impl<'a> BoardRankingsGenerator<'a> {
    pub fn new(registry: &'a EventRegistry) -> Self {
        Self { registry }
    }

    pub fn generate(&self, results: &mut ResultStore) -> RankingsReport {
        let tables_reranked = results.rerank_all();

        let mut pair_counts: BTreeMap<EventId, (u32, u32)> = BTreeMap::new();
        for (key, result) in results.iter() {
            let counts = pair_counts.entry(key.event_id).or_default();
            counts.0 = counts.0.max(result.rows_for(Direction::NS).count() as u32);
            counts.1 = counts.1.max(result.rows_for(Direction::EW).count() as u32);
        }

        let mut events_summarised = 0;
        for (event_id, (ns_rows, ew_rows)) in pair_counts {
            let current = results.event_summary(&event_id).cloned().unwrap_or_default();
            let summary = EventSummary {
                name: self
                    .registry
                    .name_of(&event_id)
                    .map(str::to_string)
                    .unwrap_or(current.name.clone()),
                date: self.registry.date_of(&event_id).or(current.date),
                ns_pairs: if current.ns_pairs > 0 { current.ns_pairs } else { ns_rows },
                ew_pairs: if current.ew_pairs > 0 { current.ew_pairs } else { ew_rows },
            };
            if results.event_summary(&event_id) != Some(&summary) {
                results.set_event_summary(&event_id, summary);
                events_summarised += 1;
            }
        }

        info!(
            "  → Rankings: {} tables re-ranked, {} event summaries refreshed",
            tables_reranked, events_summarised
        );
        RankingsReport {
            tables_reranked,
            events_summarised,
        }
    }
}
