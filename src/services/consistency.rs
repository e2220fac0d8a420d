use log::{info, warn};

use crate::domain::{BoardKey, EventId};
use crate::registry::{EventRegistry, HandInconsistency};
use crate::stores::{HandStore, ResultStore, ValidationSummary};

/// Findings of a full cross-store check. Nothing here is deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsistencyReport {
    pub hand_issues: Vec<HandInconsistency>,
    /// Result tables with no stored deal.
    pub orphan_results: Vec<BoardKey>,
    /// Events with result tables but no summary, or with unranked tables.
    pub events_missing_rankings: Vec<EventId>,
    pub registry_conflicts: usize,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.hand_issues.is_empty()
            && self.orphan_results.is_empty()
            && self.events_missing_rankings.is_empty()
            && self.registry_conflicts == 0
    }

    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary {
            hand_issues: self.hand_issues.len(),
            orphan_results: self.orphan_results.len(),
            events_missing_rankings: self.events_missing_rankings.len(),
        }
    }
}

/// Keeps the hand store's event ids in line with the registry and reports
/// cross-store problems.
pub struct ConsistencyGuard<'a> {
    registry: &'a EventRegistry,
}

impl<'a> ConsistencyGuard<'a> {
    pub fn new(registry: &'a EventRegistry) -> Self {
        Self { registry }
    }

    /// Re-tag deals whose event id the registry does not have for their
    /// date. Cards are never touched.
    pub fn repair(&self, hands: &mut HandStore) -> usize {
        let fixed = self.registry.fix_hands(hands, false);
        if fixed > 0 {
            info!("  → Re-tagged {} deals with the registry's event id", fixed);
        }
        fixed
    }

    pub fn report(&self, hands: &HandStore, results: &ResultStore) -> ConsistencyReport {
        let report = ConsistencyReport {
            hand_issues: self.registry.validate_hands(hands),
            orphan_results: orphan_results(hands, results),
            events_missing_rankings: events_missing_rankings(results),
            registry_conflicts: self.registry.conflicts().len(),
        };

        for issue in &report.hand_issues {
            warn!("Hand issue: {}", issue);
        }
        for key in &report.orphan_results {
            warn!("Result table {} has no stored deal", key);
        }
        for id in &report.events_missing_rankings {
            warn!("Event {} has no ranked summary", id);
        }
        info!(
            "  → Validation: {} hand issues, {} orphan results, {} events missing rankings, {} registry conflicts",
            report.hand_issues.len(),
            report.orphan_results.len(),
            report.events_missing_rankings.len(),
            report.registry_conflicts
        );
        report
    }
}

fn orphan_results(hands: &HandStore, results: &ResultStore) -> Vec<BoardKey> {
    results
        .iter()
        .filter(|(key, _)| !hands.contains(key))
        .map(|(key, _)| key)
        .collect()
}

fn events_missing_rankings(results: &ResultStore) -> Vec<EventId> {
    let mut events: Vec<EventId> = results
        .iter()
        .filter(|(key, result)| !result.is_ranked() || results.event_summary(&key.event_id).is_none())
        .map(|(key, _)| key.event_id)
        .collect();
    events.sort();
    events.dedup();
    events
}
