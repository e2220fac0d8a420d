use log::{debug, info, warn};

use super::lott::total_tricks;
use super::solver::{DoubleDummySolver, SolverError};
use crate::domain::{Deal, Enrichment, FetchProgress};
use crate::stores::HandStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichReport {
    pub enriched: usize,
    /// Deals whose cards do not form a valid deal; never solved.
    pub invalid: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Attaches trick table, par and LoTT to every deal that lacks them.
pub struct DdEnricher<'a, D: DoubleDummySolver + ?Sized> {
    solver: &'a D,
}

impl<'a, D: DoubleDummySolver + ?Sized> DdEnricher<'a, D> {
    pub fn new(solver: &'a D) -> Self {
        Self { solver }
    }

    pub fn enrich_store(&self, hands: &mut HandStore) -> EnrichReport {
        let mut report = EnrichReport::default();
        let pending = hands.unenriched_keys();
        if pending.is_empty() {
            debug!("No deals waiting for double-dummy analysis");
            return report;
        }
        info!("  → {} deals need double-dummy analysis", pending.len());

        let mut progress = FetchProgress::new(pending.len());
        for key in pending {
            let Some(deal) = hands.get(&key) else { continue };
            if let Err(e) = deal.validate_cards() {
                warn!("Skipping deal {}: {}", key, e);
                report.invalid += 1;
                report.errors.push(format!("deal {}: {}", key, e));
                progress.increment_absent();
                continue;
            }

            match self.enrich(deal) {
                Ok(enrichment) => {
                    if hands.set_enrichment(&key, enrichment) {
                        report.enriched += 1;
                    }
                    progress.increment_fetched();
                }
                Err(e) => {
                    warn!("Double-dummy analysis failed for {}: {}", key, e);
                    report.failed += 1;
                    report.errors.push(format!("deal {}: {}", key, e));
                    progress.increment_failed();
                }
            }
        }

        info!(
            "  → Enriched {} deals ({} failed, {} invalid)",
            report.enriched, report.failed, report.invalid
        );
        report
    }

    pub fn enrich(&self, deal: &Deal) -> Result<Enrichment, SolverError> {
        let hands = deal.hands();
        let table = self.solver.solve(&hands.to_pbn(deal.dealer))?;
        if !table.is_within_range() {
            return Err(SolverError::Search(format!("trick count out of range: {:?}", table)));
        }
        Ok(Enrichment {
            dd_analysis: table,
            optimum: self.solver.par(&table, deal.vulnerability, deal.dealer),
            lott: total_tricks(&hands, &table),
        })
    }
}
