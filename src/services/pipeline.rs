use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::consistency::ConsistencyGuard;
use super::rankings::{BoardRankingsGenerator, RankingsReport};
use crate::config::AppConfig;
use crate::dd::{DdEnricher, DoubleDummySolver, EnrichReport};
use crate::domain::{CalendarListing, EventId};
use crate::fetchers::{Discoverer, EventFetcher, EventTarget, SourceUrls, discoverer};
use crate::http::PageSource;
use crate::parsers::SourceParser;
use crate::registry::EventRegistry;
use crate::retry::{RetryPolicy, Step, retry};
use crate::stores::{PipelineStatus, RunResult, Stores, ValidationSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// New events plus whatever the previous run left unfetched.
    Quick,
    /// Every calendar event is re-read, with a larger retry budget.
    Full,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Quick => "quick",
            Mode::Full => "full",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Mode::Quick => "Quick Update",
            Mode::Full => "Full Update",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub mode: Mode,
    pub success: bool,
    pub attempts: u32,
    pub new_events: usize,
    pub boards_fetched: usize,
    pub event_ids_fixed: usize,
    pub deals_enriched: usize,
    pub rankings: RankingsReport,
    pub unfetched: BTreeMap<EventId, Vec<u32>>,
    pub errors: Vec<String>,
    pub validation: Option<ValidationSummary>,
}

impl RunReport {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            success: false,
            attempts: 0,
            new_events: 0,
            boards_fetched: 0,
            event_ids_fixed: 0,
            deals_enriched: 0,
            rankings: RankingsReport::default(),
            unfetched: BTreeMap::new(),
            errors: Vec::new(),
            validation: None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.success { 0 } else { 1 }
    }
}

/// An event queued for fetching: `None` means every board.
type WorkList = BTreeMap<EventId, (EventTarget, Option<Vec<u32>>)>;

struct Sweep<'s> {
    stores: &'s mut Stores,
    pending: WorkList,
    boards_fetched: usize,
    errors: Vec<String>,
    fatal: Option<anyhow::Error>,
}

impl Sweep<'_> {
    fn pending_boards(&self) -> BTreeMap<EventId, Vec<u32>> {
        self.pending
            .iter()
            .map(|(id, (_, boards))| (id.clone(), boards.clone().unwrap_or_default()))
            .collect()
    }
}

/// One update run over the stores in the working directory.
pub struct Pipeline<S: PageSource, D: DoubleDummySolver + 'static> {
    source: S,
    solver: Arc<D>,
    config: AppConfig,
    parser: SourceParser,
    urls: SourceUrls,
}

impl<S: PageSource, D: DoubleDummySolver + 'static> Pipeline<S, D> {
    pub fn new(source: S, solver: D, config: AppConfig) -> Result<Self> {
        let urls = SourceUrls::new(&config.scraper.base_url);
        Ok(Self {
            source,
            solver: Arc::new(solver),
            config,
            parser: SourceParser::new()?,
            urls,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn run(&self, mode: Mode) -> Result<RunReport> {
        self.run_on(mode, Local::now().date_naive()).await
    }

    /// Run with `today` anchoring the calendar's month and year.
    /// Errors are store failures only; everything else lands in the report.
    pub async fn run_on(&self, mode: Mode, today: NaiveDate) -> Result<RunReport> {
        info!("=== Starting {} ===\n", mode.title());
        let mut stores = Stores::open(&self.config.stores)?;
        let mut status = stores.status.load().unwrap_or_else(|e| {
            warn!("Unreadable status journal, starting a new one: {:#}", e);
            PipelineStatus::default()
        });
        let mut report = RunReport::new(mode);

        // Step 1: registry
        info!("Step 1: Loading event registry");
        let registry = EventRegistry::from_index(&stores.index)?;

        // Step 2: event-id repair
        info!("Step 2: Checking hand store event ids");
        report.event_ids_fixed = ConsistencyGuard::new(&registry).repair(&mut stores.hands);

        // Step 3: discovery
        info!("Step 3: Discovering events");
        let discoverer = Discoverer::new(&self.source, &self.parser, &self.urls);
        let mut calendar_ok = true;
        let listing = match discoverer.discover(today).await {
            Ok(listing) => listing,
            Err(e) => {
                error!("Calendar discovery failed: {:#}", e);
                report.errors.push(format!("calendar: {:#}", e));
                calendar_ok = false;
                CalendarListing::new()
            }
        };
        let work = self.plan(mode, &listing, &registry, &stores, &status, &mut report);
        info!("  → {} events queued ({} new)\n", work.len(), report.new_events);

        // Step 4: fetch with retries
        info!("Step 4: Fetching boards");
        let policy = self.retry_policy(mode);
        let (unfetched, attempts) = self.sweep(mode, &policy, work, &mut stores, &mut report).await?;
        report.unfetched = unfetched;
        report.attempts = attempts;

        // Step 5: double dummy
        info!("Step 5: Double-dummy enrichment");
        let enriched = self.enrich(&mut stores).await?;
        report.deals_enriched = enriched.enriched;
        report.errors.extend(enriched.errors);

        // Step 6: rankings, against the registry including events recorded this run
        info!("Step 6: Regenerating board rankings");
        let registry = EventRegistry::from_index(&stores.index)?;
        report.rankings = BoardRankingsGenerator::new(&registry).generate(&mut stores.results);

        if mode == Mode::Full {
            info!("Step 7: Validating stores");
            let validation = ConsistencyGuard::new(&registry).report(&stores.hands, &stores.results);
            report.validation = Some(validation.summary());
        }

        stores.save()?;

        report.success = calendar_ok && report.unfetched.is_empty();
        self.record_status(&mut status, &report);
        stores.status.save(&status)?;

        info!(
            "=== {} {}: {} boards fetched, {} deals enriched, {} boards unfetched after {} attempts ===",
            mode.title(),
            if report.success { "Complete" } else { "Incomplete" },
            report.boards_fetched,
            report.deals_enriched,
            report.unfetched.values().map(Vec::len).sum::<usize>(),
            report.attempts
        );
        Ok(report)
    }

    /// Re-rank stored tables and refresh event summaries without fetching.
    pub fn regenerate_rankings(&self) -> Result<RankingsReport> {
        info!("=== Starting Rankings Regeneration ===\n");
        let mut stores = Stores::open(&self.config.stores)?;
        let registry = EventRegistry::from_index(&stores.index)?;
        let report = BoardRankingsGenerator::new(&registry).generate(&mut stores.results);
        stores.save()?;
        info!("=== Rankings Regeneration Complete ===");
        Ok(report)
    }

    fn retry_policy(&self, mode: Mode) -> RetryPolicy {
        match mode {
            Mode::Quick => self.config.pipeline.quick_retry,
            Mode::Full => self.config.pipeline.full_retry,
        }
    }

    // --- Planning ---

    fn plan(
        &self,
        mode: Mode,
        listing: &CalendarListing,
        registry: &EventRegistry,
        stores: &Stores,
        status: &PipelineStatus,
        report: &mut RunReport,
    ) -> WorkList {
        let mut work = WorkList::new();
        let fresh = discoverer::new_events(listing, registry);
        report.new_events = fresh.len();
        let queued = match mode {
            Mode::Quick => fresh,
            Mode::Full => discoverer::all_events(listing),
        };

        for event in queued {
            let target = EventTarget {
                id: event.id.clone(),
                name: event.name,
                date: Some(event.date),
            };
            work.insert(event.id, (target, None));
        }

        let mut leftovers: BTreeMap<EventId, Vec<u32>> = status
            .unfetched
            .iter()
            .map(|(id, boards)| (EventId::new(id.as_str()), boards.clone()))
            .collect();
        if mode == Mode::Full {
            for (id, boards) in discoverer::incomplete_events(&stores.results, &stores.hands) {
                leftovers.entry(id).or_default().extend(boards);
            }
        }

        for (id, mut boards) in leftovers {
            boards.sort_unstable();
            boards.dedup();
            match work.get_mut(&id) {
                Some((_, None)) => {}
                Some((_, Some(list))) => list.extend(boards),
                None => {
                    let target = EventTarget {
                        id: id.clone(),
                        name: registry.name_of(&id).unwrap_or_default().to_string(),
                        date: registry.date_of(&id),
                    };
                    work.insert(id, (target, Some(boards)));
                }
            }
        }
        work
    }

    // --- Fetching ---

    /// Fetch everything queued, retrying what is still missing until the
    /// policy's attempt cap. Returns the boards left over and the attempts
    /// used.
    async fn sweep(
        &self,
        mode: Mode,
        policy: &RetryPolicy,
        work: WorkList,
        stores: &mut Stores,
        report: &mut RunReport,
    ) -> Result<(BTreeMap<EventId, Vec<u32>>, u32)> {
        let fetcher = EventFetcher::new(
            &self.source,
            &self.parser,
            &self.urls,
            self.config.scraper.board_cap,
            self.config.scraper.max_concurrent_requests,
        );
        let state = Mutex::new(Sweep {
            stores,
            pending: work,
            boards_fetched: 0,
            errors: Vec::new(),
            fatal: None,
        });

        let name = format!("{} board sweep", mode);
        let outcome = retry(&name, policy, |attempt| {
            let state = &state;
            let fetcher = &fetcher;
            async move {
                let mut sweep = state.lock().await;
                if sweep.pending.is_empty() {
                    return Step::Done(());
                }
                if attempt > 1 {
                    info!("  → Retry attempt {} for {} events", attempt, sweep.pending.len());
                }

                let before = sweep.boards_fetched;
                let queued: Vec<(EventId, (EventTarget, Option<Vec<u32>>))> =
                    sweep.pending.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

                for (id, (target, boards)) in queued {
                    let event = fetcher.fetch_event(&target, boards.as_deref(), &mut *sweep.stores).await;
                    sweep.boards_fetched += event.boards_fetched.len();
                    sweep.errors.extend(event.errors);
                    if event.missing.is_empty() {
                        sweep.pending.remove(&id);
                    } else {
                        sweep.pending.insert(id, (target, Some(event.missing)));
                    }

                    // Hands are written before the results that refer to them.
                    if let Err(e) = sweep.stores.save() {
                        let message = format!("store write failed: {:#}", e);
                        sweep.fatal = Some(e);
                        return Step::Abort(message);
                    }
                }

                let remaining: usize = sweep.pending_boards().values().map(Vec::len).sum();
                if remaining == 0 {
                    Step::Done(())
                } else if sweep.boards_fetched > before {
                    Step::RetryNow(format!("{} boards still missing", remaining))
                } else {
                    Step::Retry(format!("{} boards still missing, no progress", remaining))
                }
            }
        })
        .await;

        let mut sweep = state.into_inner();
        report.boards_fetched += sweep.boards_fetched;
        report.errors.extend(std::mem::take(&mut sweep.errors));
        if let Some(fatal) = sweep.fatal.take() {
            return Err(fatal);
        }

        match outcome {
            Ok(((), attempts)) => Ok((BTreeMap::new(), attempts)),
            Err(exhausted) => {
                warn!(
                    "Giving up on {} events after {} attempts: {}",
                    sweep.pending.len(),
                    exhausted.attempts,
                    exhausted.last_error
                );
                Ok((sweep.pending_boards(), exhausted.attempts))
            }
        }
    }

    // --- Double dummy ---

    /// Solving is CPU-bound, so the hand store moves onto a blocking thread
    /// for the duration and comes back afterwards.
    async fn enrich(&self, stores: &mut Stores) -> Result<EnrichReport> {
        let solver = Arc::clone(&self.solver);
        let mut hands = stores.hands.take();
        let (hands, report) = tokio::task::spawn_blocking(move || {
            let report = DdEnricher::new(&*solver).enrich_store(&mut hands);
            (hands, report)
        })
        .await
        .context("Double-dummy worker stopped")?;
        stores.hands = hands;
        Ok(report)
    }

    // --- Status ---

    fn record_status(&self, status: &mut PipelineStatus, report: &RunReport) {
        let now = Local::now().to_rfc3339();
        status.last_run = Some(now.clone());
        status.total_runs += 1;
        status.total_boards_fetched += report.boards_fetched as u64;
        status.push_errors(report.errors.iter().cloned());
        status.unfetched = report
            .unfetched
            .iter()
            .map(|(id, boards)| (id.to_string(), boards.clone()))
            .collect();
        status.last_attempts = report.attempts;
        status.last_mode = Some(report.mode.to_string());
        status.last_result = Some(RunResult {
            success: report.success,
            timestamp: now.clone(),
            boards_fetched: report.boards_fetched,
            event_ids_fixed: report.event_ids_fixed,
            errors: report.errors.len(),
        });
        if report.success {
            status.last_success = Some(now.clone());
            if report.mode == Mode::Full {
                status.last_full_update = Some(now);
            }
        }
        if report.validation.is_some() {
            status.last_validation = report.validation.clone();
        }
    }
}
