use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tempfile::TempDir;

use vugraph_sync::config::{AppConfig, StoreSettings};
use vugraph_sync::dd::{DoubleDummySolver, SolverError};
use vugraph_sync::domain::{
    BoardKey, Deal, Direction, Enrichment, EventDate, EventId, Fit, Hands, Lott, Optimum,
    ScoringVariant, Seat, Suit, TrickTable, Vulnerability,
};
use vugraph_sync::fetchers::SourceUrls;
use vugraph_sync::http::{FetchFailure, FetchOutcome, Page, PageSource};
use vugraph_sync::registry::EventRegistry;
use vugraph_sync::retry::RetryPolicy;
use vugraph_sync::services::{Mode, Pipeline, RankingsReport, ScheduleDriver};
use vugraph_sync::stores::{HandStore, ResultStore, StatusJournal, TournamentIndex};

const BASE: &str = "http://vugraph.test";

const DEAL_A: [&str; 4] = [
    "AKQJ.AKQ.AKQ.AKQ",
    "T987.JT9.JT9.JT9",
    "654.8765.876.876",
    "32.432.5432.5432",
];

// Same shape as DEAL_A with the two small spades moved between E and W.
const DEAL_B: [&str; 4] = [
    "AKQJ.AKQ.AKQ.AKQ",
    "T932.JT9.JT9.JT9",
    "654.8765.876.876",
    "87.432.5432.5432",
];

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 25).unwrap()
}

fn date(day: u32) -> EventDate {
    EventDate::from_ymd(2026, 1, day).unwrap()
}

// --- Fakes ---

/// Serves scripted outcomes per URL. The n-th call gets the n-th outcome
/// and the last one repeats; unknown URLs are 404.
#[derive(Default)]
struct ScriptedSource {
    scripts: HashMap<String, Vec<FetchOutcome>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl ScriptedSource {
    fn serve(&mut self, url: String, body: String) {
        self.scripts.insert(url.clone(), vec![FetchOutcome::Page(Page::new(url, body))]);
    }

    fn script(&mut self, url: String, outcomes: Vec<FetchOutcome>) {
        self.scripts.insert(url, outcomes);
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let Some(script) = self.scripts.get(url) else {
            return FetchOutcome::NotFound;
        };
        let mut calls = self.calls.lock().unwrap();
        let n = calls.entry(url.to_string()).or_default();
        let outcome = script[(*n).min(script.len() - 1)].clone();
        *n += 1;
        outcome
    }
}

/// Answers every deal with the same table and records where it ran.
struct FixedSolver {
    table: TrickTable,
    calls: Arc<AtomicUsize>,
    threads: Arc<Mutex<Vec<ThreadId>>>,
}

impl FixedSolver {
    fn new() -> Self {
        Self {
            table: TrickTable::from_rows([
                [12, 12, 12, 12, 13],
                [1, 1, 1, 1, 0],
                [12, 12, 12, 12, 13],
                [1, 1, 1, 1, 0],
            ]),
            calls: Arc::new(AtomicUsize::new(0)),
            threads: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl DoubleDummySolver for FixedSolver {
    fn solve(&self, _pbn: &str) -> Result<TrickTable, SolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.threads.lock().unwrap().push(thread::current().id());
        Ok(self.table)
    }
}

// --- Page fixtures ---

fn calendar_page(events: &[(u32, &str, &str)]) -> String {
    let days: String = events
        .iter()
        .map(|(day, id, name)| {
            format!(
                r#"<td class="days"><table><tr><td class="days2">{day}</td></tr><tr><td><a href="eventresults.php?event={id}">{name}</a></td></tr></table></td>"#
            )
        })
        .collect();
    format!(r#"<html><body><table><tr><th colspan="7">Ocak 2026</th></tr><tr>{days}</tr></table></body></html>"#)
}

fn mp_roster_page(title: &str, day: u32, pairs: u32) -> String {
    let block = |label: &str, prefix: &str| {
        let rows: String = (1..=pairs)
            .map(|n| format!("<tr><td>{n}</td><td>{prefix} Player{n}a - {prefix} Player{n}b</td><td>{},0</td></tr>", 60 - n))
            .collect();
        format!(r#"<tr><td colspan="3">{label}</td></tr><tr><td>Sıra</td><td>Oyuncular</td><td>Skor</td></tr>{rows}"#)
    };
    format!(
        r#"<html><body><h3>{title} ({day:02}-01-2026 14:00)</h3><table class="colored">{}{}</table></body></html>"#,
        block("Kuzey - Güney", "NS"),
        block("Doğu - Batı", "EW")
    )
}

fn imp_roster_page(title: &str, day: u32, tables: u32) -> String {
    let rows: String = (1..=tables)
        .map(|t| format!("<tr><td>{t}</td><td>North{t} - South{t}</td><td>{}</td><td>East{t} - West{t}</td></tr>", 10 - t as i32))
        .collect();
    format!(
        r#"<html><body><h3>{title} ({day:02}-01-2026 19:30)</h3><table><tr><th>Masa</th><th>Kuzey - Güney</th><th>IMP</th><th>Doğu - Batı</th></tr>{rows}</table></body></html>"#
    )
}

/// Hands in N, E, S, W order; the page shows them as W, N, E, S.
fn bridge_table(hands: [&str; 4]) -> String {
    let icons = ["spade", "heart", "diamond", "club"];
    let cell = |name: &str, hand: &str| {
        let suits: String = hand
            .split('.')
            .zip(icons)
            .map(|(holding, icon)| format!(r#"<br><img alt="{icon}"> {holding}"#))
            .collect();
        format!(r#"<td class="oyuncu"><b>{name}</b>{suits}</td>"#)
    };
    format!(
        r#"<table class="bridgetable"><tr>{}{}{}{}</tr></table>"#,
        cell("West", hands[3]),
        cell("North", hands[0]),
        cell("East", hands[1]),
        cell("South", hands[2])
    )
}

/// Table `n` seats NS pair `n` against EW pair `n`; `pair` picks the
/// highlighted line, as on that pair's own page.
fn mp_board_page(tables: u32, hands: Option<[&str; 4]>, pair: u32) -> String {
    let rows: String = (0..tables)
        .map(|i| {
            let class = if i + 1 == pair { "fantastic" } else { "results" };
            let ns = f64::from((i * 7) % tables) * 100.0 / f64::from((tables - 1).max(1));
            format!(
                r#"<tr><td class="{class}">4<img alt="spade"></td><td class="{class}">N</td><td class="{class}">=</td><td class="{class}">HK</td><td class="{class}">420</td><td class="{class}"></td><td class="{class}">{ns:.1}</td><td class="{class}">{:.1}</td></tr>"#,
                100.0 - ns
            )
        })
        .collect();
    format!(
        r#"<html><body>{}<table><tr><th>Kontrat</th><th>Oyuncu</th><th>Sonuç</th><th>Atak</th><th>K-G</th><th>D-B</th><th>K-G %</th><th>D-B %</th></tr>{rows}</table></body></html>"#,
        hands.map(bridge_table).unwrap_or_default()
    )
}

/// Every pair's page for one MP board; pair 1 NS doubles as the batch view.
fn serve_mp_board(
    source: &mut ScriptedSource,
    urls: &SourceUrls,
    id: &EventId,
    board: u32,
    tables: u32,
    hands: Option<[&str; 4]>,
) {
    for pair in 1..=tables {
        for direction in Direction::BOTH {
            source.serve(
                urls.board_details(id, pair, direction, board),
                mp_board_page(tables, hands, pair),
            );
        }
    }
}

fn imp_board_page(tables: u32, hands: [&str; 4]) -> String {
    let rows: String = (1..=tables)
        .map(|t| {
            let imp = i64::from(t) - 4;
            format!(
                r#"<tr><td class="results"><img alt="club">5</td><td class="results"></td><td class="results">{}</td><td class="results">{imp}</td></tr>"#,
                if t % 2 == 0 { 620 } else { -100 }
            )
        })
        .collect();
    format!(
        r#"<html><body>{}<table><tr><th>Atak</th><th></th><th>K-G</th><th>IMP</th></tr>{rows}</table></body></html>"#,
        bridge_table(hands)
    )
}

// --- Harness ---

fn config(dir: &Path, board_cap: u32) -> AppConfig {
    let mut config = AppConfig::new().with_workdir(dir);
    config.scraper.base_url = BASE.to_string();
    config.scraper.board_cap = board_cap;
    config.pipeline.quick_retry = RetryPolicy::immediate(3);
    config.pipeline.full_retry = RetryPolicy::immediate(5);
    config.pipeline.daemon_interval = Duration::from_millis(10);
    config
}

fn hands_of(notation: [&str; 4]) -> Hands {
    Hands::from_pbn(&format!("N:{}", notation.join(" "))).unwrap()
}

fn load_hands(dir: &Path) -> HandStore {
    HandStore::load(StoreSettings::new(dir).hands_path()).unwrap()
}

fn load_results(dir: &Path) -> ResultStore {
    ResultStore::load(StoreSettings::new(dir).board_results_path()).unwrap()
}

fn load_registry(dir: &Path) -> EventRegistry {
    let index = TournamentIndex::load(StoreSettings::new(dir).tournament_index_path()).unwrap();
    EventRegistry::from_index(&index).unwrap()
}

fn store_bytes(dir: &Path) -> Vec<Vec<u8>> {
    let settings = StoreSettings::new(dir);
    [
        settings.tournament_index_path(),
        settings.hands_path(),
        settings.board_results_path(),
    ]
    .iter()
    .map(|path| fs::read(path).unwrap())
    .collect()
}

fn single_mp_event(urls: &SourceUrls) -> ScriptedSource {
    let id = EventId::new("404377");
    let mut source = ScriptedSource::default();
    source.serve(urls.calendar(), calendar_page(&[(4, "404377", "Pazar Simultane")]));
    source.serve(urls.event_results(&id), mp_roster_page("Pazar Simultane", 4, 15));
    serve_mp_board(&mut source, urls, &id, 1, 15, Some(DEAL_A));
    source
}

// --- Scenarios ---

#[tokio::test]
async fn test_single_matchpoint_event_is_ingested_and_enriched() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let pipeline = Pipeline::new(single_mp_event(&urls), FixedSolver::new(), config(dir.path(), 3)).unwrap();

    let report = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.new_events, 1);
    assert_eq!(report.boards_fetched, 1);
    assert_eq!(report.deals_enriched, 1);
    assert!(report.unfetched.is_empty());

    let key = BoardKey::new(EventId::new("404377"), 1);
    let hands = load_hands(dir.path());
    assert_eq!(hands.len(), 1);
    let deal = hands.get(&key).unwrap();
    assert_eq!(deal.dealer, Seat::N);
    assert_eq!(deal.vulnerability, Vulnerability::None);
    assert_eq!(deal.date, Some(date(4)));
    assert!(deal.validate_cards().is_ok());
    assert!(deal.is_enriched());
    assert_eq!(deal.optimum().unwrap().declarer, Some(Direction::NS));

    let results = load_results(dir.path());
    let board = results.get(&key).unwrap();
    assert_eq!(board.scoring, ScoringVariant::MP);
    assert_eq!(board.results.len(), 30);
    for direction in Direction::BOTH {
        let mut ranks: Vec<u32> = board.rows_for(direction).map(|r| r.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (1..=15).collect::<Vec<u32>>());
        let best = board.rows_for(direction).find(|r| r.rank == 1).unwrap();
        assert!(board.rows_for(direction).all(|r| r.percent <= best.percent));

        let prefix = if direction == Direction::NS { "NS" } else { "EW" };
        let mut names: Vec<String> = board.rows_for(direction).map(|r| r.pair_names.clone()).collect();
        names.sort();
        let mut roster: Vec<String> = (1..=15)
            .map(|n| format!("{prefix} Player{n}a - {prefix} Player{n}b"))
            .collect();
        roster.sort();
        assert_eq!(names, roster);
    }
    let pair_three = board
        .rows_for(Direction::EW)
        .find(|r| r.pair_names == "EW Player3a - EW Player3b")
        .unwrap();
    // Pair 3 sat at table 3, where NS scored the top.
    assert_eq!(pair_three.percent, 0.0);

    let status = StatusJournal::new(StoreSettings::new(dir.path()).status_path()).load().unwrap();
    assert!(status.unfetched.is_empty());
    assert_eq!(status.total_runs, 1);
    assert_eq!(status.last_mode.as_deref(), Some("quick"));
    assert!(status.last_result.unwrap().success);
}

#[tokio::test]
async fn test_second_quick_run_leaves_stores_untouched() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let solver = FixedSolver::new();
    let solver_calls = Arc::clone(&solver.calls);
    let pipeline = Pipeline::new(single_mp_event(&urls), solver, config(dir.path(), 3)).unwrap();

    pipeline.run_on(Mode::Quick, today()).await.unwrap();
    let before = store_bytes(dir.path());

    let report = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert!(report.success);
    assert_eq!(report.new_events, 0);
    assert_eq!(report.boards_fetched, 0);
    assert_eq!(report.deals_enriched, 0);
    assert_eq!(store_bytes(dir.path()), before);
    assert_eq!(solver_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_two_events_on_one_date_share_a_canonical_id() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let mut source = ScriptedSource::default();
    source.serve(
        urls.calendar(),
        calendar_page(&[(20, "405080", "Salı Simultane"), (20, "405081", "Salı Simultane B")]),
    );
    for (id, deal) in [("405080", DEAL_A), ("405081", DEAL_B)] {
        let id = EventId::new(id);
        source.serve(urls.event_results(&id), mp_roster_page("Salı Simultane", 20, 4));
        serve_mp_board(&mut source, &urls, &id, 1, 4, Some(deal));
    }
    let pipeline = Pipeline::new(source, FixedSolver::new(), config(dir.path(), 2)).unwrap();

    let report = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.new_events, 2);

    let registry = load_registry(dir.path());
    assert_eq!(registry.event_id_of(date(20)), Some(&EventId::new("405080")));
    assert_eq!(registry.events_on(date(20)).len(), 2);
    assert_eq!(registry.date_of(&EventId::new("405081")), Some(date(20)));

    let hands = load_hands(dir.path());
    assert!(hands.contains(&BoardKey::new(EventId::new("405080"), 1)));
    assert!(hands.contains(&BoardKey::new(EventId::new("405081"), 1)));
    assert!(registry.validate_hands(&hands).is_empty());
}

#[tokio::test]
async fn test_event_without_roster_keeps_its_own_deals() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let listed = EventId::new("405080");
    let rosterless = EventId::new("405081");
    let mut source = ScriptedSource::default();
    source.serve(
        urls.calendar(),
        calendar_page(&[(20, "405080", "Salı Simultane"), (20, "405081", "Salı Simultane B")]),
    );
    source.serve(urls.event_results(&listed), mp_roster_page("Salı Simultane", 20, 4));
    serve_mp_board(&mut source, &urls, &listed, 1, 4, Some(DEAL_A));
    serve_mp_board(&mut source, &urls, &rosterless, 1, 4, Some(DEAL_B));
    serve_mp_board(&mut source, &urls, &rosterless, 2, 4, Some(DEAL_A));
    let pipeline = Pipeline::new(source, FixedSolver::new(), config(dir.path(), 2)).unwrap();

    let first = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert!(!first.success);
    assert_eq!(first.unfetched.get(&rosterless), Some(&vec![1, 2]));
    assert!(first.errors.iter().any(|e| e.contains("405081: results page not found")));

    let second = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert_eq!(second.event_ids_fixed, 0);

    let registry = load_registry(dir.path());
    assert_eq!(registry.date_of(&rosterless), Some(date(20)));
    assert_eq!(registry.event_id_of(date(20)), Some(&listed));

    let hands = load_hands(dir.path());
    assert_eq!(hands.len(), 3);
    assert!(!hands.contains(&BoardKey::new(listed.clone(), 2)));
    let own = hands.get(&BoardKey::new(rosterless.clone(), 2)).unwrap();
    assert!(own.same_cards(&Deal::new(rosterless.clone(), 2, None, hands_of(DEAL_A))));
    assert!(registry.validate_hands(&hands).is_empty());

    // Lines that cannot be matched to a pair are never stored.
    let results = load_results(dir.path());
    assert!(results.has_rows(&BoardKey::new(listed, 1)));
    assert!(!results.has_rows(&BoardKey::new(rosterless, 1)));
}

#[tokio::test]
async fn test_solver_runs_off_the_runtime_thread() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let solver = FixedSolver::new();
    let threads = Arc::clone(&solver.threads);
    let pipeline = Pipeline::new(single_mp_event(&urls), solver, config(dir.path(), 1)).unwrap();

    let report = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert_eq!(report.deals_enriched, 1);
    let threads = threads.lock().unwrap();
    assert_eq!(threads.len(), 1);
    assert_ne!(threads[0], thread::current().id());
    assert!(load_hands(dir.path()).get(&BoardKey::new(EventId::new("404377"), 1)).unwrap().is_enriched());
}

#[tokio::test]
async fn test_team_event_records_negated_ew_imps() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let id = EventId::new("500100");
    let mut source = ScriptedSource::default();
    source.serve(urls.calendar(), calendar_page(&[(10, "500100", "Takımlar")]));
    source.serve(urls.event_results(&id), imp_roster_page("Takımlar", 10, 8));
    source.serve(urls.board_batch(&id, 1), imp_board_page(8, DEAL_A));
    let pipeline = Pipeline::new(source, FixedSolver::new(), config(dir.path(), 2)).unwrap();

    let report = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert!(report.success, "errors: {:?}", report.errors);

    let results = load_results(dir.path());
    let board = results.get(&BoardKey::new(id, 1)).unwrap();
    assert_eq!(board.scoring, ScoringVariant::IMP);
    assert_eq!(board.results.len(), 16);

    let ns: Vec<f64> = board.rows_for(Direction::NS).map(|r| r.percent).collect();
    let ew: Vec<f64> = board.rows_for(Direction::EW).map(|r| r.percent).collect();
    let mut ns_sorted = ns.clone();
    ns_sorted.sort_by(f64::total_cmp);
    let mut ew_negated: Vec<f64> = ew.iter().map(|v| -v).collect();
    ew_negated.sort_by(f64::total_cmp);
    assert_eq!(ns_sorted, ew_negated);
    assert!(board.results.iter().all(|r| r.contract == "-"));
    assert!(board.results.iter().all(|r| r.lead == "C5"));
    let mut table_three: Vec<&str> = board
        .results
        .iter()
        .filter(|r| r.pair_names.ends_with('3'))
        .map(|r| r.pair_names.as_str())
        .collect();
    table_three.sort_unstable();
    assert_eq!(table_three, vec!["East3 - West3", "North3 - South3"]);
}

#[tokio::test]
async fn test_transient_board_failures_are_retried() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let id = EventId::new("405080");
    let mut source = ScriptedSource::default();
    source.serve(urls.calendar(), calendar_page(&[(20, "405080", "Salı Simultane")]));
    source.serve(urls.event_results(&id), mp_roster_page("Salı Simultane", 20, 2));
    for board in 1..=30 {
        serve_mp_board(&mut source, &urls, &id, board, 2, None);
    }
    for board in [7, 19] {
        source.script(
            urls.board_batch(&id, board),
            vec![
                FetchOutcome::Unavailable(FetchFailure::Status(500)),
                FetchOutcome::Page(Page::new(urls.board_batch(&id, board), mp_board_page(2, None, 1))),
            ],
        );
    }
    let pipeline = Pipeline::new(source, FixedSolver::new(), config(dir.path(), 30)).unwrap();

    let report = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert!(report.success, "unfetched: {:?}", report.unfetched);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.boards_fetched, 30);
    assert!(report.errors.iter().any(|e| e.contains("board 7")));

    let results = load_results(dir.path());
    assert_eq!(results.boards_by_event().get(&id).map(Vec::len), Some(30));

    let status = StatusJournal::new(StoreSettings::new(dir.path()).status_path()).load().unwrap();
    assert!(status.unfetched.is_empty());
    assert_eq!(status.last_attempts, 2);
}

#[tokio::test]
async fn test_persistent_failure_is_left_for_the_next_run() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let id = EventId::new("405080");
    let mut source = ScriptedSource::default();
    source.serve(urls.calendar(), calendar_page(&[(20, "405080", "Salı Simultane")]));
    source.serve(urls.event_results(&id), mp_roster_page("Salı Simultane", 20, 2));
    serve_mp_board(&mut source, &urls, &id, 1, 2, None);
    source.script(
        urls.board_batch(&id, 2),
        vec![FetchOutcome::Unavailable(FetchFailure::Status(503))],
    );
    let pipeline = Pipeline::new(source, FixedSolver::new(), config(dir.path(), 2)).unwrap();

    let report = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert!(!report.success);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.unfetched.get(&id), Some(&vec![2]));

    let status = StatusJournal::new(StoreSettings::new(dir.path()).status_path()).load().unwrap();
    assert_eq!(status.unfetched.get("405080"), Some(&vec![2]));
    assert!(load_results(dir.path()).has_rows(&BoardKey::new(id, 1)));
}

#[tokio::test]
async fn test_legacy_only_event_is_not_an_inconsistency() {
    let dir = TempDir::new().unwrap();
    let settings = StoreSettings::new(dir.path());
    fs::write(
        settings.tournament_index_path(),
        r#"[{"Sıra": 1, "Tarih": "12.01.2026", "Oyuncu 1": "A", "Oyuncu 2": "B", "Skor": "61,2",
             "Direction": "NS", "Turnuva": "Pazartesi", "Link": "https://x/eventresults.php?event=999999"}]"#,
    )
    .unwrap();
    let mut hands = HandStore::load(settings.hands_path()).unwrap();
    hands.upsert(Deal::new(EventId::new("999999"), 1, Some(date(12)), hands_of(DEAL_A)));
    hands.save().unwrap();

    let urls = SourceUrls::new(BASE);
    let mut source = ScriptedSource::default();
    source.serve(urls.calendar(), calendar_page(&[]));
    let pipeline = Pipeline::new(source, FixedSolver::new(), config(dir.path(), 2)).unwrap();

    let report = pipeline.run_on(Mode::Full, today()).await.unwrap();
    assert_eq!(report.event_ids_fixed, 0);
    assert_eq!(report.validation.as_ref().map(|v| v.hand_issues), Some(0));

    let registry = load_registry(dir.path());
    assert_eq!(registry.event_id_of(date(12)), Some(&EventId::new("999999")));
    assert!(load_hands(dir.path()).contains(&BoardKey::new(EventId::new("999999"), 1)));
}

#[tokio::test]
async fn test_conflicting_refetch_keeps_stored_deal() {
    let dir = TempDir::new().unwrap();
    let settings = StoreSettings::new(dir.path());
    let key = BoardKey::new(EventId::new("404377"), 1);
    let marker = Enrichment {
        dd_analysis: TrickTable::from_rows([[7; 5], [6; 5], [7; 5], [6; 5]]),
        optimum: Optimum::pass_out(),
        lott: Lott {
            total_tricks: 13,
            ns_fit: Fit { suit: Suit::S, length: 7, tricks: 7 },
            ew_fit: Fit { suit: Suit::C, length: 7, tricks: 6 },
        },
    };
    let mut stored = Deal::new(EventId::new("404377"), 1, Some(date(4)), hands_of(DEAL_A));
    stored.set_enrichment(marker.clone());
    let mut hands = HandStore::load(settings.hands_path()).unwrap();
    hands.upsert(stored.clone());
    hands.save().unwrap();

    let urls = SourceUrls::new(BASE);
    let id = EventId::new("404377");
    let mut source = ScriptedSource::default();
    source.serve(urls.calendar(), calendar_page(&[(4, "404377", "Pazar Simultane")]));
    source.serve(urls.event_results(&id), mp_roster_page("Pazar Simultane", 4, 3));
    serve_mp_board(&mut source, &urls, &id, 1, 3, Some(DEAL_B));
    let solver = FixedSolver::new();
    let solver_calls = Arc::clone(&solver.calls);
    let pipeline = Pipeline::new(source, solver, config(dir.path(), 1)).unwrap();

    let report = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert!(report.errors.iter().any(|e| e.contains("card distribution differs")));
    assert_eq!(solver_calls.load(Ordering::SeqCst), 0);

    let hands = load_hands(dir.path());
    let deal = hands.get(&key).unwrap();
    assert!(deal.same_cards(&stored));
    assert_eq!(deal.dd_analysis(), Some(&marker.dd_analysis));
    assert_eq!(deal.lott(), Some(&marker.lott));
    assert!(load_results(dir.path()).has_rows(&key));
}

#[tokio::test]
async fn test_unreachable_calendar_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let mut source = ScriptedSource::default();
    source.script(urls.calendar(), vec![FetchOutcome::Unavailable(FetchFailure::Timeout)]);
    let pipeline = Pipeline::new(source, FixedSolver::new(), config(dir.path(), 1)).unwrap();

    let report = pipeline.run_on(Mode::Quick, today()).await.unwrap();
    assert!(!report.success);
    assert!(report.errors[0].starts_with("calendar:"));
}

#[tokio::test]
async fn test_regenerate_rankings_without_fetching() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let pipeline = Pipeline::new(single_mp_event(&urls), FixedSolver::new(), config(dir.path(), 2)).unwrap();
    pipeline.run_on(Mode::Quick, today()).await.unwrap();

    // The run already ranked and summarised everything.
    let report = pipeline.regenerate_rankings().unwrap();
    assert_eq!(report, RankingsReport::default());
    let results = load_results(dir.path());
    let summary = results.event_summary(&EventId::new("404377")).unwrap();
    assert_eq!(summary.ns_pairs, 15);
    assert_eq!(summary.date, Some(date(4)));
}

#[tokio::test]
async fn test_daemon_stops_when_shutdown_resolves() {
    let dir = TempDir::new().unwrap();
    let urls = SourceUrls::new(BASE);
    let pipeline = Pipeline::new(single_mp_event(&urls), FixedSolver::new(), config(dir.path(), 1)).unwrap();
    let driver = ScheduleDriver::new(pipeline);

    let iterations = driver.run_until(async {}).await.unwrap();
    assert!(iterations >= 1);

    let status = StatusJournal::new(StoreSettings::new(dir.path()).status_path()).load().unwrap();
    assert_eq!(status.total_runs, iterations as u64);
}
