use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::collections::BTreeMap;

use super::urls::SourceUrls;
use crate::domain::{
    BoardKey, BoardResult, Deal, Direction, EventDate, EventId, EventInfo, FetchProgress, Hand,
    Hands, PairResult, PairRoster, ScoringVariant, Seat,
};
use crate::http::{FetchOutcome, Page, PageSource};
use crate::parsers::{BoardRows, SourceParser};
use crate::stores::{EventSummary, Stores, UpsertOutcome};

/// Event to fetch, with whatever the caller already knows about it.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTarget {
    pub id: EventId,
    pub name: String,
    pub date: Option<EventDate>,
}

/// What fetching one event achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFetchReport {
    pub event_id: EventId,
    pub boards_fetched: Vec<u32>,
    /// Boards that failed and should be retried.
    pub missing: Vec<u32>,
    /// Boards the site does not have.
    pub absent: Vec<u32>,
    pub hands_added: usize,
    pub hand_conflicts: Vec<u32>,
    pub errors: Vec<String>,
}

impl EventFetchReport {
    fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            boards_fetched: Vec::new(),
            missing: Vec::new(),
            absent: Vec::new(),
            hands_added: 0,
            hand_conflicts: Vec::new(),
            errors: Vec::new(),
        }
    }
}

enum BoardOutcome {
    Fetched {
        scoring: ScoringVariant,
        rows: Vec<PairResult>,
        hands: BTreeMap<Seat, Hand>,
    },
    /// Result lines were shown but none could be matched to a pair.
    Unnamed {
        hands: BTreeMap<Seat, Hand>,
        lines: usize,
    },
    Absent,
    Unavailable(String),
}

/// Fetches one event: roster, then each board's results and hands.
pub struct EventFetcher<'a, S: PageSource + ?Sized> {
    source: &'a S,
    parser: &'a SourceParser,
    urls: &'a SourceUrls,
    board_cap: u32,
    max_concurrent: usize,
}

impl<'a, S: PageSource + ?Sized> EventFetcher<'a, S> {
    pub fn new(
        source: &'a S,
        parser: &'a SourceParser,
        urls: &'a SourceUrls,
        board_cap: u32,
        max_concurrent: usize,
    ) -> Self {
        Self {
            source,
            parser,
            urls,
            board_cap,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetch `boards` (or `1..=board_cap` when `None`) of one event into the
    /// stores. Board failures are recorded in the report, never raised.
    pub async fn fetch_event(
        &self,
        target: &EventTarget,
        boards: Option<&[u32]>,
        stores: &mut Stores,
    ) -> EventFetchReport {
        let mut report = EventFetchReport::new(target.id.clone());

        // Step 1: roster and header
        let roster_url = self.urls.event_results(&target.id);
        let (roster, info, roster_ok) = match self.source.fetch(&roster_url).await {
            FetchOutcome::Page(page) => (
                self.parser.parse_event_roster(&page.body),
                self.parser.parse_event_info(&page.body),
                true,
            ),
            FetchOutcome::NotFound => {
                report.errors.push(format!("event {}: results page not found", target.id));
                (PairRoster::default(), EventInfo::default(), false)
            }
            FetchOutcome::Unavailable(failure) => {
                report.errors.push(format!("event {}: results page unavailable ({})", target.id, failure));
                (PairRoster::default(), EventInfo::default(), false)
            }
        };

        let date = target.date.or(info.date);
        let name = if target.name.is_empty() {
            info.name.clone().unwrap_or_default()
        } else {
            target.name.clone()
        };
        info!(
            "  → Event {} ({}): {} NS / {} EW pairs, {:?}",
            target.id,
            date.map(|d| d.to_string()).unwrap_or_else(|| "undated".to_string()),
            roster.ns_count,
            roster.ew_count,
            roster.scoring
        );

        // Indexed before any board is stored.
        if let Some(date) = date {
            if roster_ok {
                stores
                    .index
                    .record_event(&target.id, &name, date, &roster.standings, &roster_url);
            } else {
                stores.index.ensure_event(&target.id, &name, date);
            }
        }
        if roster_ok {
            stores.results.set_event_summary(
                &target.id,
                EventSummary {
                    name: name.clone(),
                    date,
                    ns_pairs: roster.ns_count,
                    ew_pairs: roster.ew_count,
                },
            );
        }

        // Step 2: boards, one at a time
        let boards: Vec<u32> = match boards {
            Some(list) => list.to_vec(),
            None => (1..=self.board_cap).collect(),
        };
        let mut progress = FetchProgress::new(boards.len());

        for board in boards {
            match self.fetch_board(&target.id, board, &roster).await {
                BoardOutcome::Fetched { scoring, rows, hands } => {
                    let hands_stored = self.store_hands(&target.id, board, date, &hands, stores, &mut report);
                    if rows.is_empty() {
                        if hands_stored {
                            report.missing.push(board);
                            progress.increment_failed();
                        } else {
                            report.absent.push(board);
                            progress.increment_absent();
                        }
                        continue;
                    }
                    stores
                        .results
                        .put(BoardResult::new(target.id.clone(), board, date, scoring, rows));
                    report.boards_fetched.push(board);
                    progress.increment_fetched();
                }
                BoardOutcome::Unnamed { hands, lines } => {
                    self.store_hands(&target.id, board, date, &hands, stores, &mut report);
                    report.errors.push(format!(
                        "event {} board {}: {} result lines without pair names",
                        target.id, board, lines
                    ));
                    report.missing.push(board);
                    progress.increment_failed();
                }
                BoardOutcome::Absent => {
                    debug!("Board {} of event {} not on the site", board, target.id);
                    report.absent.push(board);
                    progress.increment_absent();
                }
                BoardOutcome::Unavailable(reason) => {
                    warn!("Board {} of event {} unavailable: {}", board, target.id, reason);
                    report
                        .errors
                        .push(format!("event {} board {}: {}", target.id, board, reason));
                    report.missing.push(board);
                    progress.increment_failed();
                }
            }
        }

        info!(
            "  → Event {}: {} boards fetched, {} missing, {} new hands",
            target.id,
            progress.fetched(),
            report.missing.len(),
            report.hands_added
        );
        report
    }

    /// Upsert the deal if the page showed it. Returns whether a deal for the
    /// board is now stored.
    fn store_hands(
        &self,
        event_id: &EventId,
        board: u32,
        date: Option<EventDate>,
        parsed: &BTreeMap<Seat, Hand>,
        stores: &mut Stores,
        report: &mut EventFetchReport,
    ) -> bool {
        let key = BoardKey::new(event_id.clone(), board);
        if parsed.is_empty() {
            if !stores.hands.contains(&key) {
                debug!("No hands shown for {}", key);
            }
            return stores.hands.contains(&key);
        }

        let hands = match Hands::from_partial(parsed) {
            Ok(hands) => hands,
            Err(err) => {
                warn!("Unusable hands for {}: {}", key, err);
                report.errors.push(format!("{}: {}", key, err));
                return stores.hands.contains(&key);
            }
        };

        match stores.hands.upsert(Deal::new(event_id.clone(), board, date, hands)) {
            UpsertOutcome::Inserted => report.hands_added += 1,
            UpsertOutcome::Unchanged => {}
            UpsertOutcome::Conflict => {
                report.hand_conflicts.push(board);
                report.errors.push(format!("{}: card distribution differs from stored deal", key));
            }
        }
        true
    }

    // --- Board Pages ---

    async fn fetch_board(&self, event_id: &EventId, board: u32, roster: &PairRoster) -> BoardOutcome {
        let url = self.urls.board_batch(event_id, board);
        let page = match self.source.fetch(&url).await {
            FetchOutcome::Page(page) => page,
            FetchOutcome::NotFound => return BoardOutcome::Absent,
            FetchOutcome::Unavailable(failure) => return BoardOutcome::Unavailable(failure.to_string()),
        };

        let batch = self.parser.parse_board_batch(&page.body);
        let hands = self.parser.parse_hand_cells(&page.body);
        let scoring = batch.scoring;
        if let Some(rows) = name_by_table(batch, roster) {
            return BoardOutcome::Fetched { scoring, rows, hands };
        }

        debug!("Board {} of event {}: reading per-pair pages for pair names", board, event_id);
        self.fetch_per_pair(event_id, board, roster, page, hands).await
    }

    /// One page per roster pair. `batch` is the pair 1 NS page and is not
    /// requested again.
    async fn fetch_per_pair(
        &self,
        event_id: &EventId,
        board: u32,
        roster: &PairRoster,
        batch: Page,
        mut hands: BTreeMap<Seat, Hand>,
    ) -> BoardOutcome {
        let requests: Vec<(Direction, u32)> = Direction::BOTH
            .iter()
            .flat_map(|d| (1..=roster.count(*d)).map(move |pair| (*d, pair)))
            .filter(|request| *request != (Direction::NS, 1))
            .collect();
        let total = requests.len() + 1;

        let mut pages: Vec<((Direction, u32), FetchOutcome)> = stream::iter(requests)
            .map(|(direction, pair)| {
                let url = self.urls.board_details(event_id, pair, direction, board);
                async move { ((direction, pair), self.source.fetch(&url).await) }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        if roster.count(Direction::NS) > 0 {
            pages.push(((Direction::NS, 1), FetchOutcome::Page(batch)));
        }
        pages.sort_by_key(|(request, _)| *request);

        let mut scoring = None;
        let mut rows = Vec::new();
        let mut failures = Vec::new();
        let mut unnamed = 0;

        for ((direction, pair), outcome) in pages {
            let page = match outcome {
                FetchOutcome::Page(page) => page,
                FetchOutcome::NotFound => continue,
                FetchOutcome::Unavailable(failure) => {
                    failures.push(format!("pair {} {}: {}", pair, direction, failure));
                    continue;
                }
            };

            for (seat, hand) in self.parser.parse_hand_cells(&page.body) {
                hands.entry(seat).or_insert(hand);
            }

            let parsed = self.parser.parse_board_results(&page.body, direction);
            if parsed.is_empty() {
                continue;
            }
            scoring.get_or_insert(parsed.scoring);
            for mut row in parsed.rows {
                if row.pair_names.is_empty() {
                    match roster.name(direction, pair) {
                        Some(names) => row.pair_names = names.to_string(),
                        None => {
                            debug!("No name for pair {} {} on board {}; line dropped", pair, direction, board);
                            unnamed += 1;
                            continue;
                        }
                    }
                }
                rows.push(row);
            }
        }

        if let Some(first) = failures.first() {
            return BoardOutcome::Unavailable(format!(
                "{} of {} pair pages failed, first: {}",
                failures.len(),
                total,
                first
            ));
        }
        if rows.is_empty() && unnamed > 0 {
            return BoardOutcome::Unnamed { hands, lines: unnamed };
        }
        if rows.is_empty() && hands.is_empty() {
            return BoardOutcome::Absent;
        }
        BoardOutcome::Fetched {
            scoring: scoring.unwrap_or_default(),
            rows,
            hands,
        }
    }
}

/// Team boards list one line per table in table order, and a team roster
/// names both pairs by table number. Pair events give no such link, so
/// their batch lines cannot be named.
fn name_by_table(batch: BoardRows, roster: &PairRoster) -> Option<Vec<PairResult>> {
    if batch.is_empty() || batch.scoring != ScoringVariant::IMP || roster.scoring != ScoringVariant::IMP {
        return None;
    }
    batch
        .rows
        .into_iter()
        .enumerate()
        .map(|(i, mut row)| {
            let table = (i / 2) as u32 + 1;
            row.pair_names = roster.name(row.direction, table)?.to_string();
            Some(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreSettings;
    use crate::http::FetchFailure;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Serves fixed bodies by URL suffix; anything else is a 404.
    struct Pages(HashMap<String, FetchOutcome>);

    #[async_trait]
    impl PageSource for Pages {
        async fn fetch(&self, url: &str) -> FetchOutcome {
            self.0
                .iter()
                .find(|(suffix, _)| url.ends_with(suffix.as_str()))
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or(FetchOutcome::NotFound)
        }
    }

    fn page(body: &str) -> FetchOutcome {
        FetchOutcome::Page(Page::new("fixture", body))
    }

    fn roster_page() -> String {
        let block = |label: &str, prefix: &str| {
            format!(
                r#"<tr><td colspan="3">{label}</td></tr><tr><td>Sıra</td><td>Oyuncular</td><td>Skor</td></tr>
                   <tr><td>1</td><td>{prefix} One</td><td>55,0</td></tr><tr><td>2</td><td>{prefix} Two</td><td>45,0</td></tr>"#
            )
        };
        format!(
            r#"<html><body><h3>Pazar Simultane (04-01-2026 14:00)</h3><table class="colored">{}{}</table></body></html>"#,
            block("Kuzey - Güney", "NS"),
            block("Doğu - Batı", "EW")
        )
    }

    fn pair_page(percent: f64) -> String {
        format!(
            r#"<table><tr><td>Kontrat</td></tr>
               <tr><td class="fantastic">3NT</td><td>S</td><td>+1</td><td>-</td><td>630</td><td></td><td>{percent}</td><td>{}</td></tr>
               </table>"#,
            100.0 - percent
        )
    }

    #[tokio::test]
    async fn test_per_pair_fallback_and_failure_accounting() {
        let mut pages = HashMap::new();
        pages.insert("eventresults.php?event=1".to_string(), page(&roster_page()));
        // Board 1: the batch view has a header but no rows, so each pair
        // page is read on its own.
        pages.insert(
            "pair=1&direction=NS&board=1".to_string(),
            page("<table><tr><td>Kontrat</td></tr></table>"),
        );
        pages.insert(
            "pair=2&direction=NS&board=1".to_string(),
            page(&format!("<h3>14:00 ... Heading Names ... Bord 1</h3>{}", pair_page(40.0))),
        );
        pages.insert("pair=1&direction=EW&board=1".to_string(), page(&pair_page(30.0)));
        pages.insert("pair=2&direction=EW&board=1".to_string(), page(&pair_page(80.0)));
        // Board 2 fails outright.
        pages.insert(
            "pair=1&direction=NS&board=2".to_string(),
            FetchOutcome::Unavailable(FetchFailure::Status(503)),
        );
        let source = Pages(pages);

        let dir = TempDir::new().unwrap();
        let mut stores = Stores::open(&StoreSettings::new(dir.path())).unwrap();
        let parser = SourceParser::new().unwrap();
        let urls = SourceUrls::new("http://site");
        let fetcher = EventFetcher::new(&source, &parser, &urls, 3, 4);
        let target = EventTarget {
            id: "1".into(),
            name: String::new(),
            date: None,
        };

        let report = fetcher.fetch_event(&target, None, &mut stores).await;
        assert_eq!(report.boards_fetched, vec![1]);
        assert_eq!(report.missing, vec![2]);
        assert_eq!(report.absent, vec![3]);

        let result = stores.results.get(&BoardKey::new("1".into(), 1)).unwrap();
        assert_eq!(result.results.len(), 3);
        assert!(result.is_ranked());
        assert_eq!(result.date, EventDate::from_ymd(2026, 1, 4));
        let ns: Vec<&str> = result.rows_for(Direction::NS).map(|r| r.pair_names.as_str()).collect();
        assert_eq!(ns, vec!["Heading Names"]);
        let ew: Vec<&str> = result.rows_for(Direction::EW).map(|r| r.pair_names.as_str()).collect();
        assert_eq!(ew, vec!["EW One", "EW Two"]);

        let summary = stores.results.event_summary(&"1".into()).unwrap();
        assert_eq!(summary.ns_pairs, 2);
        assert!(summary.name.starts_with("Pazar Simultane"));
        assert!(stores.index.event(&"1".into()).is_some());
    }

    fn team_roster(tables: u32) -> PairRoster {
        PairRoster {
            ns_count: tables,
            ew_count: tables,
            ns_names: (1..=tables).map(|t| (t, format!("Home {t}"))).collect(),
            ew_names: (1..=tables).map(|t| (t, format!("Away {t}"))).collect(),
            scoring: ScoringVariant::IMP,
            standings: Vec::new(),
        }
    }

    fn team_lines(tables: u32) -> BoardRows {
        let html: String = (1..=tables)
            .map(|t| format!(r#"<tr><td class="results">SA</td><td class="results">{}</td><td class="results">{t}</td></tr>"#, 100 * t))
            .collect();
        SourceParser::new()
            .unwrap()
            .parse_board_batch(&format!("<table><tr><th>Atak</th><th>K-G</th><th>IMP</th></tr>{html}</table>"))
    }

    #[test]
    fn test_team_lines_take_names_by_table() {
        let rows = name_by_table(team_lines(2), &team_roster(2)).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.pair_names.as_str()).collect();
        assert_eq!(names, vec!["Home 1", "Away 1", "Home 2", "Away 2"]);
        assert_eq!(rows[3].percent, -2.0);
    }

    #[test]
    fn test_unnamed_lines_are_not_kept() {
        // A table the roster does not know.
        assert!(name_by_table(team_lines(3), &team_roster(2)).is_none());
        // Pair events cannot be matched by table.
        let mut roster = team_roster(2);
        roster.scoring = ScoringVariant::MP;
        assert!(name_by_table(team_lines(2), &roster).is_none());
    }
}
