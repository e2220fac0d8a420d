use log::debug;
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;

use super::SourceParser;
use super::text::{Cell, collapse_whitespace, fold_turkish};
use crate::domain::{
    Direction, EventDate, EventInfo, PairRoster, ScoringVariant, Standing,
    roster::DEFAULT_PAIR_COUNT,
};

impl SourceParser {
    /// Pair names from an event results page, in whichever of the two
    /// table layouts the page uses.
    pub fn parse_event_roster(&self, html: &str) -> PairRoster {
        let document = Html::parse_document(html);
        let rows = self.roster_rows(&document);

        if let Some(roster) = parse_imp_roster(&rows) {
            return roster;
        }
        if let Some(roster) = parse_mp_roster(&rows) {
            return roster;
        }

        debug!("No roster table recognised; assuming {} pairs per direction", DEFAULT_PAIR_COUNT);
        PairRoster::default()
    }

    /// Title and date from the page heading (`... (04-01-2026 14:00)`).
    pub fn parse_event_info(&self, html: &str) -> EventInfo {
        let document = Html::parse_document(html);
        let Some(heading) = document.select(&self.heading).next() else {
            return EventInfo::default();
        };
        let text = collapse_whitespace(&heading.text().collect::<String>());
        let date = self.heading_date_regex.captures(&text).and_then(|c| {
            let day = c[1].parse().ok()?;
            let month = c[2].parse().ok()?;
            let year = c[3].parse().ok()?;
            EventDate::from_ymd(year, month, day)
        });
        EventInfo {
            name: (!text.is_empty()).then_some(text),
            date,
        }
    }

    fn roster_rows(&self, document: &Html) -> Vec<Vec<Cell>> {
        let scope: Vec<ElementRef<'_>> = document.select(&self.colored_table).collect();
        let row_elements: Vec<ElementRef<'_>> = if scope.is_empty() {
            document.select(&self.rows).collect()
        } else {
            scope.iter().flat_map(|t| t.select(&self.rows)).collect()
        };

        row_elements
            .into_iter()
            .map(|row| row.select(&self.cells).map(Cell::from_element).collect())
            .collect()
    }
}

fn row_text(cells: &[Cell]) -> String {
    fold_turkish(
        &cells
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn leading_number(cell: Option<&Cell>) -> Option<u32> {
    let text = cell?.text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `Masa | Kuzey - Güney | IMP | Doğu - Batı`: one row per table.
fn parse_imp_roster(rows: &[Vec<Cell>]) -> Option<PairRoster> {
    let header = rows.iter().position(|cells| {
        let text = row_text(cells);
        text.contains("masa") && text.contains("kuzey") && text.contains("dogu")
    })?;

    let mut ns_names = BTreeMap::new();
    let mut ew_names = BTreeMap::new();
    for cells in &rows[header + 1..] {
        let Some(table) = leading_number(cells.first()) else {
            continue;
        };
        if cells.len() < 4 {
            continue;
        }
        ns_names.insert(table, cells[1].text.clone());
        ew_names.insert(table, cells[3].text.clone());
    }

    if ns_names.is_empty() {
        return None;
    }
    Some(PairRoster {
        ns_count: ns_names.len() as u32,
        ew_count: ew_names.len() as u32,
        ns_names,
        ew_names,
        scoring: ScoringVariant::IMP,
        standings: Vec::new(),
    })
}

/// Two blocks headed `Kuzey`/`North` and `Doğu`/`East`, each with
/// `Sıra | Pair | Score` rows.
fn parse_mp_roster(rows: &[Vec<Cell>]) -> Option<PairRoster> {
    let mut section: Option<Direction> = None;
    let mut ns_names = BTreeMap::new();
    let mut ew_names = BTreeMap::new();
    let mut standings = Vec::new();

    for cells in rows {
        if let Some(direction) = section_heading(cells) {
            section = Some(direction);
            continue;
        }
        let Some(direction) = section else {
            continue;
        };
        let first = fold_turkish(cells.first().map(|c| c.text.as_str()).unwrap_or(""));
        if first == "sira" || first == "rank" {
            continue;
        }
        let Some(number) = leading_number(cells.first()) else {
            continue;
        };
        let Some(name_cell) = cells.get(1) else {
            continue;
        };

        let names = name_cell.text.clone();
        match direction {
            Direction::NS => ns_names.insert(number, names.clone()),
            Direction::EW => ew_names.insert(number, names.clone()),
        };
        standings.push(Standing {
            rank: number,
            direction,
            names,
            score: cells.get(2).map(|c| c.text.clone()).unwrap_or_default(),
        });
    }

    if ns_names.is_empty() && ew_names.is_empty() {
        return None;
    }
    Some(PairRoster {
        ns_count: if ns_names.is_empty() { DEFAULT_PAIR_COUNT } else { ns_names.len() as u32 },
        ew_count: if ew_names.is_empty() { DEFAULT_PAIR_COUNT } else { ew_names.len() as u32 },
        ns_names,
        ew_names,
        scoring: ScoringVariant::MP,
        standings,
    })
}

/// A short row naming a direction block.
fn section_heading(cells: &[Cell]) -> Option<Direction> {
    if cells.len() > 2 {
        return None;
    }
    let text = row_text(cells);
    let is_ns = text.contains("kuzey") || text.contains("north");
    let is_ew = text.contains("dogu") || text.contains("east");
    match (is_ns, is_ew) {
        (true, false) => Some(Direction::NS),
        (false, true) => Some(Direction::EW),
        _ => None,
    }
}
