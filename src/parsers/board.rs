use log::debug;
use scraper::Html;

use super::SourceParser;
use super::text::{Cell, collapse_whitespace, fold_turkish, parse_decimal, parse_score};
use crate::domain::{Direction, EMPTY_CELL, PairResult, ScoringVariant, Seat};

/// Row classes the site uses for the querying pair's line.
const HIGHLIGHT_CLASSES: [&str; 3] = ["fantastic", "resultspecial", "resultsimportant"];
/// Row classes of ordinary result lines.
const RESULT_CLASSES: [&str; 4] = ["results", "fantastic", "resultspecial", "resultsimportant"];
/// First-cell texts of header-like rows inside the results table.
const HEADER_TEXTS: [&str; 6] = ["kontrat", "contract", "atak", "lead", "k - g", "d - b"];
/// Contract cells the server emits for unplayed boards.
const INVALID_CONTRACTS: [&str; 3] = ["", "-", "-6"];

/// Rows decoded from one board page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardRows {
    pub scoring: ScoringVariant,
    pub rows: Vec<PairResult>,
}

impl BoardRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decoded line of the results table, before a direction is chosen.
struct Line {
    contract: String,
    declarer: Option<Seat>,
    result: String,
    lead: String,
    ns_score: Option<i32>,
    ew_score: Option<i32>,
    ns_value: f64,
    ew_value: f64,
}

impl Line {
    fn for_direction(&self, direction: Direction, pair_names: String) -> PairResult {
        let (score, percent) = match direction {
            Direction::NS => (self.ns_score.or(self.ew_score.map(|s| -s)), self.ns_value),
            Direction::EW => (self.ew_score.or(self.ns_score.map(|s| -s)), self.ew_value),
        };
        PairResult {
            pair_names,
            direction,
            contract: self.contract.clone(),
            declarer: self.declarer,
            result: self.result.clone(),
            lead: self.lead.clone(),
            score,
            percent,
            rank: 0,
        }
    }
}

impl SourceParser {
    /// The querying pair's line(s) from a per-pair board page, seen from
    /// `direction`. `pair_names` is taken from the page heading when present
    /// and left empty otherwise.
    pub fn parse_board_results(&self, html: &str, direction: Direction) -> BoardRows {
        let document = Html::parse_document(html);
        let Some((scoring, rows)) = self.result_rows(&document) else {
            return BoardRows::default();
        };
        let names = self.heading_pair_names(&document).unwrap_or_default();

        let rows = rows
            .iter()
            .filter(|cells| cells.iter().any(|c| c.has_class(&HIGHLIGHT_CLASSES)))
            .filter_map(|cells| self.decode_line(scoring, cells))
            .map(|line| line.for_direction(direction, names.clone()))
            .collect();

        BoardRows { scoring, rows }
    }

    /// Every table's line from a board page, in table order: an NS result
    /// then an EW result per table. The page does not say which pair sat at
    /// which table, so `pair_names` is left empty for the caller to fill.
    pub fn parse_board_batch(&self, html: &str) -> BoardRows {
        let document = Html::parse_document(html);
        let Some((scoring, rows)) = self.result_rows(&document) else {
            return BoardRows::default();
        };

        let rows = rows
            .iter()
            .filter(|cells| is_result_line(cells))
            .filter_map(|cells| self.decode_line(scoring, cells))
            .flat_map(|line| {
                [
                    line.for_direction(Direction::NS, String::new()),
                    line.for_direction(Direction::EW, String::new()),
                ]
            })
            .collect();

        BoardRows { scoring, rows }
    }

    /// Names in a heading like `14:00 ... Ali - Veli ... Bord 3`.
    pub fn heading_pair_names(&self, document: &Html) -> Option<String> {
        document.select(&self.heading).find_map(|h| {
            let text = collapse_whitespace(&h.text().collect::<String>());
            self.pair_heading_regex
                .captures(&text)
                .map(|c| c[1].trim().to_string())
                .filter(|names| !names.is_empty())
        })
    }

    /// Rows from the first result line on, with the scoring variant implied
    /// by the labelled row just above it: `Atak` means IMP, anything else MP.
    fn result_rows(&self, document: &Html) -> Option<(ScoringVariant, Vec<Vec<Cell>>)> {
        let rows: Vec<Vec<Cell>> = document
            .select(&self.rows)
            .map(|row| row.select(&self.cells).map(Cell::from_element).collect())
            .collect();

        let Some(first_line) = rows.iter().position(|cells| is_result_line(cells)) else {
            debug!("No result lines on board page");
            return None;
        };
        let Some(label) = rows[..first_line].iter().rev().find_map(|cells| header_label(cells)) else {
            debug!("No results header on board page");
            return None;
        };
        let scoring = if label == "atak" {
            ScoringVariant::IMP
        } else {
            ScoringVariant::MP
        };

        let rows = rows
            .into_iter()
            .skip(first_line)
            .filter(|cells| {
                cells.first().is_some_and(|first| {
                    let text = fold_turkish(&first.text);
                    !(text.is_empty() && !first.has_image) && !HEADER_TEXTS.contains(&text.as_str())
                })
            })
            .collect();
        Some((scoring, rows))
    }

    fn decode_line(&self, scoring: ScoringVariant, cells: &[Cell]) -> Option<Line> {
        match scoring {
            ScoringVariant::MP => self.decode_mp_line(cells),
            ScoringVariant::IMP => decode_imp_line(cells),
        }
    }

    /// `Contract | Declarer | Result | [Lead] | NS | EW | NS% | EW%`
    fn decode_mp_line(&self, cells: &[Cell]) -> Option<Line> {
        let (contract, declarer, result, lead, rest) = match cells.len() {
            n if n >= 8 => (&cells[0], &cells[1], &cells[2], Some(&cells[3]), &cells[4..8]),
            7 => (&cells[0], &cells[1], &cells[2], None, &cells[3..7]),
            _ => return None,
        };

        let contract_text = if contract.has_image && contract.text.is_empty() {
            String::new()
        } else {
            contract.text.clone()
        };
        if INVALID_CONTRACTS.contains(&contract_text.as_str()) {
            return None;
        }

        let ns_value = parse_decimal(&rest[2].text);
        let ew_value = parse_decimal(&rest[3].text);
        let (ns_value, ew_value) = match (ns_value, ew_value) {
            (Some(ns), Some(ew)) => (ns, ew),
            (Some(ns), None) => {
                debug!("EW% missing, deriving from NS% {}", ns);
                (ns, 100.0 - ns)
            }
            (None, Some(ew)) => (100.0 - ew, ew),
            (None, None) => return None,
        };

        Some(Line {
            contract: self.normalize_contract(&contract_text),
            declarer: seat_letter(&declarer.text),
            result: or_dash(&result.text),
            lead: lead.map(|c| or_dash(&c.text)).unwrap_or_else(|| EMPTY_CELL.to_string()),
            ns_score: parse_score(&rest[0].text),
            ew_score: parse_score(&rest[1].text),
            ns_value,
            ew_value,
        })
    }

    /// `4 S X`, `3SA`, `2nt` → `4SX`, `3NT`, `2NT`; anything else is kept.
    fn normalize_contract(&self, text: &str) -> String {
        let compact: String = text.split_whitespace().collect();
        match self.contract_regex.captures(&compact) {
            Some(c) => {
                let strain = match c[2].to_uppercase().as_str() {
                    "NT" | "SA" | "N" => "NT".to_string(),
                    other => other.to_string(),
                };
                format!("{}{}{}", &c[1], strain, c[3].to_uppercase())
            }
            None => compact,
        }
    }
}

/// `Lead | ... | NS-score | IMP`: the last two filled cells carry the
/// numbers, the first carries the lead.
fn decode_imp_line(cells: &[Cell]) -> Option<Line> {
    let filled: Vec<&Cell> = cells.iter().filter(|c| !c.is_blank()).collect();
    let [.., score_cell, imp_cell] = filled.as_slice() else {
        return None;
    };
    let imp = parse_decimal(&imp_cell.text)?;
    let ns_score = parse_score(&score_cell.text);
    let lead = cells
        .first()
        .filter(|c| filled.len() > 2 && !std::ptr::eq(*c, *score_cell))
        .map(|c| or_dash(&c.text))
        .unwrap_or_else(|| EMPTY_CELL.to_string());

    Some(Line {
        contract: EMPTY_CELL.to_string(),
        declarer: None,
        result: EMPTY_CELL.to_string(),
        lead,
        ns_score,
        ew_score: ns_score.map(|s| -s),
        ns_value: imp,
        ew_value: -imp,
    })
}

fn is_result_line(cells: &[Cell]) -> bool {
    cells.first().is_some_and(|c| c.has_class(&RESULT_CLASSES))
}

/// Folded first-cell text of a plain labelled row: no result classes and no
/// suit icons, so hand diagrams never pass for a header.
fn header_label(cells: &[Cell]) -> Option<String> {
    let first = cells.first()?;
    if first.has_image || cells.iter().any(|c| c.has_class(&RESULT_CLASSES)) {
        return None;
    }
    let text = fold_turkish(&first.text);
    (!text.is_empty()).then_some(text)
}

/// Seat from an English or Turkish letter (K/G/D/B).
fn seat_letter(text: &str) -> Option<Seat> {
    match text.trim().chars().next()?.to_ascii_uppercase() {
        'N' | 'K' => Some(Seat::N),
        'E' | 'D' => Some(Seat::E),
        'S' | 'G' => Some(Seat::S),
        'W' | 'B' => Some(Seat::W),
        _ => None,
    }
}

fn or_dash(text: &str) -> String {
    if text.trim().is_empty() {
        EMPTY_CELL.to_string()
    } else {
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// MP board page with `rows` tables; table 1 is highlighted.
    fn mp_board_page(rows: usize, with_lead: bool) -> String {
        let header = if with_lead {
            "<tr><td>Kontrat</td><td>Dekl.</td><td>Sonuç</td><td>Atak</td><td>K-G</td><td>D-B</td><td>K-G %</td><td>D-B %</td></tr>"
        } else {
            "<tr><td>Kontrat</td><td>Dekl.</td><td>Sonuç</td><td>K-G</td><td>D-B</td><td>K-G %</td><td>D-B %</td></tr>"
        };
        let body: String = (0..rows)
            .map(|i| {
                let class = if i == 0 { "fantastic" } else { "results" };
                let ns_pct = 100.0 * i as f64 / (rows.max(2) - 1) as f64;
                let lead = if with_lead {
                    r#"<td class="results"><img alt="heart">K</td>"#
                } else {
                    ""
                };
                let (ns, ew) = if i % 2 == 0 { ("420", "") } else { ("", "50") };
                format!(
                    r#"<tr><td class="{class}">4<img alt="spade"></td><td class="results">N</td><td class="results">=</td>{lead}<td class="results">{ns}</td><td class="results">{ew}</td><td class="results">{ns_pct:.1}</td><td class="results">{:.1}</td></tr>"#,
                    100.0 - ns_pct
                )
            })
            .collect();
        format!(
            r#"<html><body><h3>14:00 ... Ali Veli - Ayşe Kaya ... Bord 1</h3><table>{header}{body}</table></body></html>"#
        )
    }

    fn imp_board_page(tables: usize) -> String {
        let body: String = (1..=tables)
            .map(|t| {
                let imp = if t % 2 == 0 { format!("{}.0", t) } else { format!("-{}.5", t) };
                format!(
                    r#"<tr><td class="results"><img alt="club">{t}</td><td class="results"></td><td class="results">{}</td><td class="results">{imp}</td></tr>"#,
                    if t % 2 == 0 { 100 * t as i32 } else { -(50 * t as i32) }
                )
            })
            .collect();
        format!(r#"<html><body><table><tr><th>Atak</th><th></th><th>K-G</th><th>IMP</th></tr>{body}</table></body></html>"#)
    }

    #[test]
    fn test_batch_mp_eight_columns() {
        let rows = SourceParser::new().unwrap().parse_board_batch(&mp_board_page(15, true));
        assert_eq!(rows.scoring, ScoringVariant::MP);
        assert_eq!(rows.rows.len(), 30);

        assert!(rows.rows.iter().all(|r| r.pair_names.is_empty()));

        let first_ns = &rows.rows[0];
        assert_eq!(first_ns.contract, "4S");
        assert_eq!(first_ns.declarer, Some(Seat::N));
        assert_eq!(first_ns.lead, "HK");
        assert_eq!(first_ns.score, Some(420));
        assert_eq!(first_ns.percent, 0.0);

        let first_ew = &rows.rows[1];
        assert_eq!(first_ew.direction, Direction::EW);
        assert_eq!(first_ew.score, Some(-420));
        assert_eq!(first_ew.percent, 100.0);

        let second_ns = &rows.rows[2];
        assert_eq!(second_ns.score, Some(-50));
    }

    #[test]
    fn test_seven_columns_have_no_lead() {
        let rows = SourceParser::new().unwrap().parse_board_batch(&mp_board_page(3, false));
        assert_eq!(rows.rows.len(), 6);
        assert!(rows.rows.iter().all(|r| r.lead == "-"));
        assert_eq!(rows.rows[2].percent, 50.0);
    }

    #[test]
    fn test_ew_percent_read_directly() {
        let html = r#"<table><tr><td>Kontrat</td></tr>
            <tr><td class="fantastic">3NT</td><td>S</td><td>+1</td><td>-</td><td>630</td><td></td><td>62.4</td><td>37.7</td></tr>
            </table>"#;
        let rows = SourceParser::new().unwrap().parse_board_results(html, Direction::EW);
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0].percent, 37.7);
        assert_eq!(rows.rows[0].score, Some(-630));
        assert_eq!(rows.rows[0].contract, "3NT");
        assert_eq!(rows.rows[0].declarer, Some(Seat::S));
    }

    #[test]
    fn test_ew_percent_fallback() {
        let html = r#"<table><tr><td>Kontrat</td></tr>
            <tr><td class="fantastic">2H</td><td>E</td><td>=</td><td>SA</td><td></td><td>110</td><td>40</td><td></td></tr>
            </table>"#;
        let rows = SourceParser::new().unwrap().parse_board_results(html, Direction::EW);
        assert_eq!(rows.rows[0].percent, 60.0);
        assert_eq!(rows.rows[0].score, Some(110));
    }

    #[test]
    fn test_invalid_contracts_dropped() {
        let html = r#"<table><tr><td>Kontrat</td></tr>
            <tr><td class="fantastic">-6</td><td></td><td></td><td></td><td></td><td></td><td>50</td><td>50</td></tr>
            <tr><td class="fantastic"></td><td></td><td></td><td></td><td></td><td></td><td>50</td><td>50</td></tr>
            <tr><td class="fantastic">-</td><td></td><td></td><td></td><td></td><td></td><td>50</td><td>50</td></tr>
            </table>"#;
        let parser = SourceParser::new().unwrap();
        assert!(parser.parse_board_results(html, Direction::NS).is_empty());
        assert!(parser.parse_board_batch(html).is_empty());
    }

    #[test]
    fn test_per_pair_view_uses_highlight_and_heading() {
        let rows = SourceParser::new()
            .unwrap()
            .parse_board_results(&mp_board_page(5, true), Direction::NS);
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0].pair_names, "Ali Veli - Ayşe Kaya");
    }

    #[test]
    fn test_imp_rows_are_signed() {
        let rows = SourceParser::new().unwrap().parse_board_batch(&imp_board_page(8));
        assert_eq!(rows.scoring, ScoringVariant::IMP);
        assert_eq!(rows.rows.len(), 16);

        let ns1 = &rows.rows[0];
        let ew1 = &rows.rows[1];
        assert_eq!(ns1.percent, -1.5);
        assert_eq!(ew1.percent, 1.5);
        assert_eq!(ns1.score, Some(-50));
        assert_eq!(ew1.score, Some(50));
        assert_eq!(ns1.contract, "-");
        assert_eq!(ns1.declarer, None);
        assert_eq!(ns1.lead, "C1");
    }

    #[test]
    fn test_any_other_header_label_means_matchpoints() {
        let html = r#"<table class="bridgetable"><tr><td class="oyuncu"><b>West</b><br><img alt="spade"> AK2</td></tr></table>
            <table><tr><th>Sözleşme</th><th>Oyuncu</th><th>Sonuç</th><th>Atak</th><th>K-G</th><th>D-B</th><th>K-G %</th><th>D-B %</th></tr>
            <tr><td class="results">3NT</td><td class="results">S</td><td class="results">=</td><td class="results">SA</td><td class="results">400</td><td class="results"></td><td class="results">75</td><td class="results">25</td></tr>
            </table>"#;
        let rows = SourceParser::new().unwrap().parse_board_batch(html);
        assert_eq!(rows.scoring, ScoringVariant::MP);
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(rows.rows[0].percent, 75.0);
        assert_eq!(rows.rows[1].score, Some(-400));
    }

    #[test]
    fn test_result_lines_without_header_are_ignored() {
        let html = r#"<table>
            <tr><td class="results">3NT</td><td class="results">S</td><td class="results">=</td><td class="results">SA</td><td class="results">400</td><td class="results"></td><td class="results">75</td><td class="results">25</td></tr>
            </table>"#;
        assert!(SourceParser::new().unwrap().parse_board_batch(html).is_empty());
    }

    #[test]
    fn test_contract_normalization() {
        let parser = SourceParser::new().unwrap();
        assert_eq!(parser.normalize_contract("3 SA"), "3NT");
        assert_eq!(parser.normalize_contract("4Sx"), "4SX");
        assert_eq!(parser.normalize_contract("Pas"), "Pas");
    }

    #[test]
    fn test_page_without_results_table() {
        let parser = SourceParser::new().unwrap();
        assert!(parser.parse_board_batch("<html><body>Page not Found</body></html>").is_empty());
    }
}
