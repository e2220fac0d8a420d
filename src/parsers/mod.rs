//! Pure HTML decoders for the results site. Nothing here performs I/O.

pub mod board;
pub mod calendar;
pub mod hands;
pub mod roster;
pub mod text;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use scraper::Selector;

pub use board::BoardRows;

/// Compiled selectors and patterns shared by the page decoders.
pub struct SourceParser {
    rows: Selector,
    cells: Selector,
    heading: Selector,
    calendar_header: Selector,
    day_cell: Selector,
    day_number: Selector,
    event_link: Selector,
    colored_table: Selector,
    bridge_table: Selector,
    player_cell: Selector,
    event_id_regex: Regex,
    year_regex: Regex,
    heading_date_regex: Regex,
    pair_heading_regex: Regex,
    contract_regex: Regex,
}

impl SourceParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            rows: selector("tr")?,
            cells: selector("td, th")?,
            heading: selector("h3")?,
            calendar_header: selector("th[colspan], td.banner, caption")?,
            day_cell: selector("td.days")?,
            day_number: selector("td.days2")?,
            event_link: selector("a[href*='event=']")?,
            colored_table: selector("table.colored")?,
            bridge_table: selector("table.bridgetable")?,
            player_cell: selector("td.oyuncu")?,
            event_id_regex: compile(r"event=(\d+)")?,
            year_regex: compile(r"\b(20\d{2})\b")?,
            heading_date_regex: compile(r"(\d{2})-(\d{2})-(\d{4})")?,
            pair_heading_regex: compile(r"\d{2}:\d{2}\s*\.\.\.\s*(.+?)\s*\.\.\.\s*(?:Bord|Masa)")?,
            contract_regex: compile(r"(?i)^([1-7])\s*(NT|SA|N|S|H|D|C)\s*(X{0,2})$")?,
        })
    }

    /// Event id inside a link such as `eventresults.php?event=404377`.
    pub fn event_id_in(&self, text: &str) -> Option<String> {
        self.event_id_regex
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{}': {:?}", css, e))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("Failed to compile regex {}", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_extraction() {
        let parser = SourceParser::new().unwrap();
        assert_eq!(
            parser.event_id_in("https://clubs.vugraph.com/hosgoru/eventresults.php?event=999999"),
            Some("999999".to_string())
        );
        assert_eq!(parser.event_id_in("calendar.php?month=1"), None);
    }
}
