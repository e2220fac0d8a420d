use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use scraper::Html;

use super::SourceParser;
use super::text::{collapse_whitespace, fold_turkish};
use crate::domain::{CalendarEvent, CalendarListing, EventDate, EventId};

/// Month names as they appear in calendar headers, already folded to ASCII.
const MONTHS: [(&str, u32); 24] = [
    ("ocak", 1),
    ("subat", 2),
    ("mart", 3),
    ("nisan", 4),
    ("mayis", 5),
    ("haziran", 6),
    ("temmuz", 7),
    ("agustos", 8),
    ("eylul", 9),
    ("ekim", 10),
    ("kasim", 11),
    ("aralik", 12),
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

impl SourceParser {
    /// Events per day from a calendar page. `today` only supplies the year
    /// when the header shows a month without one.
    pub fn parse_calendar(&self, html: &str, today: NaiveDate) -> CalendarListing {
        let document = Html::parse_document(html);
        let mut listing = CalendarListing::new();

        let Some((month, year)) = self.calendar_month(&document, today) else {
            warn!("Calendar header has no recognisable month; ignoring page");
            return listing;
        };

        for day_cell in document.select(&self.day_cell) {
            let Some(day) = self.day_number_of(day_cell) else {
                continue;
            };
            let Some(date) = EventDate::from_ymd(year, month, day) else {
                debug!("Skipping impossible date {}-{}-{}", year, month, day);
                continue;
            };

            for link in day_cell.select(&self.event_link) {
                let Some(id) = link.value().attr("href").and_then(|h| self.event_id_in(h)) else {
                    continue;
                };
                let entries = listing.entry(date).or_default();
                let id = EventId::new(id);
                if entries.iter().any(|e| e.id == id) {
                    continue;
                }
                let name = collapse_whitespace(&link.text().collect::<String>());
                entries.push(CalendarEvent { id, name });
            }
        }

        listing
    }

    fn calendar_month(&self, document: &Html, today: NaiveDate) -> Option<(u32, i32)> {
        for header in document.select(&self.calendar_header) {
            let text = header.text().collect::<String>();
            if let Some(month) = month_in(&text) {
                let year = self
                    .year_regex
                    .captures(&text)
                    .and_then(|c| c[1].parse().ok())
                    .unwrap_or_else(|| today.year());
                return Some((month, year));
            }
        }
        None
    }

    fn day_number_of(&self, day_cell: scraper::ElementRef<'_>) -> Option<u32> {
        let text = match day_cell.select(&self.day_number).next() {
            Some(inner) => inner.text().collect::<String>(),
            None => day_cell.text().collect::<String>(),
        };
        let digits: String = text
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok().filter(|d| (1..=31).contains(d))
    }
}

/// First month name found among the words of `text`.
fn month_in(text: &str) -> Option<u32> {
    let folded = fold_turkish(text);
    folded
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .find_map(|word| MONTHS.iter().find(|(name, _)| *name == word).map(|(_, m)| *m))
}
