use log::debug;
use scraper::{ElementRef, Html, Node};
use std::collections::BTreeMap;

use super::SourceParser;
use crate::domain::cards::{normalize_ranks, rank_value};
use crate::domain::{Hand, Seat, Suit};

/// Visual order of the player cells in the bridge table.
pub const CELL_SEATS: [Seat; 4] = [Seat::W, Seat::N, Seat::E, Seat::S];

impl SourceParser {
    /// Hands shown in the page's bridge table, keyed by seat. Seats whose
    /// cell carries no suit icons are left out.
    pub fn parse_hand_cells(&self, html: &str) -> BTreeMap<Seat, Hand> {
        let document = Html::parse_document(html);
        let mut hands = BTreeMap::new();

        let Some(table) = document.select(&self.bridge_table).next() else {
            return hands;
        };

        for (cell, seat) in table.select(&self.player_cell).zip(CELL_SEATS) {
            match read_hand(cell) {
                Some(hand) => {
                    hands.insert(seat, hand);
                }
                None => debug!("No readable hand in cell for seat {}", seat),
            }
        }
        hands
    }
}

/// Walk the cell in document order; text after a suit icon belongs to that
/// suit until the next icon or the first non-rank text.
fn read_hand(cell: ElementRef<'_>) -> Option<Hand> {
    let mut groups: [String; 4] = Default::default();
    let mut current: Option<Suit> = None;
    let mut seen_icon = false;

    for node in cell.descendants() {
        match node.value() {
            Node::Element(e) if e.name() == "img" => {
                current = e.attr("alt").and_then(Suit::from_icon_alt);
                seen_icon |= current.is_some();
            }
            Node::Text(text) => {
                let Some(suit) = current else {
                    continue;
                };
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if is_rank_text(trimmed) {
                    groups[suit.index()].push_str(trimmed);
                } else {
                    current = None;
                }
            }
            _ => {}
        }
    }

    if !seen_icon {
        return None;
    }
    Hand::from_suit_strings([&groups[0], &groups[1], &groups[2], &groups[3]]).ok()
}

fn is_rank_text(text: &str) -> bool {
    let normalized = normalize_ranks(text);
    text.trim() == "-" || (!normalized.is_empty() && normalized.chars().all(|c| rank_value(c).is_some()))
}
