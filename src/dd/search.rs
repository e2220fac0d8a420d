//! Exhaustive double-dummy search.
//!
//! Each strain is searched with a null-window test ("can NS take at least
//! `t` more tricks?") driven by a binary search over `t`. Positions at trick
//! boundaries are cached as lower/upper bounds on the NS trick count.

use std::collections::HashMap;

use super::solver::{DoubleDummySolver, SolverError};
use crate::domain::{Direction, Hands, Seat, Strain, TrickTable};

const DEFAULT_TABLE_LIMIT: usize = 2_000_000;

/// Built-in solver; slow on full thirteen-card deals but needs no native
/// library.
pub struct SearchSolver {
    table_limit: usize,
}

impl Default for SearchSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSolver {
    pub fn new() -> Self {
        Self {
            table_limit: DEFAULT_TABLE_LIMIT,
        }
    }

    /// Cap on cached positions per strain; the cache is cleared when full.
    pub fn with_table_limit(table_limit: usize) -> Self {
        Self {
            table_limit: table_limit.max(1),
        }
    }
}

impl DoubleDummySolver for SearchSolver {
    fn solve(&self, pbn: &str) -> Result<TrickTable, SolverError> {
        let hands = Hands::from_pbn(pbn).map_err(|e| SolverError::InvalidDeal(e.to_string()))?;
        let masks = check_deal(&hands)?;
        let total = hands.get(Seat::N).card_count() as u8;

        let mut table = TrickTable::default();
        for strain in Strain::ALL {
            let mut search = Search::new(masks, strain.trump().map(|s| s.index()), self.table_limit);
            for declarer in Seat::ALL {
                let ns = search.ns_tricks(declarer.next().index(), total);
                let tricks = match declarer.direction() {
                    Direction::NS => ns,
                    Direction::EW => total - ns,
                };
                table.set(declarer, strain, tricks);
            }
        }
        Ok(table)
    }
}

fn check_deal(hands: &Hands) -> Result<[[u16; 4]; 4], SolverError> {
    let count = hands.get(Seat::N).card_count();
    if count == 0 {
        return Err(SolverError::InvalidDeal("no cards to play".to_string()));
    }
    for seat in Seat::ALL {
        let held = hands.get(seat).card_count();
        if held != count {
            return Err(SolverError::InvalidDeal(format!(
                "{} holds {} cards, North holds {}",
                seat, held, count
            )));
        }
    }

    let masks = Seat::ALL.map(|seat| hands.get(seat).masks());
    let mut seen = [0u16; 4];
    for hand in &masks {
        for (suit, holding) in hand.iter().enumerate() {
            if seen[suit] & holding != 0 {
                return Err(SolverError::InvalidDeal("a card is dealt twice".to_string()));
            }
            seen[suit] |= holding;
        }
    }
    Ok(masks)
}

fn is_ns(seat: usize) -> bool {
    seat % 2 == 0
}

fn top_bit(bits: u16) -> u16 {
    1 << (15 - bits.leading_zeros())
}

/// Ranks strictly between two single-bit cards.
fn between(low: u16, high: u16) -> u16 {
    (high - 1) & !((low << 1) - 1)
}

#[derive(Debug, Clone, Copy)]
struct Card {
    seat: usize,
    suit: usize,
    bit: u16,
}

fn beats(suit: usize, bit: u16, current: &Card, trump: Option<usize>) -> bool {
    if suit == current.suit {
        bit > current.bit
    } else {
        trump == Some(suit)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Trick {
    cards: [Option<Card>; 4],
    len: usize,
}

impl Trick {
    fn push(&mut self, card: Card) {
        self.cards[self.len] = Some(card);
        self.len += 1;
    }

    fn lead_suit(&self) -> Option<usize> {
        self.cards[0].map(|c| c.suit)
    }

    fn played_in(&self, suit: usize) -> u16 {
        self.cards
            .iter()
            .flatten()
            .filter(|c| c.suit == suit)
            .fold(0, |acc, c| acc | c.bit)
    }

    fn winning_card(&self, trump: Option<usize>) -> Option<Card> {
        self.cards.iter().flatten().fold(None, |best: Option<Card>, card| match best {
            Some(b) if !beats(card.suit, card.bit, &b, trump) => Some(b),
            _ => Some(*card),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    lower: u8,
    upper: u8,
}

type PositionKey = ([u64; 4], u8);

struct Search {
    hands: [[u16; 4]; 4],
    trump: Option<usize>,
    table: HashMap<PositionKey, Bounds>,
    table_limit: usize,
}

impl Search {
    fn new(hands: [[u16; 4]; 4], trump: Option<usize>, table_limit: usize) -> Self {
        Self {
            hands,
            trump,
            table: HashMap::new(),
            table_limit,
        }
    }

    fn ns_tricks(&mut self, leader: usize, total: u8) -> u8 {
        let (mut low, mut high) = (0u8, total);
        while low < high {
            let mid = (low + high).div_ceil(2);
            if self.reach(leader, mid) {
                low = mid;
            } else {
                high = mid - 1;
            }
        }
        low
    }

    fn remaining(&self) -> u8 {
        self.hands[0].iter().map(|m| m.count_ones()).sum::<u32>() as u8
    }

    fn key(&self, leader: usize) -> PositionKey {
        let packed = self.hands.map(|suits| {
            suits
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, m)| acc | ((*m as u64) << (16 * i)))
        });
        (packed, leader as u8)
    }

    fn record(&mut self, key: PositionKey, remaining: u8, lower: Option<u8>, upper: Option<u8>) {
        if self.table.len() >= self.table_limit && !self.table.contains_key(&key) {
            self.table.clear();
        }
        let bounds = self.table.entry(key).or_insert(Bounds {
            lower: 0,
            upper: remaining,
        });
        if let Some(lower) = lower {
            bounds.lower = bounds.lower.max(lower);
        }
        if let Some(upper) = upper {
            bounds.upper = bounds.upper.min(upper);
        }
    }

    /// Whether NS can take `target` of the remaining tricks with `leader`
    /// to lead.
    fn reach(&mut self, leader: usize, target: u8) -> bool {
        if target == 0 {
            return true;
        }
        let remaining = self.remaining();
        if target > remaining {
            return false;
        }

        let key = self.key(leader);
        if let Some(bounds) = self.table.get(&key) {
            if bounds.lower >= target {
                return true;
            }
            if bounds.upper < target {
                return false;
            }
        }

        let quick = self.quick_tricks(leader);
        if is_ns(leader) && quick >= target {
            self.record(key, remaining, Some(quick), None);
            return true;
        }
        if !is_ns(leader) && remaining - quick < target {
            self.record(key, remaining, None, Some(remaining - quick));
            return false;
        }

        let reached = self.play(leader, Trick::default(), target);
        if reached {
            self.record(key, remaining, Some(target), None);
        } else {
            self.record(key, remaining, None, Some(target - 1));
        }
        reached
    }

    fn play(&mut self, seat: usize, trick: Trick, target: u8) -> bool {
        let maximizing = is_ns(seat);
        for (suit, bit) in self.moves(seat, &trick) {
            let mut next = trick;
            next.push(Card { seat, suit, bit });
            self.hands[seat][suit] &= !bit;

            let reached = if next.len == 4 {
                match next.winning_card(self.trump) {
                    Some(winner) => {
                        let won = u8::from(is_ns(winner.seat));
                        self.reach(winner.seat, target.saturating_sub(won))
                    }
                    None => false,
                }
            } else {
                self.play((seat + 1) % 4, next, target)
            };

            self.hands[seat][suit] |= bit;
            if reached == maximizing {
                return reached;
            }
        }
        !maximizing
    }

    /// Legal cards, one per run of equivalent ranks. When following, cards
    /// that take the lead are tried first, cheapest first.
    fn moves(&self, seat: usize, trick: &Trick) -> Vec<(usize, u16)> {
        let hand = self.hands[seat];
        let suits: Vec<usize> = match trick.lead_suit().filter(|s| hand[*s] != 0) {
            Some(suit) => vec![suit],
            None => (0..4).filter(|s| hand[*s] != 0).collect(),
        };
        let current = trick.winning_card(self.trump);

        let mut winners = Vec::new();
        let mut others = Vec::new();
        for suit in suits {
            let occupied = self.hands.iter().fold(trick.played_in(suit), |acc, h| acc | h[suit]);
            let mut higher: Option<u16> = None;
            let mut rest = hand[suit];
            while rest != 0 {
                let card = top_bit(rest);
                rest &= !card;
                let distinct = higher.is_none_or(|h| occupied & between(card, h) != 0);
                higher = Some(card);
                if !distinct {
                    continue;
                }
                match &current {
                    Some(c) if beats(suit, card, c, self.trump) => winners.push((suit, card)),
                    _ => others.push((suit, card)),
                }
            }
        }

        if current.is_none() {
            return others;
        }
        winners.sort_by_key(|(_, bit)| *bit);
        others.sort_by_key(|(_, bit)| *bit);
        winners.extend(others);
        winners
    }

    /// Tricks the leader's side can cash straight off the top.
    fn quick_tricks(&self, leader: usize) -> u8 {
        let partner = (leader + 2) % 4;
        let lho = (leader + 1) % 4;
        let rho = (leader + 3) % 4;
        let opponents_can_ruff = self
            .trump
            .is_some_and(|t| self.hands[lho][t] | self.hands[rho][t] != 0);

        let mut count = 0;
        for suit in 0..4 {
            let mine = self.hands[leader][suit];
            if mine == 0 || (opponents_can_ruff && self.trump != Some(suit)) {
                continue;
            }
            let others = self.hands[lho][suit] | self.hands[rho][suit] | self.hands[partner][suit];
            let winners = if others == 0 {
                mine
            } else {
                mine & !((top_bit(others) << 1) - 1)
            };
            count += winners.count_ones();
        }
        count as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(table: &TrickTable, seat: Seat) -> [u8; 5] {
        Strain::ALL.map(|strain| table.get(seat, strain))
    }

    #[test]
    fn test_one_suit_per_hand() {
        let solver = SearchSolver::new();
        let table = solver
            .solve("N:AKQJT98765432... .AKQJT98765432.. ..AKQJT98765432. ...AKQJT98765432")
            .unwrap();
        // C, D, H, S, NT
        assert_eq!(row(&table, Seat::N), [0, 13, 0, 13, 0]);
        assert_eq!(row(&table, Seat::S), [0, 13, 0, 13, 0]);
        assert_eq!(row(&table, Seat::E), [13, 0, 13, 0, 0]);
        assert_eq!(row(&table, Seat::W), [13, 0, 13, 0, 0]);
    }

    #[test]
    fn test_ruffing_ending() {
        let solver = SearchSolver::new();
        let table = solver.solve("N:AK... .AK.. ..32. ...32").unwrap();
        assert_eq!(row(&table, Seat::N), [0, 2, 0, 2, 0]);
        assert_eq!(row(&table, Seat::E), [2, 0, 2, 0, 0]);
        assert_eq!(row(&table, Seat::S), [0, 2, 0, 2, 0]);
        assert_eq!(row(&table, Seat::W), [2, 0, 2, 0, 0]);
    }

    #[test]
    fn test_finesse_position_depends_on_leader() {
        let solver = SearchSolver::with_table_limit(16);
        let table = solver.solve("N:AQ... 65... 32... K4...").unwrap();
        for strain in Strain::ALL {
            assert_eq!(table.get(Seat::N, strain), 2);
            assert_eq!(table.get(Seat::S, strain), 2);
            assert_eq!(table.get(Seat::E, strain), 0);
            assert_eq!(table.get(Seat::W, strain), 1);
        }
    }

    #[test]
    fn test_rejects_uneven_or_duplicated_cards() {
        let solver = SearchSolver::new();
        assert!(matches!(
            solver.solve("N:AK... Q... 32... 54..."),
            Err(SolverError::InvalidDeal(_))
        ));
        assert!(matches!(
            solver.solve("N:A... A... 2... 3..."),
            Err(SolverError::InvalidDeal(_))
        ));
        assert!(matches!(solver.solve("N:AK... Q..."), Err(SolverError::InvalidDeal(_))));
    }
}
