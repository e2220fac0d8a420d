use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rank characters from highest to lowest.
pub const RANK_CHARS: &str = "AKQJT98765432";

pub const CARDS_PER_HAND: u32 = 13;
const FULL_SUIT: u16 = 0x1FFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CardError {
    #[error("unknown rank '{0}'")]
    UnknownRank(char),
    #[error("expected 4 suit groups, found {0}")]
    SuitGroupCount(usize),
    #[error("card {rank}{suit} appears twice")]
    Duplicate { suit: char, rank: char },
    #[error("seat {seat} holds {count} cards, expected 13")]
    HandSize { seat: Seat, count: u32 },
    #[error("deal is missing seat {0}")]
    MissingSeat(Seat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    S,
    H,
    D,
    C,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::S, Suit::H, Suit::D, Suit::C];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        match self {
            Suit::S => 'S',
            Suit::H => 'H',
            Suit::D => 'D',
            Suit::C => 'C',
        }
    }

    pub fn from_letter(c: char) -> Option<Suit> {
        match c.to_ascii_uppercase() {
            'S' => Some(Suit::S),
            'H' => Some(Suit::H),
            'D' => Some(Suit::D),
            'C' => Some(Suit::C),
            _ => None,
        }
    }

    /// Suit named by an icon's `alt` text (`spade`, `Hearts`, `diamond.gif`, ...).
    pub fn from_icon_alt(alt: &str) -> Option<Suit> {
        let alt = alt.to_lowercase();
        if alt.contains("spade") {
            Some(Suit::S)
        } else if alt.contains("heart") {
            Some(Suit::H)
        } else if alt.contains("diamond") {
            Some(Suit::D)
        } else if alt.contains("club") {
            Some(Suit::C)
        } else {
            match alt.trim() {
                "s" | "h" | "d" | "c" => alt.trim().chars().next().and_then(Suit::from_letter),
                _ => None,
            }
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Seat {
    N,
    E,
    S,
    W,
}

impl Seat {
    /// Clockwise order starting from North.
    pub const ALL: [Seat; 4] = [Seat::N, Seat::E, Seat::S, Seat::W];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Seat {
        Seat::ALL[index % 4]
    }

    /// Next seat clockwise.
    pub fn next(self) -> Seat {
        Seat::from_index(self.index() + 1)
    }

    pub fn partner(self) -> Seat {
        Seat::from_index(self.index() + 2)
    }

    pub fn letter(self) -> char {
        match self {
            Seat::N => 'N',
            Seat::E => 'E',
            Seat::S => 'S',
            Seat::W => 'W',
        }
    }

    pub fn from_letter(c: char) -> Option<Seat> {
        match c.to_ascii_uppercase() {
            'N' => Some(Seat::N),
            'E' => Some(Seat::E),
            'S' => Some(Seat::S),
            'W' => Some(Seat::W),
            _ => None,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Seat::N | Seat::S => Direction::NS,
            Seat::E | Seat::W => Direction::EW,
        }
    }

    /// Seats in clockwise order starting from `self`.
    pub fn clockwise(self) -> [Seat; 4] {
        [self, self.next(), self.next().next(), self.next().next().next()]
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    NS,
    EW,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::NS, Direction::EW];

    pub fn seats(self) -> [Seat; 2] {
        match self {
            Direction::NS => [Seat::N, Seat::S],
            Direction::EW => [Seat::E, Seat::W],
        }
    }

    pub fn opponent(self) -> Direction {
        match self {
            Direction::NS => Direction::EW,
            Direction::EW => Direction::NS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::NS => "NS",
            Direction::EW => "EW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric rank value (2..=14) for a rank character. Accepts `1` as the
/// first digit of `10`; callers normalise `10` to `T` first.
pub fn rank_value(c: char) -> Option<u8> {
    match c.to_ascii_uppercase() {
        'A' => Some(14),
        'K' => Some(13),
        'Q' => Some(12),
        'J' => Some(11),
        'T' => Some(10),
        d @ '2'..='9' => d.to_digit(10).map(|v| v as u8),
        _ => None,
    }
}

pub fn rank_char(value: u8) -> char {
    match value {
        14 => 'A',
        13 => 'K',
        12 => 'Q',
        11 => 'J',
        10 => 'T',
        v => char::from(b'0' + v),
    }
}

/// One player's thirteen cards, stored as a rank bitmask per suit
/// (bit 0 = deuce, bit 12 = ace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hand {
    suits: [u16; 4],
}

impl Hand {
    pub fn from_masks(suits: [u16; 4]) -> Self {
        Self {
            suits: suits.map(|m| m & FULL_SUIT),
        }
    }

    /// Build a hand from four rank strings in S, H, D, C order.
    pub fn from_suit_strings(groups: [&str; 4]) -> Result<Self, CardError> {
        let mut suits = [0u16; 4];
        for (idx, group) in groups.iter().enumerate() {
            suits[idx] = parse_holding(group, Suit::ALL[idx])?;
        }
        Ok(Self { suits })
    }

    pub fn masks(&self) -> [u16; 4] {
        self.suits
    }

    pub fn holding(&self, suit: Suit) -> u16 {
        self.suits[suit.index()]
    }

    pub fn length(&self, suit: Suit) -> u32 {
        self.holding(suit).count_ones()
    }

    pub fn card_count(&self) -> u32 {
        self.suits.iter().map(|m| m.count_ones()).sum()
    }

    /// Ranks held in `suit`, high to low (`""` for a void).
    pub fn suit_string(&self, suit: Suit) -> String {
        holding_string(self.holding(suit))
    }

    /// Compact notation `AKJ.Q92.T8643.K7`; a void is an empty group.
    pub fn to_notation(&self) -> String {
        Suit::ALL
            .iter()
            .map(|s| self.suit_string(*s))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn contains(&self, suit: Suit, rank: u8) -> bool {
        self.holding(suit) & rank_bit(rank) != 0
    }
}

impl FromStr for Hand {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<&str> = s.trim().split('.').collect();
        if groups.len() != 4 {
            return Err(CardError::SuitGroupCount(groups.len()));
        }
        Hand::from_suit_strings([groups[0], groups[1], groups[2], groups[3]])
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_notation())
    }
}

impl Serialize for Hand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_notation())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HandRepr {
    Compact(String),
    Sparse(BTreeMap<String, String>),
}

impl<'de> Deserialize<'de> for Hand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match HandRepr::deserialize(deserializer)? {
            HandRepr::Compact(text) => text.parse().map_err(serde::de::Error::custom),
            HandRepr::Sparse(map) => {
                let group = |suit: Suit| {
                    map.iter()
                        .find(|(k, _)| k.chars().next().and_then(Suit::from_letter) == Some(suit))
                        .map(|(_, v)| v.as_str())
                        .unwrap_or("")
                };
                Hand::from_suit_strings(Suit::ALL.map(group)).map_err(serde::de::Error::custom)
            }
        }
    }
}

fn rank_bit(rank: u8) -> u16 {
    1 << (rank - 2)
}

/// Parse a rank string for one suit. `-`, whitespace and an empty string mean void;
/// `10` is accepted for the ten.
pub fn parse_holding(group: &str, suit: Suit) -> Result<u16, CardError> {
    let cleaned = normalize_ranks(group);
    let mut mask = 0u16;
    for c in cleaned.chars() {
        let value = rank_value(c).ok_or(CardError::UnknownRank(c))?;
        let bit = rank_bit(value);
        if mask & bit != 0 {
            return Err(CardError::Duplicate {
                suit: suit.letter(),
                rank: rank_char(value),
            });
        }
        mask |= bit;
    }
    Ok(mask)
}

/// Strip separators, map `10` to `T`, treat `-` as void.
pub fn normalize_ranks(group: &str) -> String {
    let compact: String = group
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '-')
        .collect();
    compact.replace("10", "T").to_uppercase()
}

pub fn holding_string(mask: u16) -> String {
    (2..=14u8)
        .rev()
        .filter(|r| mask & rank_bit(*r) != 0)
        .map(rank_char)
        .collect()
}

/// Four hands indexed by seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hands {
    by_seat: [Hand; 4],
}

impl Hands {
    pub fn new(n: Hand, e: Hand, s: Hand, w: Hand) -> Self {
        Self {
            by_seat: [n, e, s, w],
        }
    }

    pub fn get(&self, seat: Seat) -> &Hand {
        &self.by_seat[seat.index()]
    }

    /// Assemble from a partial seat map. When exactly three seats are present
    /// with thirteen cards each, the fourth is the rest of the deck.
    pub fn from_partial(parsed: &BTreeMap<Seat, Hand>) -> Result<Self, CardError> {
        let missing: Vec<Seat> = Seat::ALL
            .iter()
            .copied()
            .filter(|s| !parsed.contains_key(s))
            .collect();

        let mut by_seat = [Hand::default(); 4];
        for (seat, hand) in parsed {
            by_seat[seat.index()] = *hand;
        }

        match missing.as_slice() {
            [] => {}
            [only] => {
                for seat in Seat::ALL.iter().filter(|s| *s != only) {
                    let count = by_seat[seat.index()].card_count();
                    if count != CARDS_PER_HAND {
                        return Err(CardError::HandSize { seat: *seat, count });
                    }
                }
                let mut rest = [FULL_SUIT; 4];
                for hand in &by_seat {
                    for (i, mask) in hand.masks().iter().enumerate() {
                        rest[i] &= !mask;
                    }
                }
                by_seat[only.index()] = Hand::from_masks(rest);
            }
            [first, ..] => return Err(CardError::MissingSeat(*first)),
        }

        let hands = Self { by_seat };
        hands.validate()?;
        Ok(hands)
    }

    /// Thirteen cards per seat and no card twice.
    pub fn validate(&self) -> Result<(), CardError> {
        let mut seen = [0u16; 4];
        for seat in Seat::ALL {
            let hand = self.get(seat);
            let count = hand.card_count();
            if count != CARDS_PER_HAND {
                return Err(CardError::HandSize { seat, count });
            }
            for suit in Suit::ALL {
                let overlap = seen[suit.index()] & hand.holding(suit);
                if overlap != 0 {
                    let rank = (2..=14u8)
                        .rev()
                        .find(|r| overlap & rank_bit(*r) != 0)
                        .unwrap_or(2);
                    return Err(CardError::Duplicate {
                        suit: suit.letter(),
                        rank: rank_char(rank),
                    });
                }
                seen[suit.index()] |= hand.holding(suit);
            }
        }
        Ok(())
    }

    /// Deal string starting at `first`, clockwise: `N:AKJ.Q92.T8643.K7 ...`.
    pub fn to_pbn(&self, first: Seat) -> String {
        let hands = first
            .clockwise()
            .iter()
            .map(|s| self.get(*s).to_notation())
            .collect::<Vec<_>>()
            .join(" ");
        format!("{}:{}", first.letter(), hands)
    }

    pub fn from_pbn(pbn: &str) -> Result<Self, CardError> {
        let (first, body) = match pbn.trim().split_once(':') {
            Some((seat, body)) => (
                seat.chars().next().and_then(Seat::from_letter).unwrap_or(Seat::N),
                body,
            ),
            None => (Seat::N, pbn.trim()),
        };
        let parts: Vec<&str> = body.split_whitespace().collect();
        if parts.len() != 4 {
            return Err(CardError::MissingSeat(first.clockwise()[parts.len().min(3)]));
        }
        let mut by_seat = [Hand::default(); 4];
        for (seat, text) in first.clockwise().iter().zip(parts) {
            by_seat[seat.index()] = text.parse()?;
        }
        Ok(Self { by_seat })
    }
}
