use serde::{Deserialize, Serialize};
use std::fmt;

use super::cards::{Direction, Seat, Suit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strain {
    C,
    D,
    H,
    S,
    NT,
}

impl Strain {
    /// Bidding order, lowest first.
    pub const ALL: [Strain; 5] = [Strain::C, Strain::D, Strain::H, Strain::S, Strain::NT];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn trump(self) -> Option<Suit> {
        match self {
            Strain::C => Some(Suit::C),
            Strain::D => Some(Suit::D),
            Strain::H => Some(Suit::H),
            Strain::S => Some(Suit::S),
            Strain::NT => None,
        }
    }

    pub fn from_suit(suit: Suit) -> Strain {
        match suit {
            Suit::C => Strain::C,
            Suit::D => Strain::D,
            Suit::H => Strain::H,
            Suit::S => Strain::S,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strain::C => "C",
            Strain::D => "D",
            Strain::H => "H",
            Strain::S => "S",
            Strain::NT => "NT",
        }
    }

    pub fn parse(text: &str) -> Option<Strain> {
        match text.trim().to_uppercase().as_str() {
            "C" => Some(Strain::C),
            "D" => Some(Strain::D),
            "H" => Some(Strain::H),
            "S" => Some(Strain::S),
            "NT" | "N" => Some(Strain::NT),
            _ => None,
        }
    }
}

impl fmt::Display for Strain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vulnerability {
    None,
    NS,
    EW,
    Both,
}

/// Standard duplicate vulnerability for boards 1..=16; the pattern repeats
/// every sixteen boards.
pub const VULNERABILITY_CYCLE: [Vulnerability; 16] = [
    Vulnerability::None,
    Vulnerability::NS,
    Vulnerability::EW,
    Vulnerability::Both,
    Vulnerability::NS,
    Vulnerability::EW,
    Vulnerability::Both,
    Vulnerability::None,
    Vulnerability::EW,
    Vulnerability::Both,
    Vulnerability::None,
    Vulnerability::NS,
    Vulnerability::Both,
    Vulnerability::None,
    Vulnerability::NS,
    Vulnerability::EW,
];

impl Vulnerability {
    pub fn for_board(board: u32) -> Vulnerability {
        VULNERABILITY_CYCLE[(board.max(1) as usize - 1) % 16]
    }

    pub fn is_vulnerable(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Vulnerability::Both, _)
                | (Vulnerability::NS, Direction::NS)
                | (Vulnerability::EW, Direction::EW)
        )
    }

    /// Vulnerability code used by the BBO hand viewer.
    pub fn lin_code(self) -> char {
        match self {
            Vulnerability::None => 'o',
            Vulnerability::NS => 'n',
            Vulnerability::EW => 'e',
            Vulnerability::Both => 'b',
        }
    }
}

pub fn dealer_for_board(board: u32) -> Seat {
    Seat::from_index((board.max(1) as usize - 1) % 4)
}
