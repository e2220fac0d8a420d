//! Duplicate bridge scoring for a single contract result.

use crate::domain::Strain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Doubling {
    Undoubled,
    Doubled,
    Redoubled,
}

impl Doubling {
    pub fn suffix(self) -> &'static str {
        match self {
            Doubling::Undoubled => "",
            Doubling::Doubled => "X",
            Doubling::Redoubled => "XX",
        }
    }

    fn multiplier(self) -> i32 {
        match self {
            Doubling::Undoubled => 1,
            Doubling::Doubled => 2,
            Doubling::Redoubled => 4,
        }
    }
}

/// Score for the declaring side of `level` `strain` taking `tricks` tricks.
/// Negative when the contract goes down.
pub fn contract_score(level: u8, strain: Strain, tricks: u8, doubling: Doubling, vulnerable: bool) -> i32 {
    let needed = level as i32 + 6;
    let taken = tricks as i32;
    if taken >= needed {
        made_score(level as i32, strain, taken - needed, doubling, vulnerable)
    } else {
        -undertrick_penalty(needed - taken, doubling, vulnerable)
    }
}

fn made_score(level: i32, strain: Strain, overtricks: i32, doubling: Doubling, vulnerable: bool) -> i32 {
    let contract_points = match strain {
        Strain::C | Strain::D => 20 * level,
        Strain::H | Strain::S => 30 * level,
        Strain::NT => 40 + 30 * (level - 1),
    } * doubling.multiplier();

    let mut score = contract_points;
    score += if contract_points >= 100 {
        if vulnerable { 500 } else { 300 }
    } else {
        50
    };
    score += match level {
        6 => if vulnerable { 750 } else { 500 },
        7 => if vulnerable { 1500 } else { 1000 },
        _ => 0,
    };
    score += match doubling {
        Doubling::Undoubled => 0,
        Doubling::Doubled => 50,
        Doubling::Redoubled => 100,
    };

    let overtrick_value = match doubling {
        Doubling::Undoubled => match strain {
            Strain::C | Strain::D => 20,
            _ => 30,
        },
        _ => (if vulnerable { 200 } else { 100 }) * doubling.multiplier() / 2,
    };
    score + overtricks * overtrick_value
}

fn undertrick_penalty(down: i32, doubling: Doubling, vulnerable: bool) -> i32 {
    match doubling {
        Doubling::Undoubled => down * if vulnerable { 100 } else { 50 },
        _ => {
            let doubled = if vulnerable {
                200 + 300 * (down - 1)
            } else {
                match down {
                    1 => 100,
                    2 => 300,
                    n => 500 + 300 * (n - 3),
                }
            };
            doubled * doubling.multiplier() / 2
        }
    }
}
