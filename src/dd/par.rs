//! Par contract from a double-dummy trick table.
//!
//! Both sides bid perfectly: every contract that goes down is doubled, and a
//! side only outbids the other when that improves its own score. The auction
//! is solved backwards from 7NT.

use super::scoring::{Doubling, contract_score};
use crate::domain::{Direction, Optimum, Seat, Strain, TrickTable, Vulnerability};

const CONTRACTS: usize = 35;

fn contract_at(index: usize) -> (u8, Strain) {
    ((index / 5) as u8 + 1, Strain::ALL[index % 5])
}

struct Line {
    /// Score of the final contract for the side that bid `index`.
    value: [[i32; CONTRACTS]; 2],
    /// Opponents' best overcall over `index`, when it beats passing.
    reply: [[Option<usize>; CONTRACTS]; 2],
}

/// Par for a deal. `dealer` decides which side gets the first chance to bid.
pub fn par_contract(table: &TrickTable, vulnerability: Vulnerability, dealer: Seat) -> Optimum {
    let sides = [dealer.direction(), dealer.direction().opponent()];
    let own = |side: usize, index: usize| -> i32 {
        let direction = sides[side];
        let (level, strain) = contract_at(index);
        let tricks = table.side_max(direction, strain);
        let doubling = if tricks >= level + 6 {
            Doubling::Undoubled
        } else {
            Doubling::Doubled
        };
        contract_score(level, strain, tricks, doubling, vulnerability.is_vulnerable(direction))
    };

    let mut line = Line {
        value: [[0; CONTRACTS]; 2],
        reply: [[None; CONTRACTS]; 2],
    };
    for index in (0..CONTRACTS).rev() {
        for side in 0..2 {
            let mut value = own(side, index);
            let mut reply = None;
            for over in index + 1..CONTRACTS {
                let outcome = -line.value[1 - side][over];
                if outcome < value {
                    value = outcome;
                    reply = Some(over);
                }
            }
            line.value[side][index] = value;
            line.reply[side][index] = reply;
        }
    }

    let best_opening = |side: usize| -> (i32, usize) {
        (0..CONTRACTS).fold((i32::MIN, 0), |best, index| {
            let value = line.value[side][index];
            if value > best.0 { (value, index) } else { best }
        })
    };

    let (first_value, first_index) = best_opening(0);
    let (second_value, second_index) = best_opening(1);
    let second_value = second_value.max(0);

    let opening = if first_value > -second_value || (first_value == -second_value && second_value != 0) {
        Some((0, first_index))
    } else if second_value > 0 {
        Some((1, second_index))
    } else {
        None
    };

    let Some((mut side, mut index)) = opening else {
        return Optimum::pass_out();
    };
    while let Some(over) = line.reply[side][index] {
        side = 1 - side;
        index = over;
    }

    build_optimum(table, sides[side], index, own(side, index))
}

fn build_optimum(table: &TrickTable, direction: Direction, index: usize, score: i32) -> Optimum {
    let (level, strain) = contract_at(index);
    let tricks = table.side_max(direction, strain);
    let doubling = if tricks >= level + 6 {
        Doubling::Undoubled
    } else {
        Doubling::Doubled
    };
    Optimum {
        text: format!("{} {}{}; {:+}", direction, tricks, strain, score),
        score,
        declarer: Some(direction),
        contract: Some(format!("{}{}{}", level, strain, doubling.suffix())),
        level: Some(level),
        strain: Some(strain),
        tricks: Some(tricks),
    }
}
