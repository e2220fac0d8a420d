use crate::domain::{Direction, Fit, Hands, Lott, Strain, Suit, TrickTable};

/// Law of Total Tricks: each side's longest fit and the tricks it takes
/// there, summed over both sides.
pub fn total_tricks(hands: &Hands, table: &TrickTable) -> Lott {
    let ns_fit = best_fit(hands, table, Direction::NS);
    let ew_fit = best_fit(hands, table, Direction::EW);
    Lott {
        total_tricks: ns_fit.tricks + ew_fit.tricks,
        ns_fit,
        ew_fit,
    }
}

/// Longest combined suit; ties go to the suit the side takes more tricks in,
/// then to the higher-ranking suit.
fn best_fit(hands: &Hands, table: &TrickTable, side: Direction) -> Fit {
    let [a, b] = side.seats();
    Suit::ALL
        .iter()
        .map(|suit| Fit {
            suit: *suit,
            length: (hands.get(a).length(*suit) + hands.get(b).length(*suit)) as u8,
            tricks: table.side_max(side, Strain::from_suit(*suit)),
        })
        .fold(None::<Fit>, |best, fit| match best {
            Some(b) if (b.length, b.tricks) >= (fit.length, fit.tricks) => Some(b),
            _ => Some(fit),
        })
        .unwrap_or(Fit {
            suit: Suit::S,
            length: 0,
            tricks: 0,
        })
}
