use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::cards::{Direction, Seat};
use super::event::{EventDate, EventId};

/// Placeholder the site (and the viewer) use for an empty cell.
pub const EMPTY_CELL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScoringVariant {
    #[default]
    MP,
    IMP,
}

/// One pair's line on one board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairResult {
    pub pair_names: String,
    pub direction: Direction,
    #[serde(default = "empty_cell")]
    pub contract: String,
    #[serde(default, with = "dash_seat")]
    pub declarer: Option<Seat>,
    #[serde(default = "empty_cell")]
    pub result: String,
    #[serde(default = "empty_cell")]
    pub lead: String,
    #[serde(default, with = "dash_score")]
    pub score: Option<i32>,
    /// Matchpoint percentage, or the signed IMP value for IMP events.
    pub percent: f64,
    #[serde(default)]
    pub rank: u32,
}

fn empty_cell() -> String {
    EMPTY_CELL.to_string()
}

/// All pair lines for one board, ranked per direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardResult {
    pub event_id: EventId,
    pub board: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<EventDate>,
    #[serde(default)]
    pub scoring: ScoringVariant,
    pub results: Vec<PairResult>,
}

impl BoardResult {
    pub fn new(
        event_id: EventId,
        board: u32,
        date: Option<EventDate>,
        scoring: ScoringVariant,
        results: Vec<PairResult>,
    ) -> Self {
        let mut board_result = Self {
            event_id,
            board,
            date,
            scoring,
            results,
        };
        board_result.rank();
        board_result
    }

    /// Sort NS rows then EW rows, each by percent descending, and number
    /// them 1..k within their direction.
    pub fn rank(&mut self) {
        self.results.sort_by(|a, b| {
            a.direction
                .cmp(&b.direction)
                .then_with(|| b.percent.total_cmp(&a.percent))
        });

        let mut current: Option<Direction> = None;
        let mut next_rank = 0;
        for row in &mut self.results {
            if current != Some(row.direction) {
                current = Some(row.direction);
                next_rank = 0;
            }
            next_rank += 1;
            row.rank = next_rank;
        }
    }

    pub fn rows_for(&self, direction: Direction) -> impl Iterator<Item = &PairResult> {
        self.results.iter().filter(move |r| r.direction == direction)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_ranked(&self) -> bool {
        Direction::BOTH.iter().all(|d| {
            let rows: Vec<&PairResult> = self.rows_for(*d).collect();
            rows.iter().enumerate().all(|(i, r)| r.rank == i as u32 + 1)
                && rows.windows(2).all(|w| w[0].percent >= w[1].percent)
        })
    }
}

mod dash_seat {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Seat>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(seat) => serializer.collect_str(seat),
            None => serializer.serialize_str(EMPTY_CELL),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Seat>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(text.trim().chars().next().and_then(Seat::from_letter))
    }
}

mod dash_score {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ScoreRepr {
        Number(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<i32>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(score) => serializer.serialize_i32(*score),
            None => serializer.serialize_str(EMPTY_CELL),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
        Ok(match Option::<ScoreRepr>::deserialize(deserializer)? {
            Some(ScoreRepr::Number(n)) => i32::try_from(n).ok(),
            Some(ScoreRepr::Text(text)) => text.trim().parse().ok(),
            None => None,
        })
    }
}
