use crate::domain::{Direction, EventId};

/// Page addresses on the results site.
#[derive(Debug, Clone)]
pub struct SourceUrls {
    base: String,
}

impl SourceUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn calendar(&self) -> String {
        format!("{}/calendar.php", self.base)
    }

    pub fn event_results(&self, event_id: &EventId) -> String {
        format!("{}/eventresults.php?event={}", self.base, event_id)
    }

    pub fn board_details(&self, event_id: &EventId, pair: u32, direction: Direction, board: u32) -> String {
        format!(
            "{}/boarddetails.php?event={}&section=A&pair={}&direction={}&board={}",
            self.base, event_id, pair, direction, board
        )
    }

    /// The board page of pair 1 NS lists every table's line.
    pub fn board_batch(&self, event_id: &EventId, board: u32) -> String {
        self.board_details(event_id, 1, Direction::NS, board)
    }
}
