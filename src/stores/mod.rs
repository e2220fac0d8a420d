//! The persisted JSON documents. Every write goes through
//! [`atomic::write_json_atomic`]; a store is only written when it changed.

pub mod atomic;
pub mod hands;
pub mod results;
pub mod status;
pub mod tournament_index;

pub use hands::{HandStore, UpsertOutcome};
pub use results::{EventSummary, ResultStore};
pub use status::{PipelineStatus, RunResult, StatusJournal, ValidationSummary};
pub use tournament_index::{IndexedEvent, TournamentIndex};

use anyhow::Result;

use crate::config::StoreSettings;

/// The stores one pipeline process owns, opened from the working directory.
pub struct Stores {
    pub index: TournamentIndex,
    pub hands: HandStore,
    pub results: ResultStore,
    pub status: StatusJournal,
}

impl Stores {
    pub fn open(settings: &StoreSettings) -> Result<Self> {
        Ok(Self {
            index: TournamentIndex::load(settings.tournament_index_path())?,
            hands: HandStore::load(settings.hands_path())?,
            results: ResultStore::load(settings.board_results_path())?,
            status: StatusJournal::new(settings.status_path()),
        })
    }

    /// Write every modified store. Hands go first so results never
    /// reference a deal that is not on disk yet.
    pub fn save(&mut self) -> Result<()> {
        self.hands.save()?;
        self.results.save()?;
        self.index.save()?;
        Ok(())
    }
}
