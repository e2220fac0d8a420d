pub mod board;
pub mod cards;
pub mod deal;
pub mod event;
pub mod progress;
pub mod results;
pub mod roster;

pub use board::{Strain, VULNERABILITY_CYCLE, Vulnerability, dealer_for_board};
pub use cards::{CardError, Direction, Hand, Hands, Seat, Suit};
pub use deal::{Deal, Enrichment, Fit, Lott, Optimum, TrickTable};
pub use event::{BoardKey, EventDate, EventId};
pub use progress::FetchProgress;
pub use results::{BoardResult, EMPTY_CELL, PairResult, ScoringVariant};
pub use roster::{CalendarEvent, CalendarListing, EventInfo, PairRoster, Standing};
