use thiserror::Error;

use super::par::par_contract;
use crate::domain::{Optimum, Seat, TrickTable, Vulnerability};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("invalid deal: {0}")]
    InvalidDeal(String),
    #[error("search failed: {0}")]
    Search(String),
}

/// Double-dummy analysis of a full deal given as a PBN string
/// (`N:AKJ.Q92.T8643.K7 ...`).
pub trait DoubleDummySolver: Send + Sync {
    /// Tricks each seat takes as declarer in each strain.
    fn solve(&self, pbn: &str) -> Result<TrickTable, SolverError>;

    fn par(&self, table: &TrickTable, vulnerability: Vulnerability, dealer: Seat) -> Optimum {
        par_contract(table, vulnerability, dealer)
    }
}
