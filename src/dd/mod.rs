//! Double-dummy enrichment: trick tables, par and the Law of Total Tricks.

pub mod enricher;
pub mod lott;
pub mod par;
pub mod scoring;
pub mod search;
pub mod solver;

pub use enricher::{DdEnricher, EnrichReport};
pub use search::SearchSolver;
pub use solver::{DoubleDummySolver, SolverError};
