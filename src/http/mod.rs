pub mod client;
pub mod decode;
pub mod source;

pub use client::VugraphClient;
pub use source::{FetchFailure, FetchOutcome, Page, PageSource};
