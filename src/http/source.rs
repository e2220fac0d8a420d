//! The seam between the network and everything that reads pages.
//!
//! [`PageSource`] hides transport, retries and decoding behind one call that
//! never fails: it always yields a [`FetchOutcome`].

use async_trait::async_trait;
use thiserror::Error;

/// Body markers the site serves with a 200 status for missing pages.
pub const NOT_FOUND_MARKERS: [&str; 2] = ["Page not Found", "Sayfa Bulunamadı"];

/// A decoded HTML page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub url: String,
    pub body: String,
    /// Name of the encoding the body was decoded with.
    pub encoding: &'static str,
}

impl Page {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            encoding: "UTF-8",
        }
    }

    pub fn is_not_found(&self) -> bool {
        NOT_FOUND_MARKERS.iter().any(|m| self.body.contains(m))
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("could not read body: {0}")]
    Body(String),
}

impl FetchFailure {
    /// Timeouts, connection problems, throttling and 5xx are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchFailure::Timeout | FetchFailure::Connection(_) | FetchFailure::Body(_) => true,
            FetchFailure::Status(code) => *code == 429 || (500..600).contains(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Page(Page),
    /// HTTP 404 or a not-found marker in the body.
    NotFound,
    Unavailable(FetchFailure),
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}
