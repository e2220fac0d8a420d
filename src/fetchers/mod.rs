pub mod discoverer;
pub mod event_fetcher;
pub mod urls;

pub use discoverer::{DiscoveredEvent, Discoverer};
pub use event_fetcher::{EventFetchReport, EventFetcher, EventTarget};
pub use urls::SourceUrls;
