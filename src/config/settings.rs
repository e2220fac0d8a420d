use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const BASE_URL: &str = "https://clubs.vugraph.com/hosgoru";
pub const MAX_CONCURRENT_REQUESTS: usize = 10;
pub const BOARD_CAP: u32 = 30;
pub const MAX_STATUS_ERRORS: usize = 10;

pub struct ScraperSettings {
    pub base_url: String,
    pub user_agent: &'static str,
    pub timeout_secs: u64,
    pub max_concurrent_requests: usize,
    pub board_cap: u32,
    /// Transient failures are retried 3 times, 1s/2s/4s apart.
    pub http_retry: RetryPolicy,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            user_agent: "VugraphSync/1.0",
            timeout_secs: 15,
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            board_cap: BOARD_CAP,
            http_retry: RetryPolicy::new(4, Duration::from_secs(1), Duration::from_secs(4)),
        }
    }
}

pub struct PipelineSettings {
    pub quick_retry: RetryPolicy,
    pub full_retry: RetryPolicy,
    pub daemon_interval: Duration,
    pub max_status_errors: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            // sleep = min(cap, 2^attempt) seconds
            quick_retry: RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(10)),
            full_retry: RetryPolicy::new(5, Duration::from_secs(2), Duration::from_secs(15)),
            daemon_interval: Duration::from_secs(30 * 60),
            max_status_errors: MAX_STATUS_ERRORS,
        }
    }
}

pub struct StoreSettings {
    pub workdir: PathBuf,
}

impl StoreSettings {
    pub const TOURNAMENT_INDEX: &'static str = "database.json";
    pub const HANDS: &'static str = "hands_database.json";
    pub const BOARD_RESULTS: &'static str = "board_results.json";
    pub const STATUS: &'static str = "pipeline_status.json";

    pub fn new<P: AsRef<Path>>(workdir: P) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn tournament_index_path(&self) -> PathBuf {
        self.workdir.join(Self::TOURNAMENT_INDEX)
    }

    pub fn hands_path(&self) -> PathBuf {
        self.workdir.join(Self::HANDS)
    }

    pub fn board_results_path(&self) -> PathBuf {
        self.workdir.join(Self::BOARD_RESULTS)
    }

    pub fn status_path(&self) -> PathBuf {
        self.workdir.join(Self::STATUS)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::new(".")
    }
}

pub struct AppConfig {
    pub scraper: ScraperSettings,
    pub pipeline: PipelineSettings,
    pub stores: StoreSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            scraper: ScraperSettings::default(),
            pipeline: PipelineSettings::default(),
            stores: StoreSettings::default(),
        }
    }

    pub fn with_workdir<P: AsRef<Path>>(mut self, workdir: P) -> Self {
        self.stores = StoreSettings::new(workdir);
        self
    }

    pub fn with_daemon_interval(mut self, interval: Duration) -> Self {
        self.pipeline.daemon_interval = interval;
        self
    }
}

// Passed explicitly to the services; no global configuration.
