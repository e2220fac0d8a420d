pub mod settings;

pub use settings::{
    AppConfig, BOARD_CAP, MAX_CONCURRENT_REQUESTS, MAX_STATUS_ERRORS, PipelineSettings,
    ScraperSettings, StoreSettings,
};
