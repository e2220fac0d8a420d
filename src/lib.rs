pub mod cli;
pub mod config;
pub mod dd;
pub mod domain;
pub mod errors;
pub mod fetchers;
pub mod http;
pub mod parsers;
pub mod rate_limiter;
pub mod registry;
pub mod retry;
pub mod services;
pub mod stores;

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::time::Duration;

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::dd::SearchSolver;
use crate::http::VugraphClient;
use crate::services::{Mode, Pipeline, ScheduleDriver, status_summary};
use crate::stores::StatusJournal;

pub fn interpret() -> Cli {
    Cli::parse()
}

fn build_pipeline(config: AppConfig) -> Result<Pipeline<VugraphClient, SearchSolver>> {
    let client = VugraphClient::new(&config.scraper)?;
    Pipeline::new(client, SearchSolver::new(), config)
}

/// One update run. Returns the process exit code.
pub fn handle_update(mode: Mode, workdir: &Path) -> Result<i32> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let pipeline = build_pipeline(AppConfig::new().with_workdir(workdir))?;
        let report = pipeline.run(mode).await?;
        Ok(report.exit_code())
    })
}

pub fn handle_rankings(workdir: &Path) -> Result<()> {
    let pipeline = build_pipeline(AppConfig::new().with_workdir(workdir))?;
    pipeline.regenerate_rankings()?;
    Ok(())
}

pub fn handle_daemon(workdir: &Path, interval_minutes: u64) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::new()
            .with_workdir(workdir)
            .with_daemon_interval(Duration::from_secs(interval_minutes * 60));
        let driver = ScheduleDriver::new(build_pipeline(config)?);
        driver.run_daemon().await?;
        Ok(())
    })
}

pub fn handle_status(workdir: &Path) -> Result<()> {
    let config = AppConfig::new().with_workdir(workdir);
    let status = StatusJournal::new(config.stores.status_path()).load()?;
    println!("{}", status_summary(&status));
    Ok(())
}
