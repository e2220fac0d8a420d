use anyhow::Result;
use colored::Colorize;
use log::{error, info};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use super::pipeline::{Mode, Pipeline};
use crate::dd::DoubleDummySolver;
use crate::http::PageSource;
use crate::stores::PipelineStatus;

/// Runs quick updates on a fixed interval until told to stop.
pub struct ScheduleDriver<S: PageSource, D: DoubleDummySolver + 'static> {
    pipeline: Pipeline<S, D>,
    interval: Duration,
}

impl<S: PageSource, D: DoubleDummySolver + 'static> ScheduleDriver<S, D> {
    pub fn new(pipeline: Pipeline<S, D>) -> Self {
        let interval = pipeline.config().pipeline.daemon_interval;
        Self { pipeline, interval }
    }

    /// Loop until Ctrl-C. The signal is only acted on between iterations.
    pub async fn run_daemon(&self) -> Result<usize> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Loop until `shutdown` resolves; returns the number of iterations run.
    /// A failed iteration is logged and the loop carries on.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<usize>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            "=== Starting Daemon (quick update every {} min) ===\n",
            self.interval.as_secs() / 60
        );
        let stop = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        {
            let stop = Arc::clone(&stop);
            let wake = Arc::clone(&wake);
            tokio::spawn(async move {
                shutdown.await;
                stop.store(true, Ordering::SeqCst);
                wake.notify_one();
            });
        }

        let mut iterations = 0;
        loop {
            iterations += 1;
            info!("Daemon iteration {}", iterations);
            match self.pipeline.run(Mode::Quick).await {
                Ok(report) if report.success => info!("  → Iteration {} succeeded", iterations),
                Ok(report) => info!(
                    "  → Iteration {} incomplete: {} errors, {} events with unfetched boards",
                    iterations,
                    report.errors.len(),
                    report.unfetched.len()
                ),
                Err(e) => error!("Iteration {} aborted: {:#}", iterations, e),
            }

            if stop.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = wake.notified() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("=== Daemon Stopped after {} iterations ===", iterations);
        Ok(iterations)
    }
}

/// One-paragraph summary of the status journal for `--status`.
pub fn status_summary(status: &PipelineStatus) -> String {
    let Some(last_run) = &status.last_run else {
        return "No pipeline run recorded yet.".yellow().to_string();
    };

    let outcome = match &status.last_result {
        Some(result) if result.success => "succeeded".green().bold(),
        Some(_) => "did not complete".red().bold(),
        None => "has no recorded outcome".yellow().bold(),
    };
    let mut summary = format!(
        "Last {} run at {} {}",
        status.last_mode.as_deref().unwrap_or("unknown"),
        last_run,
        outcome
    );
    if let Some(result) = &status.last_result {
        summary.push_str(&format!(
            " ({} boards fetched, {} event ids fixed, {} errors, {} attempts)",
            result.boards_fetched, result.event_ids_fixed, result.errors, status.last_attempts
        ));
    }
    summary.push_str(&format!(
        ". {} runs so far, {} boards fetched in total.",
        status.total_runs, status.total_boards_fetched
    ));
    summary.push_str(&format!(
        " Last success: {}. Last full update: {}.",
        status.last_success.as_deref().unwrap_or("never"),
        status.last_full_update.as_deref().unwrap_or("never")
    ));

    let unfetched = status.unfetched_count();
    if unfetched > 0 {
        let events: Vec<&str> = status.unfetched.keys().map(String::as_str).collect();
        summary.push_str(&format!(
            " {}",
            format!("{} boards still unfetched (events {}).", unfetched, events.join(", ")).red()
        ));
    }
    if let Some(validation) = &status.last_validation {
        summary.push_str(&format!(
            " Validation: {} hand issues, {} orphan results, {} events missing rankings.",
            validation.hand_issues, validation.orphan_results, validation.events_missing_rankings
        ));
    }
    if let Some(error) = status.last_errors.last() {
        summary.push_str(&format!(
            " Latest of {} recorded errors: {}",
            status.last_errors.len(),
            error.dimmed()
        ));
    }
    summary
}
