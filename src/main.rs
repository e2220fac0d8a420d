use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;

use vugraph_sync::cli::{Cli, Command};
use vugraph_sync::{handle_daemon, handle_rankings, handle_status, handle_update, interpret};

fn main() {
    let cli = interpret();
    if let Err(e) = setup_logging(cli.log_file.as_deref()) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    let code = execute_command(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        1
    });
    std::process::exit(code);
}

fn setup_logging(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        sensible_env_logger::init!();
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_secs()
        .init();
    Ok(())
}

fn execute_command(cli: &Cli) -> Result<i32> {
    match cli.command() {
        Command::Update(mode) => handle_update(mode, &cli.workdir),
        Command::Rankings => handle_rankings(&cli.workdir).map(|_| 0),
        Command::Daemon { interval_minutes } => handle_daemon(&cli.workdir, interval_minutes).map(|_| 0),
        Command::Status => handle_status(&cli.workdir).map(|_| 0),
    }
}
