use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::services::Mode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Vugraph tournament sync: results, hands and double-dummy analysis")]
#[command(group(ArgGroup::new("action").args(["quick", "full", "rankings", "daemon", "status"])))]
pub struct Cli {
    /// Fetch new events and previously unfetched boards (default)
    #[arg(long)]
    pub quick: bool,

    /// Re-read every calendar event with a larger retry budget
    #[arg(long)]
    pub full: bool,

    /// Only re-rank stored board results
    #[arg(long)]
    pub rankings: bool,

    /// Run quick updates on an interval until interrupted
    #[arg(long)]
    pub daemon: bool,

    /// Minutes between daemon runs
    #[arg(long, value_name = "MINUTES", default_value_t = 30)]
    pub interval: u64,

    /// Print a summary of the last run
    #[arg(long)]
    pub status: bool,

    /// Directory holding the JSON stores
    #[arg(long, env = "VUGRAPH_WORKDIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Append log records to this file instead of the console
    #[arg(long, env = "VUGRAPH_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Update(Mode),
    Rankings,
    Daemon { interval_minutes: u64 },
    Status,
}

impl Cli {
    pub fn command(&self) -> Command {
        if self.full {
            Command::Update(Mode::Full)
        } else if self.rankings {
            Command::Rankings
        } else if self.daemon {
            Command::Daemon {
                interval_minutes: self.interval.max(1),
            }
        } else if self.status {
            Command::Status
        } else {
            Command::Update(Mode::Quick)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_quick_update() {
        let cli = Cli::parse_from(["vugraph_sync"]);
        assert_eq!(cli.command(), Command::Update(Mode::Quick));
    }

    #[test]
    fn test_daemon_interval() {
        let cli = Cli::parse_from(["vugraph_sync", "--daemon", "--interval", "5"]);
        assert_eq!(cli.command(), Command::Daemon { interval_minutes: 5 });
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["vugraph_sync", "--quick", "--full"]).is_err());
        let cli = Cli::parse_from(["vugraph_sync", "--full", "--workdir", "/tmp/data"]);
        assert_eq!(cli.command(), Command::Update(Mode::Full));
        assert_eq!(cli.workdir, PathBuf::from("/tmp/data"));
    }
}
