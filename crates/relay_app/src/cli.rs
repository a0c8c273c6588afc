//! Command-line surface of the `relay` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use relay_logging::{LogDestination, DEFAULT_LOG_FILE};

/// Relay - upload a video for remote translation and follow the job.
#[derive(Debug, Parser)]
#[command(name = "relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Server base URL, overriding the config file.
    #[arg(long, env = "RELAY_SERVER_URL", global = true)]
    pub server: Option<String>,

    /// RON config file. Defaults to `./relay.ron` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to a file (`./relay.log` when no path is given).
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        default_missing_value = DEFAULT_LOG_FILE
    )]
    pub log_file: Option<PathBuf>,

    /// More log output; repeat for debug.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a video and wait until the translated result is ready.
    Submit(SubmitArgs),
    /// Print the effective configuration as RON.
    Config,
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Video file to upload.
    pub file: PathBuf,

    /// Target language, overriding the config file.
    #[arg(long, short = 'l')]
    pub language: Option<String>,

    /// Print one JSON object per update instead of text.
    #[arg(long)]
    pub json: bool,
}
