//! Command line interface

use crate::logging::LogFormat;
use crate::settings::DEFAULT_CONFIG_FILE;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cadenced")]
#[command(about = "Cadence batch service: runs process units in cycles", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML); defaults to ./cadence.toml when present
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(
        long,
        global = true,
        value_enum,
        env = "CADENCE_LOG_FORMAT",
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Also write JSON logs to daily rolling files in this directory
    #[arg(long, global = true, env = "CADENCE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the service (default)
    Run(RunArgs),

    /// Validate the configuration and print the execution plan
    Check,

    /// Show stored cycle history
    History(HistoryArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Run(RunArgs::default())
    }
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Print the last cycle report as JSON on exit
    #[arg(long)]
    pub print_report: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Number of recent cycles to show
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: u32,

    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Config path with `~` expanded, and whether the file must exist
    pub fn config_source(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (expand(path), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        }
    }

    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        self.log_dir.as_deref().map(expand)
    }
}

fn expand(path: &std::path::Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
