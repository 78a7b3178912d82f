//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ATSD Forwarder - buffered, retrying command forwarder for a time-series store
#[derive(Parser, Debug)]
#[command(
    name = "atsd-forwarder",
    author,
    version,
    about = "Buffered command forwarder for a time-series store",
    long_about = "Forwards series, entity-tag, property and message commands to a \n\
                  time-series store.\n\n\
                  Commands are queued to a single dispatch loop that retries failed \n\
                  writes with exponential backoff, or sent once in prior mode."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ATSD_FORWARDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "ATSD_FORWARDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Forward commands from a JSON lines file
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "ATSD_FORWARDER_CONFIG"
    )]
    pub config: PathBuf,

    /// JSON lines file with one command per line
    #[arg(short, long, env = "ATSD_FORWARDER_INPUT")]
    pub input: PathBuf,

    /// Send each kind once and skip the dispatch loop
    #[arg(long)]
    pub prior: bool,

    /// Override series commands per chunk from configuration
    #[arg(long, env = "ATSD_FORWARDER_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Override Prometheus port from configuration (0 = disabled)
    #[arg(long, env = "ATSD_FORWARDER_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Validate configuration and input, then exit without sending
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the resolved configuration (defaults filled in)
    #[arg(long, value_enum)]
    pub emit: Option<ConfigOutput>,
}

/// Format for `validate --emit`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigOutput {
    Toml,
    Json,
}

impl From<ConfigOutput> for config_loader::ConfigFormat {
    fn from(output: ConfigOutput) -> Self {
        match output {
            ConfigOutput::Toml => Self::Toml,
            ConfigOutput::Json => Self::Json,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
