//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Lineage Dispatch - replay lifecycle events through the async dispatcher
#[derive(Parser, Debug)]
#[command(
    name = "lineage-dispatch",
    author,
    version,
    about = "Async lifecycle event dispatcher",
    long_about = "Decouples a synchronous lifecycle event source from a slow processor.\n\n\
                  Replays a JSON-lines event stream through a bounded worker pool, \n\
                  delivers the terminal event with a bounded drain, and reports \n\
                  dropped, timed-out and failed counts."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LINEAGE_DISPATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LINEAGE_DISPATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay an event stream through the dispatcher
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "LINEAGE_DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON-lines event stream to replay ("-" for stdin)
    #[arg(short, long, env = "LINEAGE_DISPATCH_EVENTS")]
    pub events: PathBuf,

    /// Host properties file (key=value lines, e.g. lineage.async.queueSize=100)
    #[arg(long, env = "LINEAGE_DISPATCH_PROPERTIES")]
    pub properties: Option<PathBuf>,

    /// Run events on the source thread instead of a worker pool
    #[arg(long)]
    pub inline: bool,

    /// Override dispatch.queue_capacity
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Override dispatch.worker_threads
    #[arg(long)]
    pub worker_threads: Option<usize>,

    /// Override dispatch.wait_timeout_s (seconds)
    #[arg(long)]
    pub wait_timeout: Option<f64>,

    /// Override dispatch.shutdown_grace_s (seconds)
    #[arg(long)]
    pub shutdown_grace: Option<f64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LINEAGE_DISPATCH_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "listener.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "listener.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
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
