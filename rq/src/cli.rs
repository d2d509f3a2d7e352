//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// rq - request coordination policy tool
#[derive(Parser)]
#[command(
    name = "rq",
    author,
    version,
    about = "Inspect and exercise per-endpoint request coordination policies"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate the configuration and print the resolved policy
    Check {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Fire a burst of simulated calls at one endpoint and report their fate
    Simulate {
        /// HTTP verb (GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS)
        #[arg(value_name = "VERB")]
        verb: String,

        /// Target URL
        url: String,

        /// Logical endpoint identity (defaults to the URL)
        #[arg(long)]
        endpoint_id: Option<String>,

        /// Override the verb's configured mode (prevent, abort, force)
        #[arg(short, long)]
        mode: Option<String>,

        /// Number of calls to issue
        #[arg(short = 'n', long, default_value = "3")]
        count: usize,

        /// Delay between consecutive calls in milliseconds
        #[arg(short, long, default_value = "10")]
        spacing_ms: u64,

        /// Simulated transport latency per call in milliseconds
        #[arg(short = 'L', long, default_value = "100")]
        latency_ms: u64,

        /// Per-call timeout in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for check/simulate commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
