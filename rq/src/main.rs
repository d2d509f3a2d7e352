//! rq - request coordination policy tool
//!
//! CLI entry point for validating coordination configs and simulating bursts.

use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use reqsync::cli::{Cli, Command, OutputFormat};
use reqsync::config::{Config, SyncPolicy};
use reqsync::coordinator::Coordinator;
use reqsync::domain::{Mode, Verb};
use reqsync::simulate::{self, CallOutcome, SimulationPlan};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install tracing subscriber: {}", e))?;

    debug!(%level, "Logging initialized");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is loaded before logging so its log-level can apply
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let policy = config.policy().context("Invalid coordination configuration")?;
    info!(
        stale_after_ms = policy.staleness.stale_after_ms(),
        surface_rejections = policy.surface_rejections,
        "rq loaded policy"
    );

    match cli.command {
        Command::Check { format } => cmd_check(&policy, format),
        Command::Simulate {
            verb,
            url,
            endpoint_id,
            mode,
            count,
            spacing_ms,
            latency_ms,
            timeout_ms,
            format,
        } => {
            let verb: Verb = verb.parse()?;
            let mode = mode.map(|m| m.parse::<Mode>()).transpose()?;
            let plan = SimulationPlan {
                verb,
                url,
                endpoint_id,
                mode,
                count,
                spacing: Duration::from_millis(spacing_ms),
                latency: Duration::from_millis(latency_ms),
                timeout: timeout_ms.map(Duration::from_millis),
            };
            cmd_simulate(policy, &plan, format).await
        }
    }
}

/// Print the resolved policy
fn cmd_check(policy: &SyncPolicy, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_check: called");
    let modes = policy.modes.entries();

    match format {
        OutputFormat::Json => {
            let modes: serde_json::Map<String, serde_json::Value> = modes
                .iter()
                .map(|(verb, mode)| (verb.to_string(), serde_json::json!(mode)))
                .collect();
            let json = serde_json::json!({
                "modes": modes,
                "stale_after_ms": policy.staleness.stale_after_ms(),
                "surface_rejections": policy.surface_rejections,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{} configuration is valid", "✓".green());
            println!();
            println!("Modes");
            println!("-----");
            for (verb, mode) in &modes {
                println!("{:<8} {}", verb.to_string(), mode.to_string().cyan());
            }
            println!();
            if policy.staleness.is_enabled() {
                println!("Stale after: {} ms", policy.staleness.stale_after_ms());
            } else {
                println!("Stale after: disabled");
            }
            println!(
                "Rejections: {}",
                if policy.surface_rejections { "surfaced" } else { "swallowed" }
            );
        }
    }

    Ok(())
}

/// Run a simulated burst and print per-call outcomes
async fn cmd_simulate(policy: SyncPolicy, plan: &SimulationPlan, format: OutputFormat) -> Result<()> {
    debug!(?plan, ?format, "cmd_simulate: called");
    let coordinator = Coordinator::new(policy);
    let report = simulate::run(&coordinator, plan).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("{} {} x{}", plan.verb, plan.url, plan.count);
            println!();
            for call in &report.calls {
                let outcome = match call.outcome {
                    CallOutcome::Completed => call.outcome.to_string().green(),
                    CallOutcome::Duplicate | CallOutcome::Superseded | CallOutcome::Suppressed => {
                        call.outcome.to_string().yellow()
                    }
                    CallOutcome::Cancelled => call.outcome.to_string().red(),
                };
                println!(
                    "#{:<3} start {:>6} ms  settle {:>6} ms  {}",
                    call.index, call.started_ms, call.settled_ms, outcome
                );
            }
            let stats = &report.stats;
            println!();
            println!(
                "admitted {}  completed {}  duplicates {}  superseded {}  timed out {}  peak pending {}",
                stats.total_admitted,
                stats.total_completed,
                stats.total_duplicates,
                stats.total_superseded,
                stats.total_timed_out,
                stats.peak_pending
            );
        }
    }

    Ok(())
}
