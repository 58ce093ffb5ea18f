//! Headless tower defense runner.
//!
//! This binary runs a session without graphics, controlled via JSON on
//! stdin/stdout or scripted by a RON scenario.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p td_headless
//!
//! # Run a scenario to completion and print a JSON summary
//! cargo run -p td_headless -- run --scenario assets/scenarios/default_defense.ron
//!
//! # Same, with custom tuning and a tick limit
//! cargo run -p td_headless -- run --scenario s.ron --config assets/data/game_config.ron --max-ticks 6000
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use td_headless::{load_config, run_scenario, HeadlessConfig, HeadlessRunner, Scenario};

#[derive(Parser)]
#[command(name = "td_headless")]
#[command(about = "Headless tower defense runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a session from JSON commands on stdin (default)
    Interactive {
        /// Game configuration file (RON); built-in defaults if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Emit an events line for every tick, even quiet ones
        #[arg(long)]
        every_tick: bool,
    },

    /// Run a scripted scenario to completion
    Run {
        /// Scenario file to load (RON); built-in default scenario if omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Game configuration file (RON); built-in defaults if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many ticks (overrides the scenario's limit)
        #[arg(long)]
        max_ticks: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Interactive { config, every_tick }) => cmd_interactive(config, every_tick),
        Some(Commands::Run {
            scenario,
            config,
            max_ticks,
        }) => cmd_run(scenario, config, max_ticks),
        None => cmd_interactive(None, false),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// Drive a session from stdin.
fn cmd_interactive(config: Option<PathBuf>, every_tick: bool) -> Result<ExitCode, String> {
    tracing::info!("Starting interactive session");

    let game_config = load_config(config.as_deref()).map_err(|e| e.to_string())?;
    let mut runner = HeadlessRunner::with_config(
        game_config,
        HeadlessConfig {
            emit_empty_ticks: every_tick,
        },
    )
    .map_err(|e| e.to_string())?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    runner
        .run(stdin.lock(), stdout.lock())
        .map_err(|e| format!("I/O error: {e}"))?;

    tracing::info!(tick = runner.simulation().current_tick(), "Session closed");
    Ok(ExitCode::SUCCESS)
}

/// Run a scenario and print its summary.
fn cmd_run(
    scenario: Option<PathBuf>,
    config: Option<PathBuf>,
    max_ticks: Option<u64>,
) -> Result<ExitCode, String> {
    let scenario = match scenario {
        Some(path) => Scenario::load(&path).map_err(|e| e.to_string())?,
        None => Scenario::default(),
    };
    let game_config = load_config(config.as_deref()).map_err(|e| e.to_string())?;

    let summary = run_scenario(&scenario, game_config, max_ticks).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| format!("Failed to serialize summary: {e}"))?;
    println!("{json}");

    if summary.passed {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(scenario = %summary.scenario, "Scenario expectation not met");
        Ok(ExitCode::FAILURE)
    }
}
