//! Tower Defense - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "td-tools")]
#[command(about = "Development tools for the tower defense simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file or a directory of them
    Validate {
        /// Path to a RON file or data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Print the built-in configuration as RON
    DefaultConfig {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating configuration in: {}", path.display());
            match td_tools::validate::validate_path(&path) {
                Ok(files) => tracing::info!(files = files.len(), "Validation passed"),
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::DefaultConfig { output } => {
            let result = match output {
                Some(path) => td_tools::validate::write_default_config(&path)
                    .map(|()| tracing::info!("Wrote {}", path.display())),
                None => td_tools::validate::default_config_ron().map(|text| println!("{text}")),
            };
            if let Err(e) = result {
                tracing::error!("Export failed: {e}");
                std::process::exit(1);
            }
        }
    }
}
