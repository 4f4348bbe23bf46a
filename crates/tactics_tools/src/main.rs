//! Tactics Arena - Development Tools

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tactics_core::data::GameData;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tactics-tools")]
#[command(about = "Development tools for Tactics Arena")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Print an ability's settings and term timeline
    Inspect {
        /// Ability name
        ability: String,

        /// Path to data directory
        #[arg(long, default_value = "assets/data")]
        data: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!(path = %path.display(), "Validating data files");
            match tactics_tools::validate::validate_data_directory(&path) {
                Ok(report) if report.is_valid() => {
                    tracing::info!(
                        abilities = report.abilities,
                        units = report.units,
                        "Validation passed"
                    );
                    ExitCode::SUCCESS
                }
                Ok(report) => {
                    for problem in &report.problems {
                        tracing::error!("{problem}");
                    }
                    tracing::error!(problems = report.problems.len(), "Validation failed");
                    ExitCode::FAILURE
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Inspect { ability, data } => {
            let result = GameData::load_from_dir(&data)
                .and_then(|data| tactics_tools::inspect::render_ability(&data, &ability));
            match result {
                Ok(text) => {
                    print!("{text}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("Inspect failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
