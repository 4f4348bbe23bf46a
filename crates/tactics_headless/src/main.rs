//! Headless battle runner.
//!
//! # Usage
//!
//! ```bash
//! # One battle, report as JSON on stdout
//! cargo run -p tactics_headless -- run --scenario knight_vs_archer --seed 7 --replay out.replay
//!
//! # Batch balance test
//! cargo run -p tactics_headless -- batch --scenario mixed_4v4 --count 1000 --output results/
//!
//! # Re-simulate a replay
//! cargo run -p tactics_headless -- verify --file out.replay
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tactics_core::battle::DEFAULT_MAX_TICKS;
use tactics_core::data::GameData;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    record_battle, run_battle, verify_replay, Result, Scenario,
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless battle runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding abilities.ron and units.ron
    #[arg(long, global = true, default_value = "assets/data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single battle and print its report
    Run {
        /// Scenario file or built-in scenario name
        #[arg(short, long, default_value = "knight_vs_archer")]
        scenario: String,

        /// Battle seed
        #[arg(long, default_value = "12345")]
        seed: u32,

        /// Save a replay of the battle here
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Ticks before the battle counts as stalled
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },

    /// Run a batch of battles for balance testing
    Batch {
        /// Scenario file or built-in scenario name
        #[arg(short, long, default_value = "knight_vs_archer")]
        scenario: String,

        /// Number of battles to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u32,

        /// Ticks before a battle counts as stalled
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },

    /// Verify a replay, or that a seed is deterministic
    Verify {
        /// Replay file to re-simulate
        #[arg(short, long, conflicts_with = "scenario")]
        file: Option<PathBuf>,

        /// Scenario to run repeatedly instead
        #[arg(short, long)]
        scenario: Option<String>,

        /// Seed for the repeated runs
        #[arg(long, default_value = "12345")]
        seed: u32,

        /// Number of repeated runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries results.
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Run the chosen command. `Ok(false)` means a verification failed.
fn execute(cli: Cli) -> Result<bool> {
    let data = Arc::new(GameData::load_from_dir(&cli.data)?);

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            replay,
            max_ticks,
        } => {
            let scenario = Scenario::resolve(&scenario)?;
            let result = match replay {
                Some(path) => {
                    let (result, replay) = record_battle(&data, &scenario, seed, max_ticks)?;
                    replay.save(&path)?;
                    tracing::info!(path = %path.display(), "Replay saved");
                    result
                }
                None => run_battle(&data, &scenario, seed, max_ticks)?,
            };
            println!("{}", serde_json::to_string_pretty(&result.report)?);
            Ok(true)
        }
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            max_ticks,
        } => {
            let mut config = BatchConfig::new(Scenario::resolve(&scenario)?, count)
                .with_output(output.clone())
                .with_seed(seed);
            config.parallel_games = parallel;
            config.max_ticks = max_ticks;

            let results = run_batch(&data, config);
            let path = output.join("batch_results.json");
            results.save(&path)?;

            let summary = &results.summary;
            eprintln!("\n{}", "=".repeat(50));
            eprintln!("BATCH COMPLETE: {}", results.config.scenario.name);
            eprintln!("{}", "=".repeat(50));
            eprintln!("Battles:        {}", summary.total_games);
            eprintln!("Failed:         {}", results.errors.len());
            eprintln!(
                "First side won: {} ({:.1}%)",
                summary.first_wins,
                summary.first_win_rate * 100.0
            );
            eprintln!("Second side won: {}", summary.second_wins);
            eprintln!("Avg damage:     {:.2}", summary.average_damage);
            eprintln!("Avg ticks:      {:.1}", summary.average_ticks);
            eprintln!("Results:        {}", path.display());
            Ok(results.errors.is_empty())
        }
        Commands::Verify {
            file,
            scenario,
            seed,
            runs,
        } => {
            if let Some(path) = file {
                let check = verify_replay(Arc::clone(&data), &path)?;
                println!("{}", serde_json::to_string_pretty(&check)?);
                return Ok(check.matches);
            }
            let scenario = Scenario::resolve(scenario.as_deref().unwrap_or("knight_vs_archer"))?;
            let deterministic = verify_determinism(&data, &scenario, seed, runs)?;
            if deterministic {
                tracing::info!(seed, runs, scenario = %scenario.name, "Deterministic");
            } else {
                tracing::error!(seed, runs, scenario = %scenario.name, "Runs diverged");
            }
            Ok(deterministic)
        }
    }
}
