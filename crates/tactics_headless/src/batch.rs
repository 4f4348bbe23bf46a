//! Batch battle runner for balance testing.
//!
//! Runs one scenario over a range of seeds in parallel using rayon and
//! summarizes who won and by how much.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tactics_core::battle::{Side, DEFAULT_MAX_TICKS};
use tactics_core::data::GameData;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::runner::{run_battle, GameResult};
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to run.
    pub scenario: Scenario,
    /// Number of battles to run.
    pub game_count: u32,
    /// Maximum parallel battles (0 = use rayon default).
    pub parallel_games: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
    /// First seed; battle `i` uses `seed_start + i`.
    pub seed_start: u32,
    /// Ticks after which a battle counts as stalled.
    pub max_ticks: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::knight_vs_archer(),
            game_count: 100,
            parallel_games: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario.
    #[must_use]
    pub fn new(scenario: Scenario, game_count: u32) -> Self {
        Self {
            scenario,
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start.
    #[must_use]
    pub const fn with_seed(mut self, seed: u32) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Battles that finished.
    pub total_games: u32,
    /// Wins for the side acting first.
    pub first_wins: u32,
    /// Wins for the side acting second.
    pub second_wins: u32,
    /// Share of battles the first side won.
    pub first_win_rate: f64,
    /// Mean damage dealt to the loser.
    pub average_damage: f64,
    /// Mean battle length in ticks.
    pub average_ticks: f64,
    /// Longest battle in ticks.
    pub max_ticks: u64,
}

impl BatchSummary {
    /// Summarize finished battles.
    #[must_use]
    pub fn from_games(games: &[GameResult]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let total = games.len() as f64;
        let first_wins = games.iter().filter(|g| g.winner == Side::First).count() as u32;
        let damage: i64 = games
            .iter()
            .map(|g| i64::from(g.report.damage_dealt_to_losing_player))
            .sum();
        let ticks: u64 = games.iter().map(|g| g.ticks).sum();

        Self {
            total_games: games.len() as u32,
            first_wins,
            second_wins: games.len() as u32 - first_wins,
            first_win_rate: f64::from(first_wins) / total,
            average_damage: damage as f64 / total,
            average_ticks: ticks as f64 / total,
            max_ticks: games.iter().map(|g| g.ticks).max().unwrap_or(0),
        }
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual battle results, in seed order.
    pub games: Vec<GameResult>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Battles that failed.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// A battle that did not finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Battle index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u32,
    /// Error message.
    pub message: String,
}

/// Run a batch of battles.
pub fn run_batch(data: &Arc<GameData>, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        scenario = %config.scenario.name,
        games = config.game_count,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    let run = || -> Vec<std::result::Result<GameResult, BatchError>> {
        (0..config.game_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(i);
                let result = run_battle(data, &config.scenario, seed, config.max_ticks);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 100 == 0 {
                    debug!(done, total = config.game_count, "Batch progress");
                }
                result.map_err(|e| {
                    warn!(game = i, seed, error = %e, "Battle failed");
                    BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    }
                })
            })
            .collect()
    };

    let outcomes = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!(error = %e, "Failed to build thread pool, using the global one");
                run()
            }
        }
    } else {
        run()
    };

    let mut games = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(game) => games.push(game),
            Err(e) => errors.push(e),
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        games = games.len(),
        failed = errors.len(),
        first_win_rate = summary.first_win_rate,
        duration_seconds,
        "Batch complete"
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Check that a seed gives the same battle every time.
///
/// # Errors
///
/// Returns the first battle error.
pub fn verify_determinism(
    data: &Arc<GameData>,
    scenario: &Scenario,
    seed: u32,
    runs: u32,
) -> Result<bool> {
    let first = run_battle(data, scenario, seed, DEFAULT_MAX_TICKS)?;
    for _ in 1..runs {
        if run_battle(data, scenario, seed, DEFAULT_MAX_TICKS)? != first {
            return Ok(false);
        }
    }
    Ok(true)
}
