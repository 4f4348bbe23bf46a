//! Headless battle runner for balance testing and CI verification.
//!
//! Battles run without any client or server: a [`scenario::Scenario`]
//! names both rosters, a seed fixes everything else.
//!
//! - **Single runs** print the [`tactics_core::report::MatchReport`] and can
//!   save a replay
//! - **Batches** run many seeds in parallel and write JSON results
//! - **Replay verification** re-simulates a saved replay and compares the
//!   final state hash
//!
//! # Example
//!
//! ```bash
//! cargo run -p tactics_headless -- run --scenario knight_vs_archer --seed 12345
//! cargo run -p tactics_headless -- batch --scenario mixed_4v4 --count 1000 --output results/
//! cargo run -p tactics_headless -- verify --file battle.replay
//! ```

pub mod batch;
pub mod error;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary};
pub use error::{HeadlessError, Result};
pub use runner::{record_battle, run_battle, verify_replay, GameResult, ReplayCheck};
pub use scenario::Scenario;
