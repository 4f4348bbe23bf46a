//! Server-side stand-in for AI players.
//!
//! An AI seat has no client, so the server runs the AI's half of the match
//! itself. It simulates the same battle a human client would, from the AI's
//! point of view, and files the AI's report like any other.

use std::sync::Arc;

use tactics_core::battle::{BattleSetup, BattleSimulator};
use tactics_core::data::GameData;
use tactics_core::error::Result;
use tactics_core::report::MatchReport;

use crate::player::Player;

/// Simulates battles on behalf of AI players.
#[derive(Debug, Clone)]
pub struct AiProxy {
    data: Arc<GameData>,
    max_ticks: u64,
}

impl AiProxy {
    /// Create a proxy that gives up on battles after `max_ticks`.
    #[must_use]
    pub const fn new(data: Arc<GameData>, max_ticks: u64) -> Self {
        Self { data, max_ticks }
    }

    /// Report `ai` files for its match against `opponent`.
    ///
    /// # Errors
    ///
    /// Returns any battle error, including a stall.
    pub fn report_for(
        &self,
        match_id: i32,
        seed: u32,
        ai: &Player,
        ai_goes_first: bool,
        opponent: &Player,
    ) -> Result<MatchReport> {
        let setup =
            BattleSetup::from_perspective(match_id, seed, ai_goes_first, ai.side(), opponent.side());
        self.simulate(setup)
    }

    /// Run `setup` to completion.
    ///
    /// # Errors
    ///
    /// Returns any battle error, including a stall.
    pub fn simulate(&self, setup: BattleSetup) -> Result<MatchReport> {
        let match_id = setup.match_id;
        let mut battle = BattleSimulator::new(Arc::clone(&self.data), setup)?;
        let report = battle.run_to_completion(self.max_ticks)?;
        tracing::debug!(match_id, %report, ticks = battle.tick_count(), "AI battle simulated");
        Ok(report)
    }
}
