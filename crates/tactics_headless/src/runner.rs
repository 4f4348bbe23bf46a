//! Single battle runs and replay checks.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tactics_core::battle::{BattleSimulator, Side};
use tactics_core::data::GameData;
use tactics_core::replay::{BattleReplay, BattleReplayPlayer};
use tactics_core::report::MatchReport;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::scenario::{Scenario, FIRST_PLAYER_ID};

/// Outcome of one headless battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    /// Seed the battle ran with.
    pub seed: u32,
    /// Side that won.
    pub winner: Side,
    /// The report both peers would send.
    pub report: MatchReport,
    /// Ticks until the report.
    pub ticks: u64,
    /// Turns taken.
    pub turns: u64,
    /// Final state hash.
    pub final_hash: u64,
}

/// Run one battle of `scenario` to completion.
///
/// # Errors
///
/// Returns setup errors and [`tactics_core::error::GameError::BattleStalled`].
pub fn run_battle(
    data: &Arc<GameData>,
    scenario: &Scenario,
    seed: u32,
    max_ticks: u64,
) -> Result<GameResult> {
    let setup = scenario.to_setup(data, 0, seed)?;
    let mut battle = BattleSimulator::new(Arc::clone(data), setup)?;
    let report = battle.run_to_completion(max_ticks)?;
    Ok(result_of(seed, &battle, report))
}

/// Run one battle and keep a replay of it.
///
/// # Errors
///
/// Same as [`run_battle`].
pub fn record_battle(
    data: &Arc<GameData>,
    scenario: &Scenario,
    seed: u32,
    max_ticks: u64,
) -> Result<(GameResult, BattleReplay)> {
    let setup = scenario.to_setup(data, 0, seed)?;
    let mut replay = BattleReplay::new(setup.clone());
    let mut battle = BattleSimulator::new(Arc::clone(data), setup)?;
    let report = battle.run_to_completion(max_ticks)?;
    replay.finalize(&battle);
    Ok((result_of(seed, &battle, report), replay))
}

fn result_of(seed: u32, battle: &BattleSimulator, report: MatchReport) -> GameResult {
    let winner = if report.winning_player_id == FIRST_PLAYER_ID {
        Side::First
    } else {
        Side::Second
    };
    debug!(seed, %report, ticks = battle.tick_count(), "Battle finished");
    GameResult {
        seed,
        winner,
        report,
        ticks: battle.tick_count(),
        turns: battle.turns_taken(),
        final_hash: battle.state_hash(),
    }
}

/// Result of re-simulating a saved replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCheck {
    /// Ticks re-simulated.
    pub ticks: u64,
    /// Hash stored in the replay.
    pub expected_hash: u64,
    /// Hash after re-simulation.
    pub actual_hash: u64,
    /// Hash and report both match.
    pub matches: bool,
}

/// Load a replay and re-simulate it against `data`.
///
/// # Errors
///
/// Returns load errors and battle errors.
pub fn verify_replay(data: Arc<GameData>, path: &Path) -> Result<ReplayCheck> {
    let replay = BattleReplay::load(path)?;
    let expected_hash = replay.final_hash;
    let mut player = BattleReplayPlayer::new(data, replay)?;
    let matches = player.verify()?;
    let check = ReplayCheck {
        ticks: player.current_tick(),
        expected_hash,
        actual_hash: player.battle().state_hash(),
        matches,
    };
    if matches {
        info!(path = %path.display(), ticks = check.ticks, "Replay verified");
    } else {
        warn!(
            path = %path.display(),
            expected = check.expected_hash,
            actual = check.actual_hash,
            "Replay diverged"
        );
    }
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::battle::DEFAULT_MAX_TICKS;
    use tactics_test_utils::fixtures::shipped_data;

    #[test]
    fn test_run_battle_is_repeatable() {
        let data = shipped_data();
        let scenario = Scenario::mixed_4v4();
        let a = run_battle(&data, &scenario, 42, DEFAULT_MAX_TICKS).unwrap();
        let b = run_battle(&data, &scenario, 42, DEFAULT_MAX_TICKS).unwrap();
        assert_eq!(a, b);
        assert!(a.report.damage_dealt_to_losing_player >= 0);
    }

    #[test]
    fn test_knight_beats_archer() {
        let data = shipped_data();
        let result = run_battle(&data, &Scenario::knight_vs_archer(), 12345, DEFAULT_MAX_TICKS)
            .unwrap();
        assert_eq!(result.winner, Side::First);
        assert_eq!(result.report.winning_player_id, FIRST_PLAYER_ID);
        assert_eq!(result.report.damage_dealt_to_losing_player, 1);
        assert_eq!(result.turns, 5);
    }

    #[test]
    fn test_recorded_replay_verifies_from_disk() {
        let data = shipped_data();
        let (result, replay) =
            record_battle(&data, &Scenario::mixed_4v4(), 9, DEFAULT_MAX_TICKS).unwrap();
        assert_eq!(replay.final_hash, result.final_hash);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("battle.replay");
        replay.save(&path).unwrap();

        let check = verify_replay(data, &path).unwrap();
        assert!(check.matches);
        assert_eq!(check.ticks, result.ticks);
        assert_eq!(check.actual_hash, check.expected_hash);
    }

    #[test]
    fn test_stall_is_an_error() {
        let data = shipped_data();
        assert!(run_battle(&data, &Scenario::mixed_4v4(), 1, 2).is_err());
    }
}
