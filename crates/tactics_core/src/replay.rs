//! Battle replays.
//!
//! A battle is fully determined by its [`BattleSetup`] and the game data, so
//! a replay only stores the setup plus the expected ending. Playing it back
//! re-simulates the battle and compares the final hash and report.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::battle::{frame_delta, BattleSetup, BattleSimulator};
use crate::data::GameData;
use crate::error::{GameError, Result};
use crate::report::MatchReport;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Recorded battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReplay {
    /// Replay format version.
    pub version: u32,
    /// Setup the battle started from.
    pub setup: BattleSetup,
    /// Tick at which the battle produced its report.
    pub final_tick: u64,
    /// State hash at `final_tick`.
    pub final_hash: u64,
    /// Outcome of the battle.
    pub report: Option<MatchReport>,
}

impl BattleReplay {
    /// Start a recording for `setup`.
    #[must_use]
    pub const fn new(setup: BattleSetup) -> Self {
        Self {
            version: REPLAY_VERSION,
            setup,
            final_tick: 0,
            final_hash: 0,
            report: None,
        }
    }

    /// Record the ending of a finished battle.
    pub fn finalize(&mut self, battle: &BattleSimulator) {
        self.final_tick = battle.tick_count();
        self.final_hash = battle.state_hash();
        self.report = battle.report().copied();
    }

    /// Run `setup` to completion and record it.
    ///
    /// # Errors
    ///
    /// Returns any error the battle raises, including a stall past
    /// `max_ticks`.
    pub fn record(data: Arc<GameData>, setup: BattleSetup, max_ticks: u64) -> Result<Self> {
        let mut battle = BattleSimulator::new(data, setup.clone())?;
        battle.run_to_completion(max_ticks)?;
        let mut replay = Self::new(setup);
        replay.finalize(&battle);
        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails, or the
    /// version does not match.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        Ok(replay)
    }
}

/// Re-simulates a recorded battle.
#[derive(Debug)]
pub struct BattleReplayPlayer {
    data: Arc<GameData>,
    replay: BattleReplay,
    battle: BattleSimulator,
}

impl BattleReplayPlayer {
    /// Prepare playback from the first tick.
    ///
    /// # Errors
    /// Returns an error if the setup references unknown unit types.
    pub fn new(data: Arc<GameData>, replay: BattleReplay) -> Result<Self> {
        let battle = BattleSimulator::new(Arc::clone(&data), replay.setup.clone())?;
        Ok(Self {
            data,
            replay,
            battle,
        })
    }

    /// Advance one tick. Returns `true` while ticks remain.
    ///
    /// # Errors
    /// Propagates battle errors.
    pub fn advance(&mut self) -> Result<bool> {
        if self.is_finished() {
            return Ok(false);
        }
        self.battle.tick(frame_delta())?;
        Ok(!self.is_finished())
    }

    /// Restart and play up to `target_tick`.
    ///
    /// # Errors
    /// Propagates battle errors.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        self.battle = BattleSimulator::new(Arc::clone(&self.data), self.replay.setup.clone())?;
        let target = target_tick.min(self.replay.final_tick);
        while self.battle.tick_count() < target {
            self.battle.tick(frame_delta())?;
        }
        Ok(())
    }

    /// Current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.battle.tick_count()
    }

    /// Battle being played.
    #[must_use]
    pub const fn battle(&self) -> &BattleSimulator {
        &self.battle
    }

    /// Replay being played.
    #[must_use]
    pub const fn replay(&self) -> &BattleReplay {
        &self.replay
    }

    /// Check whether playback reached the recorded end.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.battle.tick_count() >= self.replay.final_tick
    }

    /// Replay to the end and compare hash and report.
    ///
    /// # Errors
    /// Propagates battle errors.
    pub fn verify(&mut self) -> Result<bool> {
        self.seek(self.replay.final_tick)?;
        let hash_matches = self.battle.state_hash() == self.replay.final_hash;
        let report_matches = match (self.battle.report(), &self.replay.report) {
            (Some(actual), Some(expected)) => actual == expected,
            (None, None) => true,
            _ => false,
        };
        Ok(hash_matches && report_matches)
    }

    /// Playback progress from 0 to 100.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.final_tick == 0 {
            100.0
        } else {
            (self.current_tick() as f64 / self.replay.final_tick as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{RosterEntry, SideSetup, DEFAULT_MAX_TICKS};

    const ABILITIES: &str = r#"#![enable(implicit_some)]
[
    AbilityData(
        name: "jab",
        damage_class: Physical,
        target_choice: Random,
        target_alliance: Enemy,
        base_damage: 1,
        sequence: [
            TermData(at_time: 0.0, duration: 0.1, kind: Anim(animation: "attack")),
            TermData(at_time: 0.1, kind: Damage(damage_percent: 100)),
        ],
    ),
]"#;

    const UNITS: &str = r#"[
    UnitData(name: "brawler", main_ability: "jab", stats: UnitStats(health: 12, strength: 4, constitution: 1)),
]"#;

    fn data() -> Arc<GameData> {
        Arc::new(GameData::from_ron_str(ABILITIES, UNITS).unwrap())
    }

    fn setup() -> BattleSetup {
        let side = |player_id: i32| SideSetup {
            player_id,
            roster: (0..2)
                .map(|slot| RosterEntry {
                    job_type: 0,
                    unit_id: player_id * 10 + slot,
                    slot_id: slot,
                })
                .collect(),
        };
        BattleSetup::from_perspective(1, 777, true, side(1), side(2))
    }

    #[test]
    fn test_record_and_verify() {
        let replay = BattleReplay::record(data(), setup(), DEFAULT_MAX_TICKS).unwrap();
        assert!(replay.final_tick > 0);
        assert!(replay.report.is_some());

        let mut player = BattleReplayPlayer::new(data(), replay).unwrap();
        assert!(player.verify().unwrap());
        assert!(player.is_finished());
    }

    #[test]
    fn test_tampered_replay_fails_verification() {
        let mut replay = BattleReplay::record(data(), setup(), DEFAULT_MAX_TICKS).unwrap();
        replay.final_hash ^= 1;
        let mut player = BattleReplayPlayer::new(data(), replay).unwrap();
        assert!(!player.verify().unwrap());
    }

    #[test]
    fn test_advance_and_seek() {
        let replay = BattleReplay::record(data(), setup(), DEFAULT_MAX_TICKS).unwrap();
        let final_tick = replay.final_tick;
        let mut player = BattleReplayPlayer::new(data(), replay).unwrap();

        assert!(player.advance().unwrap());
        assert_eq!(player.current_tick(), 1);

        player.seek(final_tick / 2).unwrap();
        assert_eq!(player.current_tick(), final_tick / 2);

        while player.advance().unwrap() {}
        assert_eq!(player.current_tick(), final_tick);
        assert!((player.progress_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_save_load_round_trip() {
        let replay = BattleReplay::record(data(), setup(), DEFAULT_MAX_TICKS).unwrap();
        let path = std::env::temp_dir().join(format!("battle_replay_{}.bin", std::process::id()));
        replay.save(&path).unwrap();

        let loaded = BattleReplay::load(&path).unwrap();
        assert_eq!(loaded.setup, replay.setup);
        assert_eq!(loaded.final_tick, replay.final_tick);
        assert_eq!(loaded.final_hash, replay.final_hash);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let mut replay = BattleReplay::new(setup());
        replay.version = REPLAY_VERSION + 1;
        let path = std::env::temp_dir().join(format!("battle_replay_v_{}.bin", std::process::id()));
        replay.save(&path).unwrap();
        assert!(BattleReplay::load(&path).is_err());
        let _ = std::fs::remove_file(path);
    }
}
