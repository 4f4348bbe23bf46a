//! Test fixtures and helpers.
//!
//! Shipped game data, rosters and battle setups for consistent testing.

use std::path::PathBuf;
use std::sync::Arc;

use fixed::types::I32F32;
use tactics_core::battle::{BattleSetup, BattleSimulator, RosterEntry, SideSetup};
use tactics_core::data::GameData;

/// Seed used by the knight versus archer scenario.
pub const SCENARIO_A_SEED: u32 = 12345;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Directory holding the shipped `abilities.ron` and `units.ron`.
#[must_use]
pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/data")
}

/// Load the shipped game data.
///
/// # Panics
///
/// Panics if the shipped data fails to load.
#[must_use]
pub fn shipped_data() -> Arc<GameData> {
    match GameData::load_from_dir(&data_dir()) {
        Ok(data) => Arc::new(data),
        Err(e) => panic!("shipped data failed to load: {e}"),
    }
}

/// Build a roster from unit names, filling slots from 0.
///
/// Unit ids are `first_unit_id`, `first_unit_id + 1`, ...
///
/// # Panics
///
/// Panics on an unknown unit name.
#[must_use]
pub fn roster(data: &GameData, names: &[&str], first_unit_id: i32) -> Vec<RosterEntry> {
    names
        .iter()
        .zip(0..)
        .map(|(name, slot_id)| RosterEntry {
            job_type: data
                .job_type_of(name)
                .unwrap_or_else(|| panic!("unknown unit '{name}'")),
            unit_id: first_unit_id + slot_id,
            slot_id,
        })
        .collect()
}

/// Setup for a battle between two named rosters. Player 1 goes first.
#[must_use]
pub fn duel_setup(data: &GameData, seed: u32, first: &[&str], second: &[&str]) -> BattleSetup {
    BattleSetup {
        match_id: 0,
        seed,
        first: SideSetup {
            player_id: 1,
            roster: roster(data, first, 100),
        },
        second: SideSetup {
            player_id: 2,
            roster: roster(data, second, 200),
        },
    }
}

/// One knight against one archer, seeded with [`SCENARIO_A_SEED`].
#[must_use]
pub fn knight_vs_archer(data: &GameData) -> BattleSetup {
    duel_setup(data, SCENARIO_A_SEED, &["knight"], &["archer"])
}

/// Build a simulator for `setup`.
///
/// # Panics
///
/// Panics if the setup references unknown unit types.
#[must_use]
pub fn battle(data: &Arc<GameData>, setup: BattleSetup) -> BattleSimulator {
    match BattleSimulator::new(Arc::clone(data), setup) {
        Ok(battle) => battle,
        Err(e) => panic!("failed to build battle: {e}"),
    }
}
