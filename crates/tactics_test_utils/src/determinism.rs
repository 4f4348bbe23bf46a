//! Battle determinism checks.
//!
//! Both participants of a match simulate the same battle on their own
//! machines and the server only compares the outcomes, so two runs of one
//! [`BattleSimulator`] setup must never split. The helpers here run a setup
//! several ways and compare [`BattleFingerprint`]s.
//!
//! Ways a battle can split:
//!
//! - **Floating-point math**: everything runs on [`tactics_core::math::Fixed`]
//! - **Map iteration order**: templates live in ordered maps, units in vectors
//! - **System randomness**: every draw comes from the seeded
//!   [`tactics_core::rng::RandomStream`]
//!
//! Checks run back to back ([`run_sequential_battles`]), on scoped threads
//! ([`run_parallel_battles_scoped`]) and tick by tick
//! ([`find_first_divergence`]).

use std::panic;
use std::thread;

use tactics_core::battle::{frame_delta, BattleSimulator};

/// Where a battle ended up after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BattleFingerprint {
    /// [`BattleSimulator::state_hash`] at the end of the run.
    pub hash: u64,
    /// Ticks actually simulated.
    pub ticks: u64,
    /// Turns started.
    pub turns: u64,
    /// Whether a side had been wiped.
    pub finished: bool,
}

impl BattleFingerprint {
    /// Capture the current state of `battle`.
    #[must_use]
    pub fn of(battle: &BattleSimulator) -> Self {
        Self {
            hash: battle.state_hash(),
            ticks: battle.tick_count(),
            turns: battle.turns_taken(),
            finished: battle.is_finished(),
        }
    }
}

/// Fingerprints of several runs of one setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleRuns {
    /// One fingerprint per run, in run order.
    pub runs: Vec<BattleFingerprint>,
}

impl BattleRuns {
    /// Check that every run ended in the same state.
    #[must_use]
    pub fn agree(&self) -> bool {
        self.runs.windows(2).all(|w| w[0] == w[1])
    }

    /// Distinct end states, sorted by hash.
    #[must_use]
    pub fn distinct(&self) -> Vec<BattleFingerprint> {
        let mut distinct = self.runs.clone();
        distinct.sort_unstable_by_key(|run| (run.hash, run.ticks, run.turns));
        distinct.dedup();
        distinct
    }

    /// # Panics
    ///
    /// Panics listing the distinct end states when the runs split.
    pub fn assert_agree(&self) {
        if !self.agree() {
            let distinct = self.distinct();
            panic!(
                "Battle runs diverged!\n\
                 Runs: {}\n\
                 Distinct end states: {} (expected 1)\n\
                 {:#?}",
                self.runs.len(),
                distinct.len(),
                distinct
            );
        }
    }
}

/// Advance a battle by one frame, doing nothing once it is decided.
///
/// # Panics
///
/// Panics if the battle returns an error.
pub fn step_battle(battle: &mut BattleSimulator) {
    if battle.is_finished() {
        return;
    }
    if let Err(e) = battle.tick(frame_delta()) {
        panic!("battle failed at tick {}: {e}", battle.tick_count());
    }
}

/// Step `battle` for up to `num_ticks` frames and fingerprint the result.
pub fn run_for(battle: &mut BattleSimulator, num_ticks: u64) -> BattleFingerprint {
    for _ in 0..num_ticks {
        if battle.is_finished() {
            break;
        }
        step_battle(battle);
    }
    BattleFingerprint::of(battle)
}

/// Build and run `num_runs` battles one after another.
pub fn run_sequential_battles<F>(build: F, num_runs: usize, num_ticks: u64) -> BattleRuns
where
    F: Fn() -> BattleSimulator,
{
    let runs = (0..num_runs)
        .map(|_| run_for(&mut build(), num_ticks))
        .collect();
    BattleRuns { runs }
}

/// Run the battle from `build` twice and compare end states.
///
/// # Example
///
/// ```ignore
/// use tactics_test_utils::determinism::verify_battle_determinism;
/// use tactics_test_utils::fixtures::{battle, knight_vs_archer, shipped_data};
///
/// let data = shipped_data();
/// assert!(verify_battle_determinism(|| battle(&data, knight_vs_archer(&data)), 400));
/// ```
pub fn verify_battle_determinism<F>(build: F, num_ticks: u64) -> bool
where
    F: Fn() -> BattleSimulator,
{
    run_sequential_battles(build, 2, num_ticks).agree()
}

/// Run `num_battles` battles on scoped threads.
///
/// Catches state that leaks between threads or depends on memory layout.
///
/// # Panics
///
/// Re-raises the panic of any battle thread.
pub fn run_parallel_battles_scoped<F>(build: F, num_battles: usize, num_ticks: u64) -> BattleRuns
where
    F: Fn() -> BattleSimulator + Sync,
{
    let runs = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| s.spawn(|| run_for(&mut build(), num_ticks)))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect()
    });
    BattleRuns { runs }
}

/// Step two copies of a battle side by side and report the first tick at
/// which their state hashes differ.
///
/// `Some(0)` means the freshly built battles already differ.
pub fn find_first_divergence<F>(build: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> BattleSimulator,
{
    let mut first = build();
    let mut second = build();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        step_battle(&mut first);
        step_battle(&mut second);

        if first.state_hash() != second.state_hash() {
            tracing::warn!(tick, "Battles diverged");
            return Some(tick);
        }
        if first.is_finished() && second.is_finished() {
            break;
        }
    }

    None
}
