//! Proptest strategies.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the battle core and the server.

use proptest::prelude::*;
use tactics_core::battle::RosterEntry;
use tactics_core::math::Fixed;
use tactics_core::report::MatchReport;

/// Generate any RNG seed.
pub fn arb_seed() -> impl Strategy<Value = u32> {
    any::<u32>()
}

/// Generate a draw position within a long battle.
pub fn arb_position() -> impl Strategy<Value = u32> {
    0u32..1_000_000u32
}

/// Generate a frame delta between one millisecond and half a second.
pub fn arb_frame_delta() -> impl Strategy<Value = Fixed> {
    (1i32..500i32).prop_map(|ms| Fixed::from_num(ms) / Fixed::from_num(1000))
}

/// Generate combat stat values (0-50).
pub fn arb_stat() -> impl Strategy<Value = i32> {
    0i32..50i32
}

/// Generate a non-ignored match report.
pub fn arb_match_report() -> impl Strategy<Value = MatchReport> {
    (0i32..8, 0i32..8, 0i32..10, 0i32..4).prop_map(|(winner, loser, damage, match_id)| {
        MatchReport::new(winner, loser, damage, match_id)
    })
}

/// Generate a roster of up to `max_len` units drawn from `job_types` types.
///
/// Slots are 0..len and unit ids are unique.
pub fn arb_roster(job_types: i32, max_len: usize) -> impl Strategy<Value = Vec<RosterEntry>> {
    proptest::collection::vec(0..job_types, 1..=max_len).prop_map(|jobs| {
        jobs.into_iter()
            .zip(0..)
            .map(|(job_type, slot_id)| RosterEntry {
                job_type,
                unit_id: slot_id,
                slot_id,
            })
            .collect()
    })
}

/// Generate a living/dead mask for one side with at least one living unit.
pub fn arb_alive_mask(max_len: usize) -> impl Strategy<Value = Vec<bool>> {
    proptest::collection::vec(any::<bool>(), 1..=max_len)
        .prop_filter("at least one living unit", |mask| mask.iter().any(|alive| *alive))
}

/// Counts of players entering a pairing pass.
#[derive(Debug, Clone, Copy)]
pub struct PlayerMix {
    /// Alive human players.
    pub humans: usize,
    /// Alive AI players.
    pub alive_ai: usize,
    /// Dead AI players.
    pub dead_ai: usize,
}

/// Generate a mix of up to eight players that can always be paired.
///
/// An odd human needs some AI to face, and an odd AI needs a dead AI.
pub fn arb_player_mix() -> impl Strategy<Value = PlayerMix> {
    (0usize..=8, 0usize..=8, 0usize..=8)
        .prop_filter("at most eight players", |(h, a, d)| h + a + d <= 8)
        .prop_filter("pairable", |&(humans, alive_ai, dead_ai)| {
            let (odd_human_ai, remaining_ai) = if humans % 2 == 1 {
                (alive_ai + dead_ai > 0, alive_ai.saturating_sub(1))
            } else {
                (true, alive_ai)
            };
            odd_human_ai && (remaining_ai % 2 == 0 || dead_ai > 0)
        })
        .prop_map(|(humans, alive_ai, dead_ai)| PlayerMix {
            humans,
            alive_ai,
            dead_ai,
        })
}
