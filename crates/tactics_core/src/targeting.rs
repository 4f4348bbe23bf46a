//! Target selection for main abilities.

use crate::data::TargetChoice;
use crate::rng::RandomStream;
use crate::unit::{Unit, UnitHandle};

/// Width of the health-percentage bucket around the extreme, in points.
pub const HEALTH_BUCKET_POINTS: i32 = 20;

/// A living unit that can be targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Battle handle.
    pub handle: UnitHandle,
    /// Field slot.
    pub slot_id: i32,
    /// Health as a percentage of maximum.
    pub health_percentage: i32,
}

impl Candidate {
    /// Snapshot a unit.
    #[must_use]
    pub fn of(unit: &Unit) -> Self {
        Self {
            handle: unit.handle(),
            slot_id: unit.id().slot_id,
            health_percentage: unit.health_percentage(),
        }
    }
}

/// Pick a target among `candidates` for a caster standing in `caster_slot`.
///
/// Random and health-bucket choices draw once from `rng`; predetermined and
/// self targeting never draw. Returns `None` when there is nobody to pick.
pub fn choose_target(
    choice: TargetChoice,
    caster: UnitHandle,
    caster_slot: i32,
    candidates: &[Candidate],
    rng: &mut RandomStream,
) -> Option<UnitHandle> {
    if choice == TargetChoice::SelfTarget {
        return Some(caster);
    }
    if candidates.is_empty() {
        return None;
    }

    match choice {
        TargetChoice::SelfTarget => Some(caster),
        TargetChoice::Predetermined => candidates
            .iter()
            .find(|c| c.slot_id == caster_slot)
            .or_else(|| candidates.iter().min_by_key(|c| c.slot_id))
            .map(|c| c.handle),
        TargetChoice::Random => pick(candidates.iter(), candidates.len(), rng),
        TargetChoice::MostDamageTaken => {
            let lowest = candidates.iter().map(|c| c.health_percentage).min()?;
            let bucket: Vec<&Candidate> = candidates
                .iter()
                .filter(|c| c.health_percentage <= lowest + HEALTH_BUCKET_POINTS)
                .collect();
            pick(bucket.iter().copied(), bucket.len(), rng)
        }
        TargetChoice::LeastDamageTaken => {
            let highest = candidates.iter().map(|c| c.health_percentage).max()?;
            let bucket: Vec<&Candidate> = candidates
                .iter()
                .filter(|c| c.health_percentage >= highest - HEALTH_BUCKET_POINTS)
                .collect();
            pick(bucket.iter().copied(), bucket.len(), rng)
        }
    }
}

fn pick<'a>(
    mut candidates: impl Iterator<Item = &'a Candidate>,
    len: usize,
    rng: &mut RandomStream,
) -> Option<UnitHandle> {
    let last = i32::try_from(len).ok()?.checked_sub(1)?;
    let index = rng.next_int_in_range(0, last);
    candidates.nth(index as usize).map(|c| c.handle)
}
