//! Client-side battle simulation.
//!
//! Both participants of a match run a [`BattleSimulator`] from the same
//! [`BattleSetup`]. Everything that can differ between two runs (turn order,
//! target picks, chance rolls) comes from the seeded [`RandomStream`], so the
//! two simulations reach the same [`MatchReport`].
//!
//! # Determinism
//!
//! - Time advances in fixed steps of [`frame_delta`]
//! - Units update in handle order, first side before second side
//! - Ability events are applied right after the unit that produced them
//!
//! # Example
//!
//! ```ignore
//! let setup = BattleSetup::from_perspective(match_id, seed, goes_first, own, enemy);
//! let mut battle = BattleSimulator::new(data, setup)?;
//! let report = battle.run_to_completion(DEFAULT_MAX_TICKS)?;
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ability::{apply_percent_damage, AbilityEvent, AbilityInstance};
use crate::data::{EffectKind, GameData, TargetAlliance, TargetChoice};
use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::report::MatchReport;
use crate::rng::RandomStream;
use crate::targeting::{choose_target, Candidate};
use crate::unit::{TurnSignal, Unit, UnitHandle, UnitId};

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 20;

/// Tick budget used when a caller has no better bound: 30 simulated minutes.
pub const DEFAULT_MAX_TICKS: u64 = TICK_RATE as u64 * 60 * 30;

/// Distance of each side's column from the center line.
const SIDE_OFFSET_X: i32 = 4;

/// Vertical distance between field slots.
const SLOT_SPACING_Y: i32 = 2;

/// Seconds advanced by one tick.
#[must_use]
pub fn frame_delta() -> Fixed {
    Fixed::ONE / Fixed::from_num(TICK_RATE)
}

/// One unit as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Index of the unit template.
    pub job_type: i32,
    /// Game-wide unit identifier.
    pub unit_id: i32,
    /// Field slot.
    pub slot_id: i32,
}

/// One side of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideSetup {
    /// Owning player.
    pub player_id: i32,
    /// Units on the field.
    pub roster: Vec<RosterEntry>,
}

/// Everything both participants need to run the same battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleSetup {
    /// Match this battle settles.
    pub match_id: i32,
    /// Shared seed.
    pub seed: u32,
    /// Side that acts first.
    pub first: SideSetup,
    /// Side that acts second.
    pub second: SideSetup,
}

impl BattleSetup {
    /// Build the setup from one participant's point of view.
    ///
    /// Both participants end up with identical setups as long as exactly one
    /// of them was told it goes first.
    #[must_use]
    pub fn from_perspective(
        match_id: i32,
        seed: u32,
        goes_first: bool,
        own: SideSetup,
        enemy: SideSetup,
    ) -> Self {
        let (first, second) = if goes_first { (own, enemy) } else { (enemy, own) };
        Self {
            match_id,
            seed,
            first,
            second,
        }
    }
}

/// Which side of the field a unit is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Acts first.
    First,
    /// Acts second.
    Second,
}

impl Side {
    /// The opposing side.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// Index of the first `true` in `alive`, scanning from `start` with
/// wraparound. `None` when nothing is alive.
#[must_use]
pub fn alive_index_from(alive: &[bool], start: usize) -> Option<usize> {
    let len = alive.len();
    (0..len)
        .map(|step| (start + step) % len)
        .find(|&index| alive[index])
}

/// Deterministic simulation of one battle.
#[derive(Debug, Clone)]
pub struct BattleSimulator {
    data: Arc<GameData>,
    setup: BattleSetup,
    rng: RandomStream,
    units: Vec<Unit>,
    units_going_first: Vec<UnitHandle>,
    units_going_second: Vec<UnitHandle>,
    next_index: [usize; 2],
    is_first_players_turn: bool,
    action_unit: Option<UnitHandle>,
    last_acting_side: Option<Side>,
    report: Option<MatchReport>,
    tick: u64,
    turns_taken: u64,
    sounds: Vec<String>,
}

impl BattleSimulator {
    /// Place both rosters and seed the stream.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnitType`] for a roster entry with no
    /// template.
    pub fn new(data: Arc<GameData>, setup: BattleSetup) -> Result<Self> {
        let mut units = Vec::with_capacity(setup.first.roster.len() + setup.second.roster.len());
        let units_going_first = spawn_side(&data, &setup.first, -SIDE_OFFSET_X, &mut units)?;
        let units_going_second = spawn_side(&data, &setup.second, SIDE_OFFSET_X, &mut units)?;

        let mut rng = RandomStream::default();
        rng.reseed(setup.seed);

        tracing::debug!(
            match_id = setup.match_id,
            seed = setup.seed,
            first = setup.first.player_id,
            second = setup.second.player_id,
            "Battle created"
        );

        Ok(Self {
            data,
            setup,
            rng,
            units,
            units_going_first,
            units_going_second,
            next_index: [0, 0],
            is_first_players_turn: true,
            action_unit: None,
            last_acting_side: None,
            report: None,
            tick: 0,
            turns_taken: 0,
            sounds: Vec::new(),
        })
    }

    /// Setup this battle was built from.
    #[must_use]
    pub const fn setup(&self) -> &BattleSetup {
        &self.setup
    }

    /// Every unit, indexed by handle.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, handle: UnitHandle) -> Option<&Unit> {
        self.units.get(handle.0)
    }

    /// Look up a unit for modification.
    pub fn unit_mut(&mut self, handle: UnitHandle) -> Option<&mut Unit> {
        self.units.get_mut(handle.0)
    }

    /// Handles of the side that acts first, in roster order.
    #[must_use]
    pub fn units_going_first(&self) -> &[UnitHandle] {
        &self.units_going_first
    }

    /// Handles of the side that acts second, in roster order.
    #[must_use]
    pub fn units_going_second(&self) -> &[UnitHandle] {
        &self.units_going_second
    }

    /// Handles of one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &[UnitHandle] {
        match side {
            Side::First => &self.units_going_first,
            Side::Second => &self.units_going_second,
        }
    }

    /// Side a unit belongs to.
    #[must_use]
    pub fn side_of(&self, handle: UnitHandle) -> Side {
        if handle.0 < self.units_going_first.len() {
            Side::First
        } else {
            Side::Second
        }
    }

    /// Living units on one side.
    #[must_use]
    pub fn alive_count(&self, side: Side) -> usize {
        self.side(side)
            .iter()
            .filter(|h| self.units[h.0].is_alive())
            .count()
    }

    /// Unit currently taking its turn.
    #[must_use]
    pub const fn action_unit(&self) -> Option<UnitHandle> {
        self.action_unit
    }

    /// Check whether the first side picks the next acting unit.
    #[must_use]
    pub const fn is_first_players_turn(&self) -> bool {
        self.is_first_players_turn
    }

    /// Outcome, once a side has been wiped.
    #[must_use]
    pub const fn report(&self) -> Option<&MatchReport> {
        self.report.as_ref()
    }

    /// Check whether the battle has a winner.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.report.is_some()
    }

    /// Ticks simulated so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Turns started so far.
    #[must_use]
    pub const fn turns_taken(&self) -> u64 {
        self.turns_taken
    }

    /// Shared random stream.
    #[must_use]
    pub const fn rng(&self) -> &RandomStream {
        &self.rng
    }

    /// Sounds triggered since the last call.
    pub fn drain_sounds(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sounds)
    }

    /// Pick the next living unit of `side` in round-robin order.
    ///
    /// Dead units are skipped; `None` means the whole side is dead.
    pub fn take_next_alive_unit(&mut self, side: Side) -> Option<UnitHandle> {
        let handles = self.side(side);
        let alive: Vec<bool> = handles
            .iter()
            .map(|h| self.units[h.0].is_alive())
            .collect();
        let start = self.next_index[side.index()];
        let found = alive_index_from(&alive, start)?;
        let handle = handles[found];
        self.next_index[side.index()] = (found + 1) % alive.len();
        Some(handle)
    }

    /// Advance the battle by one tick of `dt` seconds.
    ///
    /// # Errors
    ///
    /// Returns an error on bad data reached at runtime (missing alliance,
    /// invalid buff target, unknown ability) or an impossible turn pick.
    pub fn tick(&mut self, dt: Fixed) -> Result<()> {
        self.detect_winner();
        if self.report.is_none() && self.action_unit.is_none() {
            self.start_next_turn()?;
        }

        let mut turn_ending = false;
        let mut events = Vec::new();
        for index in 0..self.units.len() {
            let signal = self.units[index].battle_update(dt, &mut self.rng, &mut events)?;
            self.apply_events(&mut events)?;
            if signal == TurnSignal::TurnEnding && self.action_unit == Some(UnitHandle(index)) {
                turn_ending = true;
            }
        }

        if turn_ending {
            self.end_turn();
        }
        self.detect_winner();
        self.tick += 1;
        Ok(())
    }

    /// Tick until a side is wiped.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::BattleStalled`] after `max_ticks` ticks without a
    /// winner, or any error from [`tick`](Self::tick).
    pub fn run_to_completion(&mut self, max_ticks: u64) -> Result<MatchReport> {
        let dt = frame_delta();
        loop {
            if let Some(report) = self.report {
                return Ok(report);
            }
            if self.tick >= max_ticks {
                return Err(GameError::BattleStalled { ticks: self.tick });
            }
            self.tick(dt)?;
        }
    }

    /// Hash of all gameplay state, for comparing two runs.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.rng.hash(&mut hasher);
        self.next_index.hash(&mut hasher);
        self.is_first_players_turn.hash(&mut hasher);
        self.action_unit.hash(&mut hasher);

        self.units.len().hash(&mut hasher);
        for unit in &self.units {
            unit.handle().hash(&mut hasher);
            unit.stats().hash(&mut hasher);
            unit.position().hash(&mut hasher);
            unit.phase().hash(&mut hasher);
            unit.is_my_turn().hash(&mut hasher);
            unit.animation().hash(&mut hasher);

            for instance in unit
                .main_abilities()
                .iter()
                .chain(unit.status_effects())
                .chain(unit.debuffs())
                .chain(unit.buffs())
            {
                instance.name().hash(&mut hasher);
                instance.elapsed().hash(&mut hasher);
                instance.is_finished().hash(&mut hasher);
                instance.remaining_activations().hash(&mut hasher);
            }
        }

        if let Some(report) = &self.report {
            report.winning_player_id.hash(&mut hasher);
            report.losing_player_id.hash(&mut hasher);
            report.damage_dealt_to_losing_player.hash(&mut hasher);
        }

        hasher.finish()
    }

    fn start_next_turn(&mut self) -> Result<()> {
        let side = if self.is_first_players_turn {
            Side::First
        } else {
            Side::Second
        };
        let Some(handle) = self.take_next_alive_unit(side) else {
            return Ok(());
        };

        let unit = &self.units[handle.0];
        if !unit.is_alive() {
            return Err(GameError::DeadUnitSelected {
                player_id: unit.id().player_id,
                unit_id: unit.id().unit_id,
            });
        }

        let template = Arc::clone(self.data.ability(&unit.template().main_ability)?);
        let target = self
            .resolve_target(handle, template.target_choice(), template.target_alliance())
            .ok_or_else(|| GameError::NoTargetAvailable(template.name().to_string()))?;

        let main = AbilityInstance::new(
            template,
            handle,
            target,
            self.units[handle.0].position(),
            self.units[target.0].position(),
        );
        tracing::trace!(
            match_id = self.setup.match_id,
            unit = handle.0,
            target = target.0,
            ability = main.name(),
            "Turn started"
        );
        self.refresh_effect_positions(handle);
        self.units[handle.0].begin_turn(main);
        self.action_unit = Some(handle);
        self.last_acting_side = Some(side);
        self.turns_taken += 1;
        Ok(())
    }

    /// Aim the holder's queued effects at where their casters and targets
    /// stand now. Persistent effects may have been attached turns ago.
    fn refresh_effect_positions(&mut self, holder: UnitHandle) {
        let positions: Vec<Vec2Fixed> = self.units.iter().map(Unit::position).collect();
        for effect in self.units[holder.0].queued_effects_mut() {
            let from = positions[effect.caster().0];
            let at = positions[effect.target().0];
            effect.retarget(from, at);
        }
    }

    fn resolve_target(
        &mut self,
        caster: UnitHandle,
        choice: TargetChoice,
        alliance: Option<TargetAlliance>,
    ) -> Option<UnitHandle> {
        let own_side = self.side_of(caster);
        let pool = match alliance {
            Some(TargetAlliance::Friendly) => own_side,
            Some(TargetAlliance::Enemy) | None => own_side.other(),
        };
        let candidates: Vec<Candidate> = self
            .side(pool)
            .iter()
            .map(|h| &self.units[h.0])
            .filter(|unit| unit.is_alive())
            .map(Candidate::of)
            .collect();
        let caster_slot = self.units[caster.0].id().slot_id;
        choose_target(choice, caster, caster_slot, &candidates, &mut self.rng)
    }

    fn end_turn(&mut self) {
        if let Some(handle) = self.action_unit.take() {
            self.units[handle.0].end_turn();
        }
        self.is_first_players_turn = !self.is_first_players_turn;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(
                match_id = self.setup.match_id,
                tick = self.tick,
                state_hash = hash,
                "Turn ended"
            );
        }
    }

    fn detect_winner(&mut self) {
        if self.report.is_some() {
            return;
        }
        let first_alive = self.alive_count(Side::First);
        let second_alive = self.alive_count(Side::Second);

        let (winner, damage) = match (first_alive, second_alive) {
            (0, 0) => (self.last_acting_side.unwrap_or(Side::First), 0),
            (survivors, 0) => (Side::First, survivors),
            (0, survivors) => (Side::Second, survivors),
            _ => return,
        };
        let (winning, losing) = match winner {
            Side::First => (&self.setup.first, &self.setup.second),
            Side::Second => (&self.setup.second, &self.setup.first),
        };

        let report = MatchReport::new(
            winning.player_id,
            losing.player_id,
            i32::try_from(damage).unwrap_or(i32::MAX),
            self.setup.match_id,
        );
        tracing::info!(
            match_id = report.match_id,
            winner = report.winning_player_id,
            loser = report.losing_player_id,
            damage = report.damage_dealt_to_losing_player,
            ticks = self.tick,
            "Battle finished"
        );
        self.report = Some(report);
    }

    fn unit_checked(&self, handle: UnitHandle) -> Result<&Unit> {
        self.units
            .get(handle.0)
            .ok_or_else(|| GameError::InvalidState(format!("no unit with handle {}", handle.0)))
    }

    fn unit_checked_mut(&mut self, handle: UnitHandle) -> Result<&mut Unit> {
        self.units
            .get_mut(handle.0)
            .ok_or_else(|| GameError::InvalidState(format!("no unit with handle {}", handle.0)))
    }

    fn apply_events(&mut self, events: &mut Vec<AbilityEvent>) -> Result<()> {
        for event in events.drain(..) {
            match event {
                AbilityEvent::SetAnimation { unit, animation } => {
                    self.unit_checked_mut(unit)?.set_animation(&animation);
                }
                AbilityEvent::MoveUnit { unit, position } => {
                    self.unit_checked_mut(unit)?.set_position(position);
                }
                AbilityEvent::PlaySound { sound } => self.sounds.push(sound),
                AbilityEvent::PercentDamage {
                    ability,
                    caster,
                    target,
                    percent,
                    modifier,
                } => {
                    let caster_stats = *self.unit_checked(caster)?.stats();
                    let target_unit = self.unit_checked_mut(target)?;
                    let change =
                        apply_percent_damage(&ability, &caster_stats, target_unit, percent, modifier)?;
                    tracing::trace!(
                        ability = ability.name(),
                        caster = caster.0,
                        target = target.0,
                        change,
                        "Percent damage applied"
                    );
                }
                AbilityEvent::ApplyEffect {
                    kind,
                    ability,
                    caster,
                    target,
                } => self.apply_effect(kind, &ability, caster, target)?,
                AbilityEvent::ChangeStrength { unit, amount } => {
                    self.unit_checked_mut(unit)?.change_strength(amount);
                }
                AbilityEvent::DispelStatuses { unit } => {
                    self.unit_checked_mut(unit)?.dispel_status_effects();
                }
            }
        }
        Ok(())
    }

    /// Attach a status, buff or debuff.
    ///
    /// Buffs belong to their holder, who also casts them. Status effects and
    /// debuffs are cast by the unit that applied them.
    fn apply_effect(
        &mut self,
        kind: EffectKind,
        name: &str,
        caster: UnitHandle,
        target: UnitHandle,
    ) -> Result<()> {
        let template = Arc::clone(self.data.ability(name)?);
        let (effect_caster, holder) = match kind {
            EffectKind::Buff => {
                let holder = match template.target_choice() {
                    TargetChoice::SelfTarget => caster,
                    TargetChoice::Random => target,
                    other => {
                        return Err(GameError::InvalidBuffTarget {
                            ability: name.to_string(),
                            choice: format!("{other:?}"),
                        })
                    }
                };
                (holder, holder)
            }
            EffectKind::Status | EffectKind::Debuff => (caster, target),
        };

        if !self.unit_checked(holder)?.is_alive() {
            return Ok(());
        }
        let instance = AbilityInstance::new(
            template,
            effect_caster,
            holder,
            self.unit_checked(effect_caster)?.position(),
            self.unit_checked(holder)?.position(),
        );
        let added = self.unit_checked_mut(holder)?.add_effect(kind, instance);
        tracing::trace!(?kind, effect = name, holder = holder.0, added, "Effect applied");
        Ok(())
    }
}

fn spawn_side(
    data: &GameData,
    side: &SideSetup,
    x: i32,
    units: &mut Vec<Unit>,
) -> Result<Vec<UnitHandle>> {
    side.roster
        .iter()
        .map(|entry| {
            let template = Arc::clone(data.unit_type(entry.job_type)?);
            let handle = UnitHandle(units.len());
            let position = Vec2Fixed::from_ints(x, entry.slot_id * SLOT_SPACING_Y);
            units.push(Unit::new(
                UnitId {
                    player_id: side.player_id,
                    slot_id: entry.slot_id,
                    unit_id: entry.unit_id,
                },
                handle,
                entry.job_type,
                template,
                position,
            ));
            Ok(handle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABILITIES: &str = r#"#![enable(implicit_some)]
[
    AbilityData(
        name: "slash",
        damage_class: Physical,
        target_choice: Predetermined,
        target_alliance: Enemy,
        base_damage: 1,
        sequence: [
            TermData(at_time: 0.0, duration: 0.2, kind: Movement(movement: EnemyPos, offset: (x: -1.0))),
            TermData(at_time: 0.2, duration: 0.0, kind: Damage(damage_percent: 100)),
            TermData(at_time: 0.3, duration: 0.2, kind: Movement(movement: OriginalPos)),
        ],
    ),
    AbilityData(
        name: "tap",
        damage_class: Physical,
        target_choice: Random,
        target_alliance: Enemy,
        base_damage: 0,
        sequence: [TermData(kind: Damage(damage_percent: 100))],
    ),
]"#;

    const UNITS: &str = r#"[
    UnitData(name: "knight", main_ability: "slash", stats: UnitStats(health: 30, strength: 10, constitution: 3)),
    UnitData(name: "dummy", main_ability: "tap", stats: UnitStats(health: 5)),
]"#;

    fn data() -> Arc<GameData> {
        Arc::new(GameData::from_ron_str(ABILITIES, UNITS).unwrap())
    }

    fn side(player_id: i32, job_type: i32, count: i32) -> SideSetup {
        SideSetup {
            player_id,
            roster: (0..count)
                .map(|slot| RosterEntry {
                    job_type,
                    unit_id: player_id * 100 + slot,
                    slot_id: slot,
                })
                .collect(),
        }
    }

    #[test]
    fn test_alive_index_from_wraps_and_skips() {
        let alive = [true, false, false, true];
        assert_eq!(alive_index_from(&alive, 0), Some(0));
        assert_eq!(alive_index_from(&alive, 1), Some(3));
        assert_eq!(alive_index_from(&alive, 2), Some(3));
        assert_eq!(alive_index_from(&[false, true], 1), Some(1));
        assert_eq!(alive_index_from(&[true, false], 1), Some(0));
        assert_eq!(alive_index_from(&[false; 4], 2), None);
        assert_eq!(alive_index_from(&[], 0), None);
    }

    #[test]
    fn test_perspectives_agree() {
        let a = side(1, 0, 2);
        let b = side(2, 1, 3);
        let from_a = BattleSetup::from_perspective(7, 99, true, a.clone(), b.clone());
        let from_b = BattleSetup::from_perspective(7, 99, false, b, a);
        assert_eq!(from_a, from_b);
        assert_eq!(from_a.first.player_id, 1);
    }

    #[test]
    fn test_round_robin_skips_dead_units() {
        let setup = BattleSetup::from_perspective(1, 5, true, side(1, 0, 4), side(2, 1, 1));
        let mut battle = BattleSimulator::new(data(), setup).unwrap();
        for dead in [1, 2] {
            let handle = battle.units_going_first()[dead];
            battle.unit_mut(handle).unwrap().take_damage(1000);
        }

        let first = battle.units_going_first().to_vec();
        assert_eq!(battle.take_next_alive_unit(Side::First), Some(first[0]));
        assert_eq!(battle.take_next_alive_unit(Side::First), Some(first[3]));
        assert_eq!(battle.take_next_alive_unit(Side::First), Some(first[0]));

        for handle in [first[0], first[3]] {
            battle.unit_mut(handle).unwrap().take_damage(1000);
        }
        assert_eq!(battle.take_next_alive_unit(Side::First), None);
    }

    #[test]
    fn test_winner_damage_is_survivor_count() {
        let setup = BattleSetup::from_perspective(3, 42, true, side(1, 0, 3), side(2, 1, 1));
        let mut battle = BattleSimulator::new(data(), setup).unwrap();
        let report = battle.run_to_completion(DEFAULT_MAX_TICKS).unwrap();
        assert_eq!(report.winning_player_id, 1);
        assert_eq!(report.losing_player_id, 2);
        assert_eq!(report.damage_dealt_to_losing_player, 3);
        assert_eq!(report.match_id, 3);
        assert!(!report.ignore);
        assert_eq!(battle.alive_count(Side::Second), 0);
    }

    #[test]
    fn test_empty_side_loses_immediately() {
        let setup = BattleSetup::from_perspective(3, 1, false, side(1, 0, 0), side(2, 1, 2));
        let mut battle = BattleSimulator::new(data(), setup).unwrap();
        battle.tick(frame_delta()).unwrap();
        let report = battle.report().copied().unwrap();
        assert_eq!(report.winning_player_id, 2);
        assert_eq!(report.damage_dealt_to_losing_player, 2);
        assert_eq!(battle.turns_taken(), 0);
    }

    #[test]
    fn test_same_setup_same_hash() {
        let setup = BattleSetup::from_perspective(3, 1234, true, side(1, 0, 2), side(2, 0, 2));
        let mut a = BattleSimulator::new(data(), setup.clone()).unwrap();
        let mut b = BattleSimulator::new(data(), setup).unwrap();
        for _ in 0..200 {
            a.tick(frame_delta()).unwrap();
            b.tick(frame_delta()).unwrap();
            assert_eq!(a.state_hash(), b.state_hash());
        }
    }

    #[test]
    fn test_turns_alternate_sides() {
        let setup = BattleSetup::from_perspective(3, 8, true, side(1, 0, 1), side(2, 0, 1));
        let mut battle = BattleSimulator::new(data(), setup).unwrap();
        let mut actors = Vec::new();
        while actors.len() < 4 && !battle.is_finished() {
            battle.tick(frame_delta()).unwrap();
            if let Some(actor) = battle.action_unit() {
                if actors.last() != Some(&actor) {
                    actors.push(actor);
                }
            }
        }
        assert_eq!(
            actors,
            vec![UnitHandle(0), UnitHandle(1), UnitHandle(0), UnitHandle(1)]
        );
    }

    #[test]
    fn test_melee_returns_home() {
        let setup = BattleSetup::from_perspective(3, 8, true, side(1, 0, 1), side(2, 0, 1));
        let mut battle = BattleSimulator::new(data(), setup).unwrap();
        let home = battle.units()[0].home_position();
        let mut moved = false;
        while battle.turns_taken() < 2 {
            battle.tick(frame_delta()).unwrap();
            moved |= battle.units()[0].position() != home;
        }
        assert!(moved);
        assert_eq!(battle.units()[0].position(), home);
    }

    #[test]
    fn test_queued_effects_are_reaimed_at_turn_start() {
        let data = data();
        let setup = BattleSetup::from_perspective(3, 8, true, side(1, 0, 1), side(2, 1, 1));
        let mut battle = BattleSimulator::new(Arc::clone(&data), setup).unwrap();
        let knight = UnitHandle(0);
        let dummy = UnitHandle(1);

        let attached_at = battle.unit(dummy).unwrap().position();
        let status = AbilityInstance::new(
            Arc::clone(data.ability("tap").unwrap()),
            dummy,
            knight,
            attached_at,
            battle.unit(knight).unwrap().position(),
        );
        battle
            .unit_mut(knight)
            .unwrap()
            .add_effect(EffectKind::Status, status);

        let moved_to = Vec2Fixed::from_ints(9, 9);
        battle.unit_mut(dummy).unwrap().set_position(moved_to);
        battle.tick(frame_delta()).unwrap();

        assert_eq!(battle.action_unit(), Some(knight));
        let status = &battle.unit(knight).unwrap().status_effects()[0];
        assert_eq!(status.original_position(), moved_to);
        assert_eq!(status.cast_location(), battle.unit(knight).unwrap().home_position());
    }

    #[test]
    fn test_stall_guard() {
        let setup = BattleSetup::from_perspective(3, 8, true, side(1, 1, 1), side(2, 1, 1));
        let mut battle = BattleSimulator::new(data(), setup).unwrap();
        assert!(matches!(
            battle.run_to_completion(50),
            Err(GameError::BattleStalled { ticks: 50 })
        ));
    }
}
