//! Combatants and their per-turn sequencing.
//!
//! A unit owns every ability instance attached to it. On its turn it plays
//! them in a fixed order:
//!
//! ```text
//! Idle ──begin_turn──► Status ──all statuses + debuffs finished──► Buffs ──all buffs finished──► Main
//!  ▲                                                                                              │
//!  └──────────────────────────────────end_turn ◄── TurnEnding (main list empty, or unit dead) ◄───┘
//! ```
//!
//! Phases are re-checked every tick and fall through within the same tick
//! when the current collection is already finished.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ability::{AbilityEvent, AbilityInstance};
use crate::data::{EffectKind, UnitData, UnitStats};
use crate::error::Result;
use crate::math::{tenths_of_second, Fixed, Vec2Fixed};
use crate::rng::RandomStream;

/// Animation a unit shows when nothing else is bound.
pub const IDLE_ANIMATION: &str = "idle";

/// Seconds a damage number stays visible.
pub const DAMAGE_DISPLAY_SECONDS: i32 = 1;

/// Index of a unit inside one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitHandle(pub usize);

/// Network identity of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId {
    /// Owning player.
    pub player_id: i32,
    /// Field slot on the owner's side.
    pub slot_id: i32,
    /// Game-wide unit identifier.
    pub unit_id: i32,
}

/// Where a unit is within its own turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TurnPhase {
    /// Not acting.
    #[default]
    Idle,
    /// Playing status effects and debuffs.
    Status,
    /// Playing buffs.
    Buffs,
    /// Playing the main ability.
    Main,
}

/// Result of one unit update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    /// Keep going.
    Continue,
    /// The acting unit is done; hand the turn on.
    TurnEnding,
}

/// Most recent damage taken, kept for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DamageTracker {
    /// Health lost by the last hit.
    pub amount: i32,
    /// Seconds the number stays visible.
    pub remaining: Fixed,
}

/// A combatant on the battle field.
#[derive(Debug, Clone)]
pub struct Unit {
    id: UnitId,
    handle: UnitHandle,
    job_type: i32,
    template: Arc<UnitData>,
    stats: UnitStats,
    max_health: i32,
    position: Vec2Fixed,
    home_position: Vec2Fixed,
    animation: String,
    animation_timer: Fixed,
    damage_tracker: Option<DamageTracker>,
    is_my_turn: bool,
    phase: TurnPhase,
    main_abilities: Vec<AbilityInstance>,
    debuffs: Vec<AbilityInstance>,
    buffs: Vec<AbilityInstance>,
    status_effects: Vec<AbilityInstance>,
}

impl Unit {
    /// Create a fresh unit from its template.
    #[must_use]
    pub fn new(
        id: UnitId,
        handle: UnitHandle,
        job_type: i32,
        template: Arc<UnitData>,
        position: Vec2Fixed,
    ) -> Self {
        let stats = template.stats;
        Self {
            id,
            handle,
            job_type,
            max_health: template.max_health(),
            template,
            stats,
            position,
            home_position: position,
            animation: IDLE_ANIMATION.to_string(),
            animation_timer: Fixed::ZERO,
            damage_tracker: None,
            is_my_turn: false,
            phase: TurnPhase::Idle,
            main_abilities: Vec::new(),
            debuffs: Vec::new(),
            buffs: Vec::new(),
            status_effects: Vec::new(),
        }
    }

    /// Network identity.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Battle index.
    #[must_use]
    pub const fn handle(&self) -> UnitHandle {
        self.handle
    }

    /// Wire job type.
    #[must_use]
    pub const fn job_type(&self) -> i32 {
        self.job_type
    }

    /// Unit template.
    #[must_use]
    pub fn template(&self) -> &Arc<UnitData> {
        &self.template
    }

    /// Current stats.
    #[must_use]
    pub const fn stats(&self) -> &UnitStats {
        &self.stats
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> i32 {
        self.stats.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> i32 {
        self.max_health
    }

    /// Check whether the unit still has health.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.stats.health > 0
    }

    /// Health as a whole-number percentage of maximum.
    #[must_use]
    pub fn health_percentage(&self) -> i32 {
        if self.max_health <= 0 {
            return 0;
        }
        (i64::from(self.stats.health) * 100 / i64::from(self.max_health)) as i32
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Position the unit was placed at.
    #[must_use]
    pub const fn home_position(&self) -> Vec2Fixed {
        self.home_position
    }

    /// Move the unit.
    pub fn set_position(&mut self, position: Vec2Fixed) {
        self.position = position;
    }

    /// Bound animation name.
    #[must_use]
    pub fn animation(&self) -> &str {
        &self.animation
    }

    /// Seconds since the animation was bound.
    #[must_use]
    pub const fn animation_timer(&self) -> Fixed {
        self.animation_timer
    }

    /// Bind an animation and restart its timer.
    pub fn set_animation(&mut self, animation: &str) {
        if self.animation != animation {
            animation.clone_into(&mut self.animation);
        }
        self.animation_timer = Fixed::ZERO;
    }

    /// Last damage taken, while still visible.
    #[must_use]
    pub const fn damage_tracker(&self) -> Option<DamageTracker> {
        self.damage_tracker
    }

    /// Check whether this unit is the acting unit.
    #[must_use]
    pub const fn is_my_turn(&self) -> bool {
        self.is_my_turn
    }

    /// Current turn phase.
    #[must_use]
    pub const fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Active main abilities.
    #[must_use]
    pub fn main_abilities(&self) -> &[AbilityInstance] {
        &self.main_abilities
    }

    /// Active status effects.
    #[must_use]
    pub fn status_effects(&self) -> &[AbilityInstance] {
        &self.status_effects
    }

    /// Active buffs.
    #[must_use]
    pub fn buffs(&self) -> &[AbilityInstance] {
        &self.buffs
    }

    /// Active debuffs.
    #[must_use]
    pub fn debuffs(&self) -> &[AbilityInstance] {
        &self.debuffs
    }

    /// Lose up to `amount` health. Returns the health actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let lost = amount.clamp(0, self.stats.health.max(0));
        self.stats.health -= lost;
        self.damage_tracker = Some(DamageTracker {
            amount: lost,
            remaining: Fixed::from_num(DAMAGE_DISPLAY_SECONDS),
        });
        lost
    }

    /// Regain up to `amount` health. Returns the health actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let gained = amount.clamp(0, (self.max_health - self.stats.health).max(0));
        self.stats.health += gained;
        gained
    }

    /// Add to strength.
    pub fn change_strength(&mut self, amount: i32) {
        self.stats.strength = self.stats.strength.saturating_add(amount);
    }

    /// Attach a secondary ability.
    ///
    /// Returns `false` without attaching when an instance with the same name
    /// is already active in that collection.
    pub fn add_effect(&mut self, kind: EffectKind, instance: AbilityInstance) -> bool {
        let collection = self.effects_mut(kind);
        if collection.iter().any(|active| active.name() == instance.name()) {
            return false;
        }
        collection.push(instance);
        true
    }

    /// Mark every status effect dispelled.
    pub fn dispel_status_effects(&mut self) {
        for status in &mut self.status_effects {
            status.dispel();
        }
    }

    /// Status effects, debuffs and buffs, in play order.
    pub fn queued_effects_mut(&mut self) -> impl Iterator<Item = &mut AbilityInstance> + '_ {
        self.status_effects
            .iter_mut()
            .chain(self.debuffs.iter_mut())
            .chain(self.buffs.iter_mut())
    }

    fn effects_mut(&mut self, kind: EffectKind) -> &mut Vec<AbilityInstance> {
        match kind {
            EffectKind::Status => &mut self.status_effects,
            EffectKind::Debuff => &mut self.debuffs,
            EffectKind::Buff => &mut self.buffs,
        }
    }

    /// Start this unit's turn with `main` as its main ability.
    ///
    /// Queued effects are staggered so they play one after another: status
    /// effects then debuffs back to back with a 0.1 s gap, and buffs from
    /// 0.2 s into their phase with the same gap.
    pub fn begin_turn(&mut self, main: AbilityInstance) {
        self.is_my_turn = true;
        self.phase = TurnPhase::Status;
        self.main_abilities.push(main);

        let gap = tenths_of_second(1);
        let mut offset = Fixed::ZERO;
        for effect in self.status_effects.iter_mut().chain(self.debuffs.iter_mut()) {
            effect.set_start_offset(offset);
            offset += effect.lifetime() + gap;
        }

        let mut offset = tenths_of_second(2);
        for buff in &mut self.buffs {
            buff.set_start_offset(offset);
            offset += buff.lifetime() + gap;
        }
    }

    /// Finish this unit's turn.
    ///
    /// Persistent effects that still have activations left rewind to play
    /// again on the next turn.
    pub fn end_turn(&mut self) {
        self.is_my_turn = false;
        self.phase = TurnPhase::Idle;
        self.main_abilities.clear();

        for effect in self.queued_effects_mut() {
            if effect.is_finished() && effect.remaining_activations() > 1 {
                effect.consume_activation();
                effect.reset_to_start();
            }
        }
    }

    /// Advance the unit by one tick.
    ///
    /// # Errors
    ///
    /// Propagates ability update errors.
    pub fn battle_update(
        &mut self,
        dt: Fixed,
        rng: &mut RandomStream,
        events: &mut Vec<AbilityEvent>,
    ) -> Result<TurnSignal> {
        self.housekeeping(dt);

        if !self.is_my_turn {
            self.cleanup();
            return Ok(TurnSignal::Continue);
        }
        if !self.is_alive() {
            self.cleanup();
            return Ok(TurnSignal::TurnEnding);
        }

        let position = self.position;
        if self.phase == TurnPhase::Status {
            if all_finished(&self.status_effects) && all_finished(&self.debuffs) {
                self.phase = TurnPhase::Buffs;
            } else {
                for effect in self
                    .status_effects
                    .iter_mut()
                    .chain(self.debuffs.iter_mut())
                {
                    effect.update(dt, position, rng, events)?;
                }
            }
        }
        if self.phase == TurnPhase::Buffs {
            if all_finished(&self.buffs) {
                self.phase = TurnPhase::Main;
            } else {
                for buff in &mut self.buffs {
                    buff.update(dt, position, rng, events)?;
                }
            }
        }
        if self.phase == TurnPhase::Main {
            for main in &mut self.main_abilities {
                main.update(dt, position, rng, events)?;
            }
        }

        self.cleanup();

        let main_done = self.phase == TurnPhase::Main && self.main_abilities.is_empty();
        if main_done || !self.is_alive() {
            Ok(TurnSignal::TurnEnding)
        } else {
            Ok(TurnSignal::Continue)
        }
    }

    fn housekeeping(&mut self, dt: Fixed) {
        self.animation_timer += dt;
        if let Some(tracker) = &mut self.damage_tracker {
            tracker.remaining -= dt;
            if tracker.remaining <= Fixed::ZERO {
                self.damage_tracker = None;
            }
        }
    }

    /// Drop instances that are done.
    fn cleanup(&mut self) {
        if !self.is_alive() {
            self.main_abilities.clear();
            self.status_effects.clear();
            self.debuffs.clear();
            self.buffs.clear();
            return;
        }

        self.main_abilities.retain(|a| !a.is_dispelled() && !a.is_finished());
        for collection in [
            &mut self.status_effects,
            &mut self.debuffs,
            &mut self.buffs,
        ] {
            collection.retain(|effect| {
                !effect.is_dispelled()
                    && !(effect.is_finished() && effect.remaining_activations() <= 1)
            });
        }
    }
}

fn all_finished(instances: &[AbilityInstance]) -> bool {
    instances.iter().all(AbilityInstance::is_finished)
}
