//! Ability templates and live ability playback.
//!
//! An [`AbilityTemplate`] is the frozen form of an ability definition: its
//! targeting rules plus the term prototypes. Casting it produces an
//! [`AbilityInstance`] that owns fresh copies of those terms and plays them
//! back against one caster and one target.
//!
//! Instances never reach into units. Everything that touches another unit
//! comes out of [`AbilityInstance::update`] as an [`AbilityEvent`] and is
//! resolved by the battle.

use std::sync::Arc;

use crate::data::{
    AbilityData, ActivationPeriod, DamageClass, EffectKind, TargetAlliance, TargetChoice,
    UnitStats,
};
use crate::error::{GameError, Result};
use crate::math::{tenths_of_second, Fixed, Vec2Fixed};
use crate::rng::RandomStream;
use crate::term::{Term, TermContext, TermEffect, Visual};
use crate::unit::{Unit, UnitHandle};

/// Immutable, shareable form of an ability definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityTemplate {
    name: String,
    damage_class: DamageClass,
    target_choice: TargetChoice,
    target_alliance: Option<TargetAlliance>,
    activation_period: ActivationPeriod,
    base_damage: i32,
    unlock_level: u32,
    activations: u32,
    prototypes: Vec<Term>,
    lifetime: Fixed,
}

impl AbilityTemplate {
    /// Freeze a parsed definition.
    #[must_use]
    pub fn from_data(data: &AbilityData) -> Self {
        let prototypes: Vec<Term> = data.sequence.iter().map(Term::prototype).collect();
        let last_end = prototypes
            .iter()
            .map(Term::end_time)
            .max()
            .unwrap_or(Fixed::ZERO);

        Self {
            name: data.name.clone(),
            damage_class: data.damage_class,
            target_choice: data.target_choice,
            target_alliance: data.target_alliance,
            activation_period: data.activation_period,
            base_damage: data.base_damage,
            unlock_level: data.unlock_level,
            activations: data.activations.max(1),
            prototypes,
            lifetime: last_end + tenths_of_second(1),
        }
    }

    /// Ability name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stats the ability scales with.
    #[must_use]
    pub const fn damage_class(&self) -> DamageClass {
        self.damage_class
    }

    /// Target selection rule.
    #[must_use]
    pub const fn target_choice(&self) -> TargetChoice {
        self.target_choice
    }

    /// Declared target alliance.
    #[must_use]
    pub const fn target_alliance(&self) -> Option<TargetAlliance> {
        self.target_alliance
    }

    /// When the ability may fire, as authored. See [`ActivationPeriod`].
    #[must_use]
    pub const fn activation_period(&self) -> ActivationPeriod {
        self.activation_period
    }

    /// Base damage before stat scaling.
    #[must_use]
    pub const fn base_damage(&self) -> i32 {
        self.base_damage
    }

    /// Level at which the ability unlocks.
    #[must_use]
    pub const fn unlock_level(&self) -> u32 {
        self.unlock_level
    }

    /// Turns an attached instance plays before it expires.
    #[must_use]
    pub const fn activations(&self) -> u32 {
        self.activations
    }

    /// Term prototypes in sequence order.
    #[must_use]
    pub fn prototypes(&self) -> &[Term] {
        &self.prototypes
    }

    /// Latest term end plus a 0.1 s buffer.
    #[must_use]
    pub const fn lifetime(&self) -> Fixed {
        self.lifetime
    }
}

/// A request from a playing ability, resolved by the battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbilityEvent {
    /// Switch a unit's animation.
    SetAnimation {
        /// Unit to animate.
        unit: UnitHandle,
        /// Animation name.
        animation: String,
    },
    /// Place a unit.
    MoveUnit {
        /// Unit to move.
        unit: UnitHandle,
        /// New position.
        position: Vec2Fixed,
    },
    /// Play a one-shot sound.
    PlaySound {
        /// Sound name.
        sound: String,
    },
    /// Apply percent damage or healing.
    PercentDamage {
        /// Template of the ability dealing it.
        ability: Arc<AbilityTemplate>,
        /// Unit whose stats scale it.
        caster: UnitHandle,
        /// Unit receiving it.
        target: UnitHandle,
        /// Percentage of the computed amount.
        percent: i32,
        /// Integer modifier on base damage.
        modifier: i32,
    },
    /// Attach a status, buff or debuff.
    ApplyEffect {
        /// Collection it goes into.
        kind: EffectKind,
        /// Template name.
        ability: String,
        /// Caster of the ability that applied it.
        caster: UnitHandle,
        /// Target of the ability that applied it.
        target: UnitHandle,
    },
    /// Adjust a unit's strength.
    ChangeStrength {
        /// Unit to adjust.
        unit: UnitHandle,
        /// Signed change.
        amount: i32,
    },
    /// Dispel every status effect on a unit.
    DispelStatuses {
        /// Unit to cleanse.
        unit: UnitHandle,
    },
}

/// One live playback of an ability against a caster and a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityInstance {
    template: Arc<AbilityTemplate>,
    caster: UnitHandle,
    target: UnitHandle,
    original_position: Vec2Fixed,
    cast_location: Vec2Fixed,
    terms: Vec<Term>,
    finished: bool,
    dispelled: bool,
    elapsed: Fixed,
    remaining_activations: u32,
    visual: Option<Visual>,
}

impl AbilityInstance {
    /// Cast `template` from `caster` at `target`.
    ///
    /// `original_position` is where the caster stands now; `cast_location`
    /// is where the target stands now.
    #[must_use]
    pub fn new(
        template: Arc<AbilityTemplate>,
        caster: UnitHandle,
        target: UnitHandle,
        original_position: Vec2Fixed,
        cast_location: Vec2Fixed,
    ) -> Self {
        let terms = template
            .prototypes()
            .iter()
            .map(Term::clone_for_cast)
            .collect();
        let remaining_activations = template.activations();
        Self {
            template,
            caster,
            target,
            original_position,
            cast_location,
            terms,
            finished: false,
            dispelled: false,
            elapsed: Fixed::ZERO,
            remaining_activations,
            visual: None,
        }
    }

    /// Template this instance plays.
    #[must_use]
    pub fn template(&self) -> &Arc<AbilityTemplate> {
        &self.template
    }

    /// Template name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.template.name()
    }

    /// Casting unit.
    #[must_use]
    pub const fn caster(&self) -> UnitHandle {
        self.caster
    }

    /// Target unit.
    #[must_use]
    pub const fn target(&self) -> UnitHandle {
        self.target
    }

    /// Live terms.
    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Check whether every term has finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Check whether a dispel removed this instance.
    #[must_use]
    pub const fn is_dispelled(&self) -> bool {
        self.dispelled
    }

    /// Mark this instance dispelled.
    pub fn dispel(&mut self) {
        self.dispelled = true;
    }

    /// Seconds of playback so far.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Total sequence lifetime from the template.
    #[must_use]
    pub fn lifetime(&self) -> Fixed {
        self.template.lifetime()
    }

    /// Turns left including the current one.
    #[must_use]
    pub const fn remaining_activations(&self) -> u32 {
        self.remaining_activations
    }

    /// Use up one activation after a completed turn.
    pub fn consume_activation(&mut self) {
        self.remaining_activations = self.remaining_activations.saturating_sub(1);
    }

    /// Visual currently bound to the ability, if any.
    #[must_use]
    pub const fn visual(&self) -> Option<&Visual> {
        self.visual.as_ref()
    }

    /// Delay every term by `offset` seconds.
    pub fn set_start_offset(&mut self, offset: Fixed) {
        for term in &mut self.terms {
            term.set_start_offset(offset);
        }
    }

    /// Rewind so the instance plays again from the top.
    pub fn reset_to_start(&mut self) {
        for term in &mut self.terms {
            term.set_state_to_start();
        }
        self.elapsed = Fixed::ZERO;
        self.finished = false;
        self.visual = None;
    }

    /// Where the caster stood when the instance was last aimed.
    #[must_use]
    pub const fn original_position(&self) -> Vec2Fixed {
        self.original_position
    }

    /// Where the target stood when the instance was last aimed.
    #[must_use]
    pub const fn cast_location(&self) -> Vec2Fixed {
        self.cast_location
    }

    /// Re-aim at fresh caster and target positions before the next play.
    pub fn retarget(&mut self, original_position: Vec2Fixed, cast_location: Vec2Fixed) {
        self.original_position = original_position;
        self.cast_location = cast_location;
    }

    /// Advance every term by one tick.
    ///
    /// # Errors
    ///
    /// Propagates term errors.
    pub fn update(
        &mut self,
        dt: Fixed,
        caster_position: Vec2Fixed,
        rng: &mut RandomStream,
        events: &mut Vec<AbilityEvent>,
    ) -> Result<()> {
        let ctx = TermContext {
            dt,
            elapsed: self.elapsed,
            caster_position,
            original_position: self.original_position,
            cast_location: self.cast_location,
        };

        let mut effects = Vec::new();
        for term in &mut self.terms {
            term.run(&ctx, rng, &mut effects)?;
        }
        for effect in effects {
            self.resolve(effect, events);
        }

        self.finished = self.terms.iter().all(Term::is_finished);
        self.elapsed += dt;
        Ok(())
    }

    fn resolve(&mut self, effect: TermEffect, events: &mut Vec<AbilityEvent>) {
        match effect {
            TermEffect::SetAnimation { animation } => events.push(AbilityEvent::SetAnimation {
                unit: self.caster,
                animation,
            }),
            TermEffect::MoveCaster { position } => events.push(AbilityEvent::MoveUnit {
                unit: self.caster,
                position,
            }),
            TermEffect::ShowVisual(visual) => self.visual = Some(visual),
            TermEffect::HideVisual => self.visual = None,
            TermEffect::PlaySound { sound } => events.push(AbilityEvent::PlaySound { sound }),
            TermEffect::PercentDamage {
                damage_percent,
                damage_modifier,
            } => events.push(AbilityEvent::PercentDamage {
                ability: Arc::clone(&self.template),
                caster: self.caster,
                target: self.target,
                percent: damage_percent,
                modifier: damage_modifier,
            }),
            TermEffect::ApplyEffect { kind, ability } => events.push(AbilityEvent::ApplyEffect {
                kind,
                ability,
                caster: self.caster,
                target: self.target,
            }),
            TermEffect::ChangeStrength { amount } => events.push(AbilityEvent::ChangeStrength {
                unit: self.caster,
                amount,
            }),
            TermEffect::Dispel => {
                self.dispelled = true;
                events.push(AbilityEvent::DispelStatuses { unit: self.target });
            }
        }
    }
}

/// Apply percent damage or healing from `template` to `target`.
///
/// Returns the signed health change: negative for damage, positive for
/// healing.
///
/// # Errors
///
/// Returns [`GameError::MissingAlliance`] if the template declares no
/// alliance and [`GameError::UnsupportedHealing`] for Physical healing.
pub fn apply_percent_damage(
    template: &AbilityTemplate,
    caster: &UnitStats,
    target: &mut Unit,
    percent: i32,
    modifier: i32,
) -> Result<i32> {
    match template.target_alliance() {
        Some(TargetAlliance::Enemy) => {
            let amount = damage_amount(template, caster, target.stats(), percent, modifier);
            Ok(-target.take_damage(amount))
        }
        Some(TargetAlliance::Friendly) => match template.damage_class() {
            DamageClass::Magic => {
                let amount = scale(
                    &[
                        template.base_damage(),
                        modifier,
                        caster.intellect,
                        percent,
                    ],
                );
                Ok(target.heal(amount))
            }
            DamageClass::Physical => Err(GameError::UnsupportedHealing(
                template.name().to_string(),
            )),
        },
        None => Err(GameError::MissingAlliance(template.name().to_string())),
    }
}

/// Raw damage before it is applied to health.
///
/// Physical damage scales with the modifier; Magic damage ignores it.
#[must_use]
pub fn damage_amount(
    template: &AbilityTemplate,
    caster: &UnitStats,
    target: &UnitStats,
    percent: i32,
    modifier: i32,
) -> i32 {
    match template.damage_class() {
        DamageClass::Physical => {
            let multiplier = stat_multiplier(caster.strength, target.constitution);
            scale(&[template.base_damage(), modifier, multiplier, percent])
        }
        DamageClass::Magic => {
            let multiplier = stat_multiplier(caster.intellect, target.wisdom);
            scale(&[template.base_damage(), multiplier, percent])
        }
    }
}

/// `attack - defense` clamped to `[0, attack]`.
fn stat_multiplier(attack: i32, defense: i32) -> i32 {
    let attack = attack.max(0);
    (attack - defense).clamp(0, attack)
}

/// Product of `factors` with the last one treated as a percentage.
fn scale(factors: &[i32]) -> i32 {
    let product = factors
        .iter()
        .fold(1_i64, |acc, &factor| acc.saturating_mul(i64::from(factor)));
    (product / 100).clamp(0, i64::from(i32::MAX)) as i32
}
