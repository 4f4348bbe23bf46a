//! Ability data structures for data-driven ability definitions.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed, Offset};

/// Which stats an ability scales with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageClass {
    /// Strength against constitution.
    Physical,
    /// Intellect against wisdom.
    Magic,
}

/// How an ability picks its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetChoice {
    /// The unit in the caster's slot on the other side, else the lowest slot.
    Predetermined,
    /// Uniformly random among living candidates.
    Random,
    /// Random among the most wounded candidates.
    MostDamageTaken,
    /// Random among the healthiest candidates.
    LeastDamageTaken,
    /// The caster itself.
    SelfTarget,
}

/// Which side an ability is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetAlliance {
    /// Opposing units; percent damage hurts.
    Enemy,
    /// Allied units; percent damage heals.
    Friendly,
}

/// When in the turn cycle an ability may fire.
///
/// Carried as authored. Playback does not branch on it: main abilities play
/// on the caster's turn and attached effects on their holder's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivationPeriod {
    /// At the start of the owner's own turn.
    #[default]
    OwnTurn,
    /// During the target's turn.
    TargetTurn,
}

/// Destination rule for a movement term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    /// Slide horizontally to the cast location's x.
    TargetX,
    /// Slide vertically to the cast location's y.
    TargetY,
    /// Move onto the cast location, plus the term's offset.
    EnemyPos,
    /// Return to where the caster stood when the ability was cast.
    OriginalPos,
    /// Leave through the top of the screen.
    OffscreenTop,
}

/// Category of secondary ability a term can attach to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Played first on the owner's turn.
    Status,
    /// Played alongside status effects.
    Debuff,
    /// Played after status effects, before the main ability.
    Buff,
}

/// Type-specific payload of a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermKind {
    /// Switch the caster's animation.
    Anim {
        /// Animation name.
        animation: String,
    },
    /// Move the caster.
    Movement {
        /// Destination rule.
        movement: MovementKind,
        /// Added to the destination.
        #[serde(default)]
        offset: Offset,
    },
    /// Show a floating visual bound to the ability.
    Effect {
        /// Texture name.
        texture: String,
        /// Visual width.
        #[serde(with = "decimal_serde")]
        width: Fixed,
        /// Visual height.
        #[serde(with = "decimal_serde")]
        height: Fixed,
        /// Frames in the sprite animation.
        #[serde(default = "default_frames")]
        frames: u32,
        /// Sprite animation rate in frames per second.
        #[serde(with = "decimal_serde", default)]
        fps: Fixed,
    },
    /// Play a sound.
    Audio {
        /// Sound name.
        sound: String,
    },
    /// Apply the owning ability's percent damage (or healing).
    Damage {
        /// Percentage of the computed damage dealt per application.
        #[serde(default = "default_damage_percent")]
        damage_percent: i32,
        /// Integer multiplier on base damage.
        #[serde(default = "default_damage_modifier")]
        damage_modifier: i32,
    },
    /// Try to attach a debuff.
    Debuff {
        /// Debuff ability name.
        ability: String,
        /// Chance per application, 0.0 to 1.0.
        #[serde(with = "decimal_serde", default = "always")]
        chance: Fixed,
    },
    /// Try to attach a buff.
    Buff {
        /// Buff ability name.
        ability: String,
        /// Chance per application, 0.0 to 1.0.
        #[serde(with = "decimal_serde", default = "always")]
        chance: Fixed,
    },
    /// Try to attach a status effect.
    Status {
        /// Status ability name.
        ability: String,
        /// Chance per application, 0.0 to 1.0.
        #[serde(with = "decimal_serde", default = "always")]
        chance: Fixed,
    },
    /// Add to the caster's strength.
    AttackChange {
        /// Signed strength change per application.
        amount: i32,
    },
    /// Dispel the target's status effects and this ability.
    Dispel,
}

const fn default_frames() -> u32 {
    1
}

const fn default_damage_percent() -> i32 {
    100
}

const fn default_damage_modifier() -> i32 {
    1
}

fn always() -> Fixed {
    Fixed::ONE
}

impl TermKind {
    /// Secondary ability this term attaches, if any.
    #[must_use]
    pub fn applied_effect(&self) -> Option<(EffectKind, &str)> {
        match self {
            TermKind::Status { ability, .. } => Some((EffectKind::Status, ability)),
            TermKind::Debuff { ability, .. } => Some((EffectKind::Debuff, ability)),
            TermKind::Buff { ability, .. } => Some((EffectKind::Buff, ability)),
            _ => None,
        }
    }
}

/// One timed entry of an ability's sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermData {
    /// Seconds after the ability starts.
    #[serde(with = "decimal_serde", default)]
    pub at_time: Fixed,
    /// Seconds the term stays in its Do state.
    #[serde(with = "decimal_serde", default)]
    pub duration: Fixed,
    /// What the term does.
    pub kind: TermKind,
}

/// Data-driven ability definition.
///
/// # Example RON
///
/// ```ron
/// AbilityData(
///     name: "slash",
///     damage_class: Physical,
///     target_choice: Random,
///     target_alliance: Some(Enemy),
///     base_damage: 1,
///     sequence: [
///         TermData(at_time: 0.0, duration: 0.3, kind: Movement(movement: EnemyPos)),
///         TermData(at_time: 0.3, duration: 0.0, kind: Damage(damage_percent: 100)),
///         TermData(at_time: 0.4, duration: 0.3, kind: Movement(movement: OriginalPos)),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityData {
    /// Unique ability name.
    pub name: String,

    /// Stats the ability scales with.
    pub damage_class: DamageClass,

    /// Target selection rule.
    pub target_choice: TargetChoice,

    /// Side the ability is aimed at. Required once a damage term fires.
    #[serde(default)]
    pub target_alliance: Option<TargetAlliance>,

    /// When the ability may fire.
    #[serde(default)]
    pub activation_period: ActivationPeriod,

    /// Base damage before stat scaling.
    #[serde(default)]
    pub base_damage: i32,

    /// Level at which the ability becomes available.
    #[serde(default = "default_unlock_level")]
    pub unlock_level: u32,

    /// Turns a status, buff or debuff replays before it expires.
    #[serde(default = "default_activations")]
    pub activations: u32,

    /// Ordered term sequence. Absent means no terms.
    #[serde(default)]
    pub sequence: Vec<TermData>,
}

const fn default_unlock_level() -> u32 {
    1
}

const fn default_activations() -> u32 {
    1
}

impl AbilityData {
    /// Check whether any term deals percent damage.
    #[must_use]
    pub fn has_damage_terms(&self) -> bool {
        self.sequence
            .iter()
            .any(|term| matches!(term.kind, TermKind::Damage { .. }))
    }
}
