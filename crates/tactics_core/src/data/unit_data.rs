//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

/// Combat statistics for a unit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct UnitStats {
    /// Current health points.
    pub health: i32,
    /// Mana points.
    pub mana: i32,
    /// Scales physical damage.
    pub strength: i32,
    /// Scales magic damage and healing.
    pub intellect: i32,
    /// Resists magic damage.
    pub wisdom: i32,
    /// Resists physical damage.
    pub constitution: i32,
    /// Speed rating.
    pub speed: i32,
}

/// Data-driven unit definition.
///
/// The position of a definition in the units file is its job type on the
/// wire.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     name: "knight",
///     main_ability: "slash",
///     stats: UnitStats(health: 30, strength: 10, constitution: 3, speed: 4),
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitData {
    /// Unique job name.
    pub name: String,

    /// Ability cast on the unit's own turn.
    pub main_ability: String,

    /// Starting stats; `health` is also the maximum.
    pub stats: UnitStats,

    /// Sprite sheet used by the presentation layer.
    #[serde(default)]
    pub sprite: Option<String>,
}

impl UnitData {
    /// Maximum health of a fresh unit of this type.
    #[must_use]
    pub const fn max_health(&self) -> i32 {
        self.stats.health
    }
}
