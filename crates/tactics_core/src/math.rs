//! Fixed-point math utilities for deterministic simulation.
//!
//! Battle timing, positions and chance rolls all use fixed-point arithmetic
//! so that two peers replaying the same battle stay bit-identical.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vec2Fixed {
    /// X coordinate.
    pub x: Fixed,
    /// Y coordinate.
    pub y: Fixed,
}

/// Serde support for authoring fixed-point values as decimals.
///
/// Data files are hand written, so seconds and offsets are stored as plain
/// decimal numbers and converted exactly once at load time.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} is out of range")))
    }
}

/// Fixed-point 2D offset as authored in data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Offset {
    /// Horizontal offset.
    #[serde(with = "decimal_serde", default)]
    pub x: Fixed,
    /// Vertical offset.
    #[serde(with = "decimal_serde", default)]
    pub y: Fixed,
}

impl From<Offset> for Vec2Fixed {
    fn from(offset: Offset) -> Self {
        Self::new(offset.x, offset.y)
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Ratio `numerator / denominator` clamped to `[0, 1]`.
///
/// A zero denominator counts as already complete.
#[must_use]
pub fn progress(numerator: Fixed, denominator: Fixed) -> Fixed {
    if denominator <= Fixed::ZERO {
        return Fixed::ONE;
    }
    (numerator / denominator).clamp(Fixed::ZERO, Fixed::ONE)
}

/// A duration given in tenths of a second.
#[must_use]
pub fn tenths_of_second(tenths: i32) -> Fixed {
    Fixed::from_num(tenths) / Fixed::from_num(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);

        let result1 = a * Fixed::from_num(7);
        let result2 = b * Fixed::from_num(7);
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::from_ints(10, 20);
        let mid = a.lerp(b, Fixed::from_num(0.5));
        assert_eq!(mid, Vec2Fixed::from_ints(5, 10));
        assert_eq!(a.lerp(b, Fixed::ONE), b);
    }

    #[test]
    fn test_progress_clamps() {
        assert_eq!(progress(Fixed::from_num(3), Fixed::from_num(2)), Fixed::ONE);
        assert_eq!(progress(Fixed::ZERO, Fixed::ZERO), Fixed::ONE);
        assert_eq!(
            progress(Fixed::from_num(1), Fixed::from_num(4)),
            Fixed::from_num(0.25)
        );
    }

    #[test]
    fn test_tenths_of_second() {
        assert_eq!(tenths_of_second(10), Fixed::ONE);
        assert_eq!(tenths_of_second(5), Fixed::from_num(0.5));
    }

    #[test]
    fn test_offset_deserializes_decimals() {
        let offset: Offset = ron::from_str("(x: -1.5, y: 2.0)").unwrap();
        assert_eq!(
            Vec2Fixed::from(offset),
            Vec2Fixed::new(Fixed::from_num(-1.5), Fixed::from_num(2))
        );
    }
}
