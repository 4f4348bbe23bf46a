//! Position-addressable random stream.
//!
//! Every draw is a pure hash of `(position, seed)`, not the next step of a
//! stateful generator. Two peers holding the same seed and position therefore
//! produce identical draws, and jumping to an arbitrary position is exact
//! without replaying the skipped draws.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

const NOISE1: u32 = 0xd2a8_0a3f;
const NOISE2: u32 = 0xa884_f197;
const NOISE3: u32 = 0x6c73_6f4b;
const NOISE4: u32 = 0xb79f_3abb;
const NOISE5: u32 = 0x1b56_c4f5;

/// Hash a draw position with a seed into 32 noise bits.
#[must_use]
pub const fn squirrel_noise(position: u32, seed: u32) -> u32 {
    let mut mangled = position;
    mangled = mangled.wrapping_mul(NOISE1);
    mangled = mangled.wrapping_add(seed);
    mangled ^= mangled >> 9;
    mangled = mangled.wrapping_add(NOISE2);
    mangled ^= mangled >> 11;
    mangled = mangled.wrapping_mul(NOISE3);
    mangled ^= mangled >> 13;
    mangled = mangled.wrapping_add(NOISE4);
    mangled ^= mangled >> 15;
    mangled = mangled.wrapping_mul(NOISE5);
    mangled ^= mangled >> 17;
    mangled
}

/// Seeded random stream shared between the two peers of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RandomStream {
    seed: u32,
    position: u32,
}

impl RandomStream {
    /// Create a stream at position zero.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { seed, position: 0 }
    }

    /// Seed of this stream.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Number of draws taken since the last reseed or jump.
    #[must_use]
    pub const fn current_position(&self) -> u32 {
        self.position
    }

    /// Replace the seed and rewind to position zero.
    pub fn reseed(&mut self, seed: u32) {
        self.seed = seed;
        self.position = 0;
    }

    /// Move to an arbitrary draw position.
    pub fn jump_to_position(&mut self, position: u32) {
        self.position = position;
    }

    /// Next raw 32-bit draw.
    pub fn next_u32(&mut self) -> u32 {
        let value = squirrel_noise(self.position, self.seed);
        self.position = self.position.wrapping_add(1);
        value
    }

    /// Integer in `[min, max]`, both inclusive.
    ///
    /// `min > max` is a caller error.
    pub fn next_int_in_range(&mut self, min: i32, max: i32) -> i32 {
        debug_assert!(min <= max, "next_int_in_range called with {min} > {max}");
        let span = (i64::from(max) - i64::from(min) + 1) as u64;
        let offset = u64::from(self.next_u32()) % span;
        (i64::from(min) + offset as i64) as i32
    }

    /// Float in `[0, 1]`.
    pub fn next_float_zero_to_one(&mut self) -> f32 {
        (f64::from(self.next_u32()) / f64::from(u32::MAX)) as f32
    }

    /// Float in `[min, max]`.
    pub fn next_float_in_range(&mut self, min: f32, max: f32) -> f32 {
        debug_assert!(min <= max, "next_float_in_range called with {min} > {max}");
        min + (max - min) * self.next_float_zero_to_one()
    }

    /// Fixed-point value in `[0, 1)`.
    ///
    /// The simulation rolls chances with this instead of floats; the 32 draw
    /// bits become the fractional bits directly.
    pub fn next_fixed_zero_to_one(&mut self) -> Fixed {
        Fixed::from_bits(i64::from(self.next_u32()))
    }

    /// Roll a percentage-style chance expressed as a fraction in `[0, 1]`.
    pub fn roll_chance(&mut self, chance: Fixed) -> bool {
        self.next_fixed_zero_to_one() <= chance
    }
}

impl Default for RandomStream {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomStream::new(12345);
        let mut b = RandomStream::new(12345);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        assert_eq!(a.current_position(), 100);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = RandomStream::new(1);
        let mut b = RandomStream::new(2);
        let draws_a: Vec<u32> = (0..8).map(|_| a.next_u32()).collect();
        let draws_b: Vec<u32> = (0..8).map(|_| b.next_u32()).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn test_jump_matches_sequential_draws() {
        let mut sequential = RandomStream::new(99);
        for _ in 0..37 {
            sequential.next_u32();
        }

        let mut jumped = RandomStream::new(99);
        jumped.jump_to_position(37);

        assert_eq!(sequential.next_u32(), jumped.next_u32());
        assert_eq!(sequential.current_position(), jumped.current_position());
    }

    #[test]
    fn test_reseed_rewinds() {
        let mut stream = RandomStream::new(5);
        let first = stream.next_u32();
        stream.next_u32();
        stream.reseed(5);
        assert_eq!(stream.current_position(), 0);
        assert_eq!(stream.next_u32(), first);
    }

    #[test]
    fn test_every_draw_kind_advances_once() {
        let mut stream = RandomStream::new(7);
        stream.next_int_in_range(0, 3);
        stream.next_float_zero_to_one();
        stream.next_float_in_range(1.0, 2.0);
        stream.next_fixed_zero_to_one();
        stream.roll_chance(Fixed::from_num(0.5));
        assert_eq!(stream.current_position(), 5);
    }

    #[test]
    fn test_int_range_is_inclusive() {
        let mut stream = RandomStream::new(42);
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..1000 {
            let value = stream.next_int_in_range(-2, 2);
            assert!((-2..=2).contains(&value));
            seen_min |= value == -2;
            seen_max |= value == 2;
        }
        assert!(seen_min && seen_max);
    }

    #[test]
    fn test_full_int_range_does_not_overflow() {
        let mut stream = RandomStream::new(3);
        for _ in 0..10 {
            stream.next_int_in_range(i32::MIN, i32::MAX);
        }
    }

    #[test]
    fn test_float_ranges() {
        let mut stream = RandomStream::new(8);
        for _ in 0..500 {
            let unit = stream.next_float_zero_to_one();
            assert!((0.0..=1.0).contains(&unit));
            let ranged = stream.next_float_in_range(-3.0, 5.0);
            assert!((-3.0..=5.0).contains(&ranged));
            let fixed = stream.next_fixed_zero_to_one();
            assert!(fixed >= Fixed::ZERO && fixed < Fixed::ONE);
        }
    }

    #[test]
    fn test_chance_extremes() {
        let mut stream = RandomStream::new(11);
        for _ in 0..200 {
            assert!(stream.roll_chance(Fixed::ONE));
        }
        let never = (0..200).filter(|_| stream.roll_chance(-Fixed::ONE)).count();
        assert_eq!(never, 0);
    }
}
