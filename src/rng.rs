//! Injectable Random Sources
//!
//! Every probabilistic trigger in the engine (strobes, bursts, glitches,
//! streak seeding) draws from a [`RandomSource`] handed in by the caller, so a
//! session can be replayed exactly.
//!
//! - [`Rng`] is a seedable Xorshift128+ generator for deterministic replay.
//! - [`EntropyRng`] wraps `rand`'s `StdRng` seeded from OS entropy for live use.
//! - [`ScriptedRng`] cycles through a fixed list of values; tests use it to
//!   force or suppress individual draws.

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};

/// A source of uniformly distributed values in `[0.0, 1.0)`.
pub trait RandomSource {
    /// Next value in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform value in `[lo, hi)`.
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Uniform integer in `[lo, hi)`. Returns `lo` when the range is empty.
    fn range_usize(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo) as f64;
        (lo + (self.next_f64() * span) as usize).min(hi - 1)
    }

    /// `true` with the given probability.
    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

/// A seedable random number generator using Xorshift128+.
#[derive(Debug, Clone, Copy)]
pub struct Rng {
    s0: u64,
    s1: u64,
}

impl Rng {
    /// Create from raw state. Both words zero is replaced by a valid state.
    #[inline]
    pub const fn new(s0: u64, s1: u64) -> Self {
        let s0 = if s0 == 0 && s1 == 0 { 1 } else { s0 };
        Self { s0, s1 }
    }

    /// Create from a single 64-bit seed.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        let s0 = splitmix64(seed);
        let s1 = splitmix64(seed.wrapping_add(0x9e3779b97f4a7c15));
        Self::new(s0, s1)
    }

    /// Generate the next u64 value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.s0;
        let mut s1 = self.s1;
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.s0 = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.s1 = s1.rotate_left(37);

        result
    }
}

impl RandomSource for Rng {
    #[inline]
    fn next_f64(&mut self) -> f64 {
        // Upper 53 bits fill the mantissa
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Splitmix64 mixing function for deriving state from seeds.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// Production random source seeded from operating-system entropy.
#[derive(Debug, Clone)]
pub struct EntropyRng {
    inner: StdRng,
}

impl EntropyRng {
    pub fn new() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }
}

impl Default for EntropyRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for EntropyRng {
    fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }
}

/// Fixed-sequence source that repeats its values in order.
///
/// Values are clamped into `[0.0, 1.0)`. An empty script always yields `0.0`.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRng {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// A source whose every draw is `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws taken so far
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRng {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = Rng::from_seed(12345);
        let mut rng2 = Rng::from_seed(12345);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_f64_range() {
        let mut rng = Rng::from_seed(42);

        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "Value {} out of range", v);
        }
    }

    #[test]
    fn test_rng_distribution() {
        let mut rng = Rng::from_seed(42);
        let count = 10000;
        let sum: f64 = (0..count).map(|_| rng.next_f64()).sum();

        let mean = sum / count as f64;
        assert!((mean - 0.5).abs() < 0.02, "Mean {} too far from 0.5", mean);
    }

    #[test]
    fn test_zero_seed_handling() {
        let mut rng = Rng::new(0, 0);
        let v = rng.next_f64();
        assert!((0.0..1.0).contains(&v));
    }

    #[test]
    fn test_range_usize_bounds() {
        let mut rng = Rng::from_seed(7);
        for _ in 0..1000 {
            let n = rng.range_usize(3, 7);
            assert!((3..7).contains(&n));
        }
        assert_eq!(rng.range_usize(5, 5), 5);
    }

    #[test]
    fn test_scripted_rng_cycles() {
        let mut rng = ScriptedRng::new(vec![0.1, 0.9]);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.next_f64(), 0.9);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.draws(), 3);
    }

    #[test]
    fn test_scripted_rng_chance() {
        let mut never = ScriptedRng::constant(1.0);
        let mut always = ScriptedRng::constant(0.0);
        for _ in 0..10 {
            assert!(!never.chance(0.99));
            assert!(always.chance(0.01));
        }
    }

    #[test]
    fn test_entropy_rng_range() {
        let mut rng = EntropyRng::new();
        for _ in 0..100 {
            let v = rng.range(2.0, 3.0);
            assert!((2.0..3.0).contains(&v));
        }
    }
}
