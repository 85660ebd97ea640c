//! Deterministic random number generation.
//!
//! ## Algorithm
//!
//! 128-bit PCG with the "cheap multiplier" LCG step and the DXSM output
//! permutation. Output is taken from the pre-step state.
//!
//! ## Purity
//!
//! `Rng` is a plain `Copy` value. Every draw returns the produced number
//! together with the successor generator; nothing is mutated in place, so a
//! state snapshot always carries exactly the generator it was reached with.
//!
//! ```
//! use game_kernel::core::Rng;
//!
//! let rng = Rng::new(42);
//! let (roll, rng) = rng.next_int(1, 6).unwrap();
//! assert!((1..=6).contains(&roll));
//!
//! // Replaying from the same value reproduces the same draw.
//! let (again, _) = Rng::new(42).next_int(1, 6).unwrap();
//! assert_eq!(roll, again);
//!
//! // Forks are independent substreams.
//! let (_parent, child) = rng.fork();
//! assert_ne!(child, rng);
//! ```

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::error::RngError;

/// LCG multiplier for the cheap-multiplier PCG variant.
const CHEAP_MULTIPLIER: u64 = 0xda94_2042_e4dd_58b5;

/// Algorithm tag written into serialized generator state.
pub const RNG_ALGORITHM: &str = "pcg-dxsm-128/v1";

/// Deterministic PCG-DXSM generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rng {
    state: u128,
    inc: u128,
}

impl Rng {
    /// Create a generator from a 64-bit seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let init_state = ((seed as u128) << 64) | splitmix64(seed) as u128;
        let init_seq = ((splitmix64(seed ^ 0xa076_1d64_78bd_642f) as u128) << 64)
            | splitmix64(seed ^ 0xe703_7ed1_a0b4_28db) as u128;
        Self::seeded(init_state, init_seq)
    }

    fn seeded(init_state: u128, init_seq: u128) -> Self {
        let rng = Self {
            state: 0,
            inc: (init_seq << 1) | 1,
        }
        .advance();
        Self {
            state: rng.state.wrapping_add(init_state),
            inc: rng.inc,
        }
        .advance()
    }

    fn advance(self) -> Self {
        Self {
            state: self
                .state
                .wrapping_mul(CHEAP_MULTIPLIER as u128)
                .wrapping_add(self.inc),
            inc: self.inc,
        }
    }

    fn output(state: u128) -> u64 {
        let mut hi = (state >> 64) as u64;
        let lo = (state as u64) | 1;
        hi ^= hi >> 32;
        hi = hi.wrapping_mul(CHEAP_MULTIPLIER);
        hi ^= hi >> 48;
        hi.wrapping_mul(lo)
    }

    /// Draw one raw 64-bit word.
    #[must_use]
    pub fn step(self) -> (u64, Rng) {
        (Self::output(self.state), self.advance())
    }

    /// Draw an integer uniformly from `[min, max]` (inclusive).
    ///
    /// Uses rejection sampling against `2^64 mod range`, so ranges that do
    /// not divide `2^64` carry no modulo bias.
    pub fn next_int(self, min: i64, max: i64) -> Result<(i64, Rng), RngError> {
        if min > max {
            return Err(RngError::InvalidRange { min, max });
        }
        let span = (max as i128 - min as i128 + 1) as u128;
        if span > u64::MAX as u128 {
            let (word, next) = self.step();
            return Ok((word as i64, next));
        }

        let (offset, rng) = self.below(span as u64);
        Ok(((min as i128 + offset as i128) as i64, rng))
    }

    /// Unbiased draw from `[0, range)`; `range` must be non-zero.
    fn below(self, range: u64) -> (u64, Rng) {
        let threshold = range.wrapping_neg() % range;
        let mut rng = self;
        loop {
            let (word, next) = rng.step();
            rng = next;
            if word >= threshold {
                return (word % range, rng);
            }
        }
    }

    /// Split off an independent substream.
    ///
    /// Returns `(parent, child)`: the parent advanced past the words consumed
    /// to seed the child, and the child on its own stream.
    #[must_use]
    pub fn fork(self) -> (Rng, Rng) {
        let (a, rng) = self.step();
        let (b, rng) = rng.step();
        let (c, rng) = rng.step();
        let (d, rng) = rng.step();
        let child = Self::seeded(((a as u128) << 64) | b as u128, ((c as u128) << 64) | d as u128);
        (rng, child)
    }

    /// Fisher-Yates shuffle of `items`, returning the successor generator.
    #[must_use]
    pub fn shuffle<T>(self, items: &mut [T]) -> Rng {
        let mut rng = self;
        for i in (1..items.len()).rev() {
            let (j, next) = rng.below(i as u64 + 1);
            rng = next;
            items.swap(i, j as usize);
        }
        rng
    }

    /// Capture the generator as plain data.
    #[must_use]
    pub fn to_state(&self) -> RngState {
        RngState {
            algorithm: RNG_ALGORITHM.to_string(),
            words: [
                (self.state >> 64) as u64,
                self.state as u64,
                (self.inc >> 64) as u64,
                self.inc as u64,
            ],
        }
    }

    /// Restore a generator captured by [`Rng::to_state`].
    pub fn from_state(state: &RngState) -> Result<Rng, RngError> {
        if state.algorithm != RNG_ALGORITHM {
            return Err(RngError::UnsupportedAlgorithm(state.algorithm.clone()));
        }
        let [s_hi, s_lo, i_hi, i_lo] = state.words;
        let inc = ((i_hi as u128) << 64) | i_lo as u128;
        if inc & 1 == 0 {
            return Err(RngError::InvalidState);
        }
        Ok(Rng {
            state: ((s_hi as u128) << 64) | s_lo as u128,
            inc,
        })
    }
}

impl Serialize for Rng {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_state().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rng {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = RngState::deserialize(deserializer)?;
        Rng::from_state(&state).map_err(serde::de::Error::custom)
    }
}

/// Serializable generator state: algorithm tag plus opaque state words.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub algorithm: String,
    pub words: [u64; 4],
}

/// Mutable `RngCore` view over a pure [`Rng`].
///
/// For code outside the kernel (agents, harnesses) that wants `rand`'s
/// distributions and slice helpers. Take the generator back out with
/// [`RngStream::into_rng`] to keep threading it explicitly.
#[derive(Clone, Debug)]
pub struct RngStream {
    rng: Rng,
}

impl RngStream {
    /// Wrap a generator.
    #[must_use]
    pub fn new(rng: Rng) -> Self {
        Self { rng }
    }

    /// The generator after every draw made through this stream.
    #[must_use]
    pub fn into_rng(self) -> Rng {
        self.rng
    }
}

impl RngCore for RngStream {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let (word, next) = self.rng.step();
        self.rng = next;
        word
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// SplitMix64 finalizer, used to spread seeds across the 128-bit state.
#[must_use]
pub(crate) fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(rng: Rng, n: usize) -> Vec<u64> {
        let mut rng = rng;
        (0..n)
            .map(|_| {
                let (w, next) = rng.step();
                rng = next;
                w
            })
            .collect()
    }

    #[test]
    fn test_determinism() {
        assert_eq!(draws(Rng::new(42), 100), draws(Rng::new(42), 100));
    }

    #[test]
    fn test_different_seeds() {
        assert_ne!(draws(Rng::new(1), 10), draws(Rng::new(2), 10));
    }

    #[test]
    fn test_step_is_pure() {
        let rng = Rng::new(7);
        let (a, _) = rng.step();
        let (b, _) = rng.step();
        assert_eq!(a, b);
    }

    #[test]
    fn test_next_int_bounds() {
        let mut rng = Rng::new(99);
        for _ in 0..10_000 {
            let (v, next) = rng.next_int(-3, 4).unwrap();
            assert!((-3..=4).contains(&v));
            rng = next;
        }
    }

    #[test]
    fn test_next_int_single_value() {
        let (v, _) = Rng::new(5).next_int(9, 9).unwrap();
        assert_eq!(v, 9);
    }

    #[test]
    fn test_next_int_full_range() {
        let (_, next) = Rng::new(5).next_int(i64::MIN, i64::MAX).unwrap();
        assert_ne!(next, Rng::new(5));
    }

    #[test]
    fn test_next_int_invalid_range() {
        let err = Rng::new(5).next_int(3, 2).unwrap_err();
        assert_eq!(err, RngError::InvalidRange { min: 3, max: 2 });
    }

    #[test]
    fn test_next_int_uniform_over_three() {
        let mut rng = Rng::new(2024);
        let mut counts = [0usize; 3];
        for _ in 0..30_000 {
            let (v, next) = rng.next_int(0, 2).unwrap();
            counts[v as usize] += 1;
            rng = next;
        }
        for count in counts {
            assert!((9_400..=10_600).contains(&count), "skewed bucket: {counts:?}");
        }
    }

    #[test]
    fn test_fork_produces_different_sequence() {
        let (parent, child) = Rng::new(42).fork();
        assert_ne!(draws(parent, 10), draws(child, 10));
    }

    #[test]
    fn test_fork_is_deterministic() {
        assert_eq!(Rng::new(42).fork(), Rng::new(42).fork());
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut data: Vec<i32> = (1..=10).collect();
        let _ = Rng::new(42).shuffle(&mut data);
        assert_ne!(data, (1..=10).collect::<Vec<_>>());
        data.sort_unstable();
        assert_eq!(data, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_state_roundtrip() {
        let mut rng = Rng::new(42);
        for _ in 0..100 {
            rng = rng.step().1;
        }
        let restored = Rng::from_state(&rng.to_state()).unwrap();
        assert_eq!(draws(rng, 10), draws(restored, 10));
    }

    #[test]
    fn test_state_serde() {
        let rng = Rng::new(17).step().1;
        let json = serde_json::to_string(&rng).unwrap();
        let back: Rng = serde_json::from_str(&json).unwrap();
        assert_eq!(rng, back);
        assert!(json.contains(RNG_ALGORITHM));
    }

    #[test]
    fn test_deserialize_rejects_unknown_algorithm() {
        let mut state = Rng::new(1).to_state();
        state.algorithm = "xorshift/v0".into();
        assert!(matches!(
            Rng::from_state(&state),
            Err(RngError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_even_increment() {
        let mut state = Rng::new(1).to_state();
        state.words[3] &= !1;
        assert_eq!(Rng::from_state(&state), Err(RngError::InvalidState));
    }

    #[test]
    fn test_stream_matches_pure_steps() {
        let rng = Rng::new(3);
        let mut stream = RngStream::new(rng);
        let via_stream: Vec<u64> = (0..5).map(|_| stream.next_u64()).collect();
        assert_eq!(via_stream, draws(rng, 5));
        assert_eq!(stream.into_rng(), {
            let mut r = rng;
            for _ in 0..5 {
                r = r.step().1;
            }
            r
        });
    }
}
