//! Race random source
//!
//! A seeded source is fully reproducible: the seed string is folded to 32 bits
//! and drives a small counter-based generator, so the same seed always replays
//! the same race. An unseeded source draws from a PCG stream seeded by the
//! thread RNG and makes no reproducibility promise.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

/// Fold a seed string into 32 bits: `acc = acc * 31 + codepoint (mod 2^32)`
pub fn fold_seed(seed: &str) -> u32 {
    seed.chars()
        .fold(0u32, |acc, c| acc.wrapping_mul(31).wrapping_add(c as u32))
}

/// Counter-based 32-bit generator.
///
/// The state advances by a fixed odd increment per draw and the output is
/// decorrelated by an invertible xor-shift / multiply mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    const INCREMENT: u32 = 0x6D2B_79F5;

    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(Self::INCREMENT);
        let t = self.state;
        let mut r = (t ^ (t >> 15)).wrapping_mul(1 | t);
        r ^= r.wrapping_add((r ^ (r >> 7)).wrapping_mul(61 | r));
        r ^ (r >> 14)
    }
}

/// Where a race gets its randomness from
#[derive(Debug, Clone)]
pub enum RandomSource {
    /// Reproducible stream derived from a seed string
    Seeded { seed: String, generator: Mulberry32 },
    /// Platform entropy, different every run
    Unseeded(Pcg32),
}

impl RandomSource {
    /// Seeded when a non-empty seed is given, unseeded otherwise
    pub fn from_seed(seed: Option<&str>) -> Self {
        match seed {
            Some(s) if !s.is_empty() => Self::seeded(s),
            _ => Self::unseeded(),
        }
    }

    pub fn seeded(seed: &str) -> Self {
        Self::Seeded {
            seed: seed.to_string(),
            generator: Mulberry32::new(fold_seed(seed)),
        }
    }

    pub fn unseeded() -> Self {
        Self::Unseeded(Pcg32::from_rng(&mut rand::rng()))
    }

    /// The seed string, or `None` for an unseeded source
    pub fn seed(&self) -> Option<&str> {
        match self {
            Self::Seeded { seed, .. } => Some(seed),
            Self::Unseeded(_) => None,
        }
    }

    /// Uniform value in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        f64::from(RngCore::next_u32(self)) / 4_294_967_296.0
    }

    /// Uniform value in [min, max)
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        match self {
            Self::Seeded { generator, .. } => generator.next_u32(),
            Self::Unseeded(pcg) => pcg.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(RngCore::next_u32(self));
        let hi = u64::from(RngCore::next_u32(self));
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = RngCore::next_u32(self).to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}
