//! Deterministic PRNG shared by every stochastic part of a game.
//!
//! Uses the SplitMix64 algorithm: fast, 8 bytes of state, excellent
//! statistical properties, and trivially serializable. A game owns exactly
//! one stream; customer churn, node sampling and cooldown jitter all draw
//! from it, so replays depend on call order staying stable.

use crate::fixed::Fixed64;

/// SplitMix64 pseudo-random number generator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Returns `true` with the given probability (Fixed64 in [0, 1]).
    ///
    /// - probability <= 0 always returns false
    /// - probability >= 1 always returns true
    pub fn chance(&mut self, probability: Fixed64) -> bool {
        if probability <= Fixed64::ZERO {
            return false;
        }
        if probability >= Fixed64::ONE {
            return true;
        }
        // For p in (0,1) the Q32.32 bits are the fraction scaled to [0, 2^32).
        let upper = self.next_u64() >> 32;
        upper < probability.to_bits() as u64
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_fixed(&mut self) -> Fixed64 {
        Fixed64::from_bits((self.next_u64() >> 32) as i64)
    }

    /// Uniform value in `[lo, hi)`. Returns `lo` when the range is empty.
    pub fn range_fixed(&mut self, lo: Fixed64, hi: Fixed64) -> Fixed64 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.next_fixed()
    }

    /// Uniform integer in `[0, n)`. Returns 0 when `n == 0`.
    pub fn below(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        self.next_u64() % n
    }

    /// Uniform integer in `[lo, hi)`. Returns `lo` when the range is empty.
    pub fn range_u64(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        lo + self.below(hi - lo)
    }

    /// A uniformly chosen element, or `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.below(items.len() as u64) as usize;
        items.get(idx)
    }

    /// Index of an element chosen with probability proportional to its
    /// weight. Non-positive weights are never chosen.
    pub fn weighted_index(&mut self, weights: &[Fixed64]) -> Option<usize> {
        let total: Fixed64 = weights
            .iter()
            .filter(|w| **w > Fixed64::ZERO)
            .fold(Fixed64::ZERO, |acc, w| acc.saturating_add(*w));
        if total <= Fixed64::ZERO {
            return None;
        }
        let mut roll = total * self.next_fixed();
        let mut last = None;
        for (i, w) in weights.iter().enumerate() {
            if *w <= Fixed64::ZERO {
                continue;
            }
            if roll < *w {
                return Some(i);
            }
            roll -= *w;
            last = Some(i);
        }
        last
    }

    /// Get the internal state (for hashing/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}
