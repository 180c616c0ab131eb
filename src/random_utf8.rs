//! Pseudo-random well-formed UTF-8 for benchmarks and tests.
//!
//! Each scalar value is drawn by first choosing its encoded length (1 to 4
//! bytes) with the configured weights, then a uniform code point of that
//! length. Surrogates are never produced.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("byte-length weights must be finite and non-negative, got {0:?}")]
    InvalidWeight([f64; 4]),
    #[error("at least one byte-length weight must be positive")]
    AllZero,
}

/// Generator of random UTF-8 strings.
#[derive(Debug, Clone)]
pub struct RandomUtf8<R: Rng> {
    rng: R,
    /// Cumulative weights for 1, 2, 3, 4-byte sequences, normalised to 1.0.
    cumulative: [f64; 4],
}

impl RandomUtf8<StdRng> {
    /// Deterministic generator.
    pub fn seeded(seed: u64, weights: [f64; 4]) -> Result<Self, DistributionError> {
        Self::new(StdRng::seed_from_u64(seed), weights)
    }

    /// Generator seeded from the OS.
    pub fn from_entropy(weights: [f64; 4]) -> Result<Self, DistributionError> {
        Self::new(StdRng::from_os_rng(), weights)
    }
}

impl<R: Rng> RandomUtf8<R> {
    /// `weights[k]` is the relative frequency of `k + 1`-byte sequences.
    pub fn new(rng: R, weights: [f64; 4]) -> Result<Self, DistributionError> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DistributionError::InvalidWeight(weights));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(DistributionError::AllZero);
        }

        let mut cumulative = [0.0; 4];
        let mut acc = 0.0;
        for (slot, w) in cumulative.iter_mut().zip(weights) {
            acc += w / total;
            *slot = acc;
        }
        // Rounding can leave the sum just below 1.0; pin it at the last class
        // with a positive weight so zero-weight classes are never drawn.
        if let Some(last) = weights.iter().rposition(|&w| w > 0.0) {
            cumulative[last..].fill(1.0);
        }
        Ok(RandomUtf8 { rng, cumulative })
    }

    fn sequence_len(&mut self) -> usize {
        let x: f64 = self.rng.random();
        self.cumulative
            .iter()
            .position(|&c| x < c)
            .map_or(4, |idx| idx + 1)
    }

    fn code_point(&mut self, len: usize) -> u32 {
        match len {
            1 => self.rng.random_range(0..0x80),
            2 => self.rng.random_range(0x80..0x800),
            3 => {
                // Skip the surrogate block.
                let cp = self.rng.random_range(0x800..0x10000 - 0x800);
                if cp >= 0xD800 { cp + 0x800 } else { cp }
            }
            _ => self.rng.random_range(0x10000..0x110000),
        }
    }

    /// Exactly `size` bytes of well-formed UTF-8.
    ///
    /// When the drawn sequence would not fit in the remaining space, the
    /// remainder is filled with ASCII.
    pub fn generate(&mut self, size: usize) -> Vec<u8> {
        self.generate_string(size).into_bytes()
    }

    /// Like [`generate`](Self::generate), returned as a `String`.
    pub fn generate_string(&mut self, size: usize) -> String {
        let mut out = String::with_capacity(size);
        while out.len() < size {
            let mut len = self.sequence_len();
            if out.len() + len > size {
                len = 1;
            }
            if let Some(ch) = char::from_u32(self.code_point(len)) {
                out.push(ch);
            }
        }
        out
    }
}
