//! Per-pair call counters.
//!
//! Only compiled with the `perf-counters` feature. Meant for profiling which
//! calls reach the vector kernels and which are pushed onto the scalar path by
//! undersized output buffers; not tuned for minimal overhead.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::encoding::EncodingPair;

const BUCKETS: usize = 8;
const PAIRS: usize = EncodingPair::ALL.len();

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairStats {
    pub calls: u64,
    /// Source code units across all calls.
    pub units: u64,
    pub scalar_calls: u64,
    pub simd_calls: u64,
    /// Calls by input size: <=16, <=32, ... , >1024 units.
    pub buckets: [u64; BUCKETS],
}

struct Counters {
    calls: AtomicU64,
    units: AtomicU64,
    scalar: AtomicU64,
    simd: AtomicU64,
    buckets: [AtomicU64; BUCKETS],
}

impl Counters {
    const fn new() -> Self {
        Counters {
            calls: AtomicU64::new(0),
            units: AtomicU64::new(0),
            scalar: AtomicU64::new(0),
            simd: AtomicU64::new(0),
            buckets: [const { AtomicU64::new(0) }; BUCKETS],
        }
    }
}

static COUNTERS: [Counters; PAIRS] = [const { Counters::new() }; PAIRS];

#[inline]
fn bucket_index(units: usize) -> usize {
    match units {
        0..=16 => 0,
        17..=32 => 1,
        33..=64 => 2,
        65..=128 => 3,
        129..=256 => 4,
        257..=512 => 5,
        513..=1024 => 6,
        _ => 7,
    }
}

#[inline]
fn slot(pair: EncodingPair) -> Option<&'static Counters> {
    EncodingPair::ALL
        .iter()
        .position(|p| *p == pair)
        .map(|idx| &COUNTERS[idx])
}

#[inline]
pub fn record(pair: EncodingPair, units: usize, used_simd: bool) {
    let Some(c) = slot(pair) else {
        return;
    };
    c.calls.fetch_add(1, Ordering::Relaxed);
    c.units.fetch_add(units as u64, Ordering::Relaxed);
    if used_simd {
        c.simd.fetch_add(1, Ordering::Relaxed);
    } else {
        c.scalar.fetch_add(1, Ordering::Relaxed);
    }
    c.buckets[bucket_index(units)].fetch_add(1, Ordering::Relaxed);
}

pub fn reset() {
    for c in &COUNTERS {
        c.calls.store(0, Ordering::Relaxed);
        c.units.store(0, Ordering::Relaxed);
        c.scalar.store(0, Ordering::Relaxed);
        c.simd.store(0, Ordering::Relaxed);
        for bucket in &c.buckets {
            bucket.store(0, Ordering::Relaxed);
        }
    }
}

pub fn snapshot(pair: EncodingPair) -> PairStats {
    let Some(c) = slot(pair) else {
        return PairStats::default();
    };
    let mut buckets = [0u64; BUCKETS];
    for (idx, bucket) in c.buckets.iter().enumerate() {
        buckets[idx] = bucket.load(Ordering::Relaxed);
    }
    PairStats {
        calls: c.calls.load(Ordering::Relaxed),
        units: c.units.load(Ordering::Relaxed),
        scalar_calls: c.scalar.load(Ordering::Relaxed),
        simd_calls: c.simd.load(Ordering::Relaxed),
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Encoding;

    #[test]
    fn test_convert_updates_counters() {
        // Counters are global; use a pair no other unit test drives.
        let pair = EncodingPair::new(Encoding::Utf16Be, Encoding::Latin1);
        let before = snapshot(pair);

        let src = [0u8, b'a', 0, b'b'];
        let mut dst = [0u8; 2];
        crate::active().convert(pair, &src, &mut dst).unwrap();

        let after = snapshot(pair);
        assert_eq!(after.calls, before.calls + 1);
        assert_eq!(after.units, before.units + 2);
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(16), 0);
        assert_eq!(bucket_index(17), 1);
        assert_eq!(bucket_index(4096), 7);
    }
}
