//! Lane-repacking primitives.
//!
//! Every kernel in [`crate::kernels`] is written once against the [`Lanes`]
//! trait and instantiated per architecture. The trait is deliberately small:
//! only the handful of operations the transcoding loops need, each with the
//! same semantics on every backend:
//!
//! - `Portable`: plain 16-byte arrays (SWAR tests, emulated shuffles). Runs
//!   anywhere and is the reference the other backends are tested against.
//! - `Westmere`: SSSE3 + SSE4.1 (`pshufb`, `ptest`, `pblendvb`), 16 bytes.
//! - `Haswell`: AVX2, 32 bytes. Byte shuffles are per 128-bit half.
//! - `Neon`: aarch64 NEON (`tbl`, across-vector max), 16 bytes.
//!
//! Register layout convention: a `Words` value holds `u16` lanes whose memory
//! image (what `store_words` writes) is little-endian, except when produced by
//! `widen::<BigEndian>`, which lays out big-endian UTF-16 directly.

use crate::encoding::Endianness;

pub(crate) mod portable;

#[cfg(target_arch = "x86_64")]
pub(crate) mod haswell;
#[cfg(target_arch = "x86_64")]
pub(crate) mod westmere;

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

/// Fixed-width vector capability.
///
/// All methods are `unsafe`: pointer arguments must be valid for the full
/// access width (`BYTES` for loads/stores, `WORDS` for `narrow_store`, 16 per
/// 128-bit half for `compact_store`), and the backend's instruction set must be
/// available on the running CPU.
pub(crate) trait Lanes {
    /// Bytes per register (W).
    const BYTES: usize;
    /// `u16` lanes per register (W / 2).
    const WORDS: usize;

    type Bytes: Copy;
    type Words: Copy;

    /// Unaligned load of `BYTES` bytes.
    unsafe fn load(ptr: *const u8) -> Self::Bytes;
    /// Unaligned store of `BYTES` bytes.
    unsafe fn store(ptr: *mut u8, v: Self::Bytes);
    /// True iff every byte is below 0x80, tested without extracting lanes.
    unsafe fn is_ascii(v: Self::Bytes) -> bool;
    /// Interleave each byte with a zero byte, producing the first and second
    /// half of the register as `u16` lanes. `E` decides whether the zero byte
    /// lands after (little-endian) or before (big-endian) the data byte.
    unsafe fn widen<E: Endianness>(v: Self::Bytes) -> (Self::Words, Self::Words);

    /// Load `WORDS` UTF-16 units stored in byte order `E`, as native values.
    unsafe fn load_words<E: Endianness>(ptr: *const u8) -> Self::Words;
    /// Store the register's memory image (`BYTES` bytes).
    unsafe fn store_words(ptr: *mut u8, w: Self::Words);
    /// Store the low byte of every lane (`WORDS` bytes). Exact only when every
    /// lane is at most 0xFF.
    unsafe fn narrow_store(ptr: *mut u8, w: Self::Words);
    /// True iff `lane & mask == 0` for every lane.
    unsafe fn words_all_below(w: Self::Words, mask: u16) -> bool;

    unsafe fn splat(x: u16) -> Self::Words;
    unsafe fn and(a: Self::Words, b: Self::Words) -> Self::Words;
    unsafe fn or(a: Self::Words, b: Self::Words) -> Self::Words;
    unsafe fn shr<const N: i32>(w: Self::Words) -> Self::Words;
    unsafe fn shl<const N: i32>(w: Self::Words) -> Self::Words;
    /// Lane-wise equality; 0xFFFF where equal.
    unsafe fn eq(a: Self::Words, b: Self::Words) -> Self::Words;
    /// `a` where `m` is set, `b` elsewhere. `m` lanes are 0 or 0xFFFF.
    unsafe fn select(m: Self::Words, a: Self::Words, b: Self::Words) -> Self::Words;
    /// One bit per lane (bit i = lane i), for `m` lanes that are 0 or 0xFFFF.
    unsafe fn movemask(m: Self::Words) -> u32;

    /// Store byte pairs, dropping the high byte of every lane whose bit is set
    /// in `single`. Returns the number of bytes kept.
    ///
    /// Always writes whole 16-byte blocks; bytes past the returned length are
    /// garbage that the next store overwrites.
    unsafe fn compact_store(pairs: Self::Words, single: u32, dst: *mut u8) -> usize;
}

/// `pshufb`-style masks: entries with the high bit set produce a zero byte.
const ZERO: u8 = 0x80;

const fn widen_mask(big_endian: bool, half: usize) -> [u8; 16] {
    let mut mask = [ZERO; 16];
    let mut lane = 0;
    while lane < 8 {
        let source = (half * 8 + lane) as u8;
        if big_endian {
            mask[2 * lane + 1] = source;
        } else {
            mask[2 * lane] = source;
        }
        lane += 1;
    }
    mask
}

/// Byte 0..8 / 8..16 of a 16-byte register, zero-extended to little-endian u16.
pub(crate) const WIDEN_LE: [[u8; 16]; 2] = [widen_mask(false, 0), widen_mask(false, 1)];
/// Same, with the zero byte first (big-endian UTF-16 layout).
pub(crate) const WIDEN_BE: [[u8; 16]; 2] = [widen_mask(true, 0), widen_mask(true, 1)];

/// Swaps the two bytes of every u16 lane.
pub(crate) const SWAP_BYTES: [u8; 16] = [1, 0, 3, 2, 5, 4, 7, 6, 9, 8, 11, 10, 13, 12, 15, 14];

#[inline(always)]
pub(crate) fn widen_masks<E: Endianness>() -> &'static [[u8; 16]; 2] {
    if E::BIG { &WIDEN_BE } else { &WIDEN_LE }
}

const fn build_pack_table() -> [[u8; 16]; 256] {
    let mut table = [[ZERO; 16]; 256];
    let mut single = 0;
    while single < 256 {
        let mut out = 0;
        let mut lane = 0;
        while lane < 8 {
            table[single][out] = (2 * lane) as u8;
            out += 1;
            if single & (1 << lane) == 0 {
                table[single][out] = (2 * lane + 1) as u8;
                out += 1;
            }
            lane += 1;
        }
        single += 1;
    }
    table
}

/// Compaction shuffles for 8 lanes of 1-or-2 byte UTF-8 pairs, indexed by the
/// bitmask of single-byte lanes. Row `m` keeps `16 - m.count_ones()` bytes.
pub(crate) static PACK_1_2_UTF8: [[u8; 16]; 256] = build_pack_table();

/// Emulated `pshufb`.
#[inline(always)]
pub(crate) fn shuffle_bytes(v: &[u8; 16], mask: &[u8; 16]) -> [u8; 16] {
    core::array::from_fn(|i| {
        let m = mask[i];
        if m & ZERO != 0 { 0 } else { v[(m & 0x0F) as usize] }
    })
}
