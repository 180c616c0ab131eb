#![allow(unsafe_op_in_unsafe_fn)]
//! AVX2 lanes (256-bit).
//!
//! AVX2 byte shuffles and packs operate per 128-bit half, so anything that
//! changes lane width is followed by a cross-half permute.

use core::arch::x86_64::*;

use super::westmere::{compact_pairs_128, load_mask};
use super::{Lanes, SWAP_BYTES};
use crate::encoding::Endianness;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Haswell;

/// Qword order 0, 2, 1, 3: undoes the per-half interleave of `pack*_epi16`.
const PACK_FIXUP: i32 = 0b11_01_10_00;

impl Lanes for Haswell {
    const BYTES: usize = 32;
    const WORDS: usize = 16;

    type Bytes = __m256i;
    type Words = __m256i;

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn load(ptr: *const u8) -> __m256i {
        _mm256_loadu_si256(ptr as *const __m256i)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn store(ptr: *mut u8, v: __m256i) {
        _mm256_storeu_si256(ptr as *mut __m256i, v)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn is_ascii(v: __m256i) -> bool {
        _mm256_testz_si256(v, _mm256_set1_epi8(0x80u8 as i8)) == 1
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn widen<E: Endianness>(v: __m256i) -> (__m256i, __m256i) {
        // Zero extension is the full-width form of the interleave shuffle.
        let lo = _mm256_cvtepu8_epi16(_mm256_castsi256_si128(v));
        let hi = _mm256_cvtepu8_epi16(_mm256_extracti128_si256::<1>(v));
        if E::BIG {
            (_mm256_slli_epi16::<8>(lo), _mm256_slli_epi16::<8>(hi))
        } else {
            (lo, hi)
        }
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn load_words<E: Endianness>(ptr: *const u8) -> __m256i {
        let w = _mm256_loadu_si256(ptr as *const __m256i);
        if E::BIG {
            _mm256_shuffle_epi8(w, _mm256_broadcastsi128_si256(load_mask(&SWAP_BYTES)))
        } else {
            w
        }
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn store_words(ptr: *mut u8, w: __m256i) {
        _mm256_storeu_si256(ptr as *mut __m256i, w)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn narrow_store(ptr: *mut u8, w: __m256i) {
        let packed = _mm256_packus_epi16(w, _mm256_setzero_si256());
        let packed = _mm256_permute4x64_epi64::<PACK_FIXUP>(packed);
        _mm_storeu_si128(ptr as *mut __m128i, _mm256_castsi256_si128(packed))
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn words_all_below(w: __m256i, mask: u16) -> bool {
        _mm256_testz_si256(w, _mm256_set1_epi16(mask as i16)) == 1
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn splat(x: u16) -> __m256i {
        _mm256_set1_epi16(x as i16)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn and(a: __m256i, b: __m256i) -> __m256i {
        _mm256_and_si256(a, b)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn or(a: __m256i, b: __m256i) -> __m256i {
        _mm256_or_si256(a, b)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn shr<const N: i32>(w: __m256i) -> __m256i {
        _mm256_srli_epi16::<N>(w)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn shl<const N: i32>(w: __m256i) -> __m256i {
        _mm256_slli_epi16::<N>(w)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn eq(a: __m256i, b: __m256i) -> __m256i {
        _mm256_cmpeq_epi16(a, b)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn select(m: __m256i, a: __m256i, b: __m256i) -> __m256i {
        _mm256_blendv_epi8(b, a, m)
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn movemask(m: __m256i) -> u32 {
        let packed = _mm256_packs_epi16(m, _mm256_setzero_si256());
        let packed = _mm256_permute4x64_epi64::<PACK_FIXUP>(packed);
        (_mm256_movemask_epi8(packed) as u32) & 0xFFFF
    }

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn compact_store(pairs: __m256i, single: u32, dst: *mut u8) -> usize {
        let first = compact_pairs_128(_mm256_castsi256_si128(pairs), single & 0xFF, dst);
        let second = compact_pairs_128(
            _mm256_extracti128_si256::<1>(pairs),
            (single >> 8) & 0xFF,
            dst.add(first),
        );
        first + second
    }
}
