// Architecture glue: every function here is a thin wrapper over intrinsics and
// is only reachable through kernels compiled with the same target features.
#![allow(unsafe_op_in_unsafe_fn)]
//! SSSE3/SSE4.1 lanes (128-bit).

use core::arch::x86_64::*;

use super::{Lanes, PACK_1_2_UTF8, SWAP_BYTES, widen_masks};
use crate::encoding::Endianness;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Westmere;

/// Compact one 128-bit register of UTF-8 pairs through [`PACK_1_2_UTF8`].
///
/// Shared with the AVX2 backend, which calls it once per half.
#[inline]
#[target_feature(enable = "ssse3")]
pub(super) unsafe fn compact_pairs_128(pairs: __m128i, single: u32, dst: *mut u8) -> usize {
    let single = single & 0xFF;
    let row = &PACK_1_2_UTF8[single as usize];
    let shuffle = _mm_loadu_si128(row.as_ptr() as *const __m128i);
    // SAFETY: caller guarantees 16 writable bytes at `dst`.
    _mm_storeu_si128(dst as *mut __m128i, _mm_shuffle_epi8(pairs, shuffle));
    16 - single.count_ones() as usize
}

#[inline]
#[target_feature(enable = "sse2")]
pub(super) unsafe fn load_mask(mask: &[u8; 16]) -> __m128i {
    _mm_loadu_si128(mask.as_ptr() as *const __m128i)
}

impl Lanes for Westmere {
    const BYTES: usize = 16;
    const WORDS: usize = 8;

    type Bytes = __m128i;
    type Words = __m128i;

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn load(ptr: *const u8) -> __m128i {
        _mm_loadu_si128(ptr as *const __m128i)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn store(ptr: *mut u8, v: __m128i) {
        _mm_storeu_si128(ptr as *mut __m128i, v)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn is_ascii(v: __m128i) -> bool {
        _mm_testz_si128(v, _mm_set1_epi8(0x80u8 as i8)) == 1
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn widen<E: Endianness>(v: __m128i) -> (__m128i, __m128i) {
        let masks = widen_masks::<E>();
        (
            _mm_shuffle_epi8(v, load_mask(&masks[0])),
            _mm_shuffle_epi8(v, load_mask(&masks[1])),
        )
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn load_words<E: Endianness>(ptr: *const u8) -> __m128i {
        let w = _mm_loadu_si128(ptr as *const __m128i);
        if E::BIG {
            _mm_shuffle_epi8(w, load_mask(&SWAP_BYTES))
        } else {
            w
        }
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn store_words(ptr: *mut u8, w: __m128i) {
        _mm_storeu_si128(ptr as *mut __m128i, w)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn narrow_store(ptr: *mut u8, w: __m128i) {
        _mm_storel_epi64(ptr as *mut __m128i, _mm_packus_epi16(w, w))
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn words_all_below(w: __m128i, mask: u16) -> bool {
        _mm_testz_si128(w, _mm_set1_epi16(mask as i16)) == 1
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn splat(x: u16) -> __m128i {
        _mm_set1_epi16(x as i16)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn and(a: __m128i, b: __m128i) -> __m128i {
        _mm_and_si128(a, b)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn or(a: __m128i, b: __m128i) -> __m128i {
        _mm_or_si128(a, b)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn shr<const N: i32>(w: __m128i) -> __m128i {
        _mm_srli_epi16::<N>(w)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn shl<const N: i32>(w: __m128i) -> __m128i {
        _mm_slli_epi16::<N>(w)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn eq(a: __m128i, b: __m128i) -> __m128i {
        _mm_cmpeq_epi16(a, b)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn select(m: __m128i, a: __m128i, b: __m128i) -> __m128i {
        _mm_blendv_epi8(b, a, m)
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn movemask(m: __m128i) -> u32 {
        // Saturating pack keeps 0 / -1 per lane, one byte each.
        (_mm_movemask_epi8(_mm_packs_epi16(m, _mm_setzero_si128())) as u32) & 0xFF
    }

    #[inline]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn compact_store(pairs: __m128i, single: u32, dst: *mut u8) -> usize {
        compact_pairs_128(pairs, single, dst)
    }
}
