#![allow(unsafe_op_in_unsafe_fn)]
//! NEON lanes (128-bit).
//!
//! NEON is baseline on aarch64, but Rust still marks calls into
//! `#[target_feature(enable = "neon")]` functions as `unsafe`.

use core::arch::aarch64::*;

use super::{Lanes, PACK_1_2_UTF8, widen_masks};
use crate::encoding::Endianness;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Neon;

const LANE_BITS: [u16; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

impl Lanes for Neon {
    const BYTES: usize = 16;
    const WORDS: usize = 8;

    type Bytes = uint8x16_t;
    type Words = uint16x8_t;

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn load(ptr: *const u8) -> uint8x16_t {
        vld1q_u8(ptr)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn store(ptr: *mut u8, v: uint8x16_t) {
        vst1q_u8(ptr, v)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn is_ascii(v: uint8x16_t) -> bool {
        vmaxvq_u8(v) < 0x80
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn widen<E: Endianness>(v: uint8x16_t) -> (uint16x8_t, uint16x8_t) {
        let masks = widen_masks::<E>();
        // `tbl` yields zero for out-of-range indices, so 0x80 entries work as
        // they do for `pshufb`.
        let lo = vqtbl1q_u8(v, vld1q_u8(masks[0].as_ptr()));
        let hi = vqtbl1q_u8(v, vld1q_u8(masks[1].as_ptr()));
        (vreinterpretq_u16_u8(lo), vreinterpretq_u16_u8(hi))
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn load_words<E: Endianness>(ptr: *const u8) -> uint16x8_t {
        let bytes = vld1q_u8(ptr);
        if E::BIG {
            vreinterpretq_u16_u8(vrev16q_u8(bytes))
        } else {
            vreinterpretq_u16_u8(bytes)
        }
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn store_words(ptr: *mut u8, w: uint16x8_t) {
        vst1q_u8(ptr, vreinterpretq_u8_u16(w))
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn narrow_store(ptr: *mut u8, w: uint16x8_t) {
        vst1_u8(ptr, vmovn_u16(w))
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn words_all_below(w: uint16x8_t, mask: u16) -> bool {
        vmaxvq_u16(vandq_u16(w, vdupq_n_u16(mask))) == 0
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn splat(x: u16) -> uint16x8_t {
        vdupq_n_u16(x)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn and(a: uint16x8_t, b: uint16x8_t) -> uint16x8_t {
        vandq_u16(a, b)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn or(a: uint16x8_t, b: uint16x8_t) -> uint16x8_t {
        vorrq_u16(a, b)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn shr<const N: i32>(w: uint16x8_t) -> uint16x8_t {
        vshrq_n_u16::<N>(w)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn shl<const N: i32>(w: uint16x8_t) -> uint16x8_t {
        vshlq_n_u16::<N>(w)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn eq(a: uint16x8_t, b: uint16x8_t) -> uint16x8_t {
        vceqq_u16(a, b)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn select(m: uint16x8_t, a: uint16x8_t, b: uint16x8_t) -> uint16x8_t {
        vbslq_u16(m, a, b)
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn movemask(m: uint16x8_t) -> u32 {
        vaddvq_u16(vandq_u16(m, vld1q_u16(LANE_BITS.as_ptr()))) as u32
    }

    #[inline]
    #[target_feature(enable = "neon")]
    unsafe fn compact_store(pairs: uint16x8_t, single: u32, dst: *mut u8) -> usize {
        let single = single & 0xFF;
        let row = &PACK_1_2_UTF8[single as usize];
        let packed = vqtbl1q_u8(vreinterpretq_u8_u16(pairs), vld1q_u8(row.as_ptr()));
        vst1q_u8(dst, packed);
        16 - single.count_ones() as usize
    }
}
