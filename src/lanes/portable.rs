//! Emulated 128-bit lanes.
//!
//! Byte registers are `[u8; 16]`, word registers `[u16; 8]` holding native
//! values. The memory image of a word register is little-endian, matching the
//! hardware backends on the targets we ship.

use core::ptr;

use byteorder::{ByteOrder, LittleEndian};

use super::{Lanes, PACK_1_2_UTF8, shuffle_bytes, widen_masks};
use crate::encoding::Endianness;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Portable;

const HIGH_BITS: u128 = u128::from_ne_bytes([0x80; 16]);

#[inline(always)]
fn words_from_image(bytes: &[u8; 16]) -> [u16; 8] {
    let mut words = [0u16; 8];
    LittleEndian::read_u16_into(bytes, &mut words);
    words
}

#[inline(always)]
fn image_from_words(words: &[u16; 8]) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    LittleEndian::write_u16_into(words, &mut bytes);
    bytes
}

impl Lanes for Portable {
    const BYTES: usize = 16;
    const WORDS: usize = 8;

    type Bytes = [u8; 16];
    type Words = [u16; 8];

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> [u8; 16] {
        // SAFETY: caller guarantees 16 readable bytes.
        unsafe { ptr::read_unaligned(ptr as *const [u8; 16]) }
    }

    #[inline(always)]
    unsafe fn store(ptr: *mut u8, v: [u8; 16]) {
        // SAFETY: caller guarantees 16 writable bytes.
        unsafe { ptr::write_unaligned(ptr as *mut [u8; 16], v) }
    }

    #[inline(always)]
    unsafe fn is_ascii(v: [u8; 16]) -> bool {
        u128::from_ne_bytes(v) & HIGH_BITS == 0
    }

    #[inline(always)]
    unsafe fn widen<E: Endianness>(v: [u8; 16]) -> ([u16; 8], [u16; 8]) {
        let masks = widen_masks::<E>();
        (
            words_from_image(&shuffle_bytes(&v, &masks[0])),
            words_from_image(&shuffle_bytes(&v, &masks[1])),
        )
    }

    #[inline(always)]
    unsafe fn load_words<E: Endianness>(ptr: *const u8) -> [u16; 8] {
        // SAFETY: forwarded to the caller.
        let bytes = unsafe { Self::load(ptr) };
        let mut words = [0u16; 8];
        E::read_u16_into(&bytes, &mut words);
        words
    }

    #[inline(always)]
    unsafe fn store_words(ptr: *mut u8, w: [u16; 8]) {
        // SAFETY: forwarded to the caller.
        unsafe { Self::store(ptr, image_from_words(&w)) }
    }

    #[inline(always)]
    unsafe fn narrow_store(ptr: *mut u8, w: [u16; 8]) {
        let narrowed: [u8; 8] = core::array::from_fn(|i| w[i] as u8);
        // SAFETY: caller guarantees 8 writable bytes.
        unsafe { ptr::write_unaligned(ptr as *mut [u8; 8], narrowed) }
    }

    #[inline(always)]
    unsafe fn words_all_below(w: [u16; 8], mask: u16) -> bool {
        w.iter().fold(0, |acc, &x| acc | x) & mask == 0
    }

    #[inline(always)]
    unsafe fn splat(x: u16) -> [u16; 8] {
        [x; 8]
    }

    #[inline(always)]
    unsafe fn and(a: [u16; 8], b: [u16; 8]) -> [u16; 8] {
        core::array::from_fn(|i| a[i] & b[i])
    }

    #[inline(always)]
    unsafe fn or(a: [u16; 8], b: [u16; 8]) -> [u16; 8] {
        core::array::from_fn(|i| a[i] | b[i])
    }

    #[inline(always)]
    unsafe fn shr<const N: i32>(w: [u16; 8]) -> [u16; 8] {
        w.map(|x| x >> N)
    }

    #[inline(always)]
    unsafe fn shl<const N: i32>(w: [u16; 8]) -> [u16; 8] {
        w.map(|x| x << N)
    }

    #[inline(always)]
    unsafe fn eq(a: [u16; 8], b: [u16; 8]) -> [u16; 8] {
        core::array::from_fn(|i| if a[i] == b[i] { 0xFFFF } else { 0 })
    }

    #[inline(always)]
    unsafe fn select(m: [u16; 8], a: [u16; 8], b: [u16; 8]) -> [u16; 8] {
        core::array::from_fn(|i| (m[i] & a[i]) | (!m[i] & b[i]))
    }

    #[inline(always)]
    unsafe fn movemask(m: [u16; 8]) -> u32 {
        m.iter()
            .enumerate()
            .fold(0, |acc, (i, &x)| acc | (((x >> 15) as u32) << i))
    }

    #[inline(always)]
    unsafe fn compact_store(pairs: [u16; 8], single: u32, dst: *mut u8) -> usize {
        let single = single & 0xFF;
        let packed = shuffle_bytes(&image_from_words(&pairs), &PACK_1_2_UTF8[single as usize]);
        // SAFETY: caller guarantees 16 writable bytes.
        unsafe { Self::store(dst, packed) };
        16 - single.count_ones() as usize
    }
}

#[cfg(test)]
mod tests {
    use byteorder::{BigEndian, LittleEndian};

    use super::*;

    #[test]
    fn test_widen_interleaves_zero_bytes() {
        let v: [u8; 16] = core::array::from_fn(|i| 0xF0 + i as u8);
        let mut out = [0u8; 32];
        unsafe {
            let (lo, hi) = Portable::widen::<LittleEndian>(v);
            Portable::store_words(out.as_mut_ptr(), lo);
            Portable::store_words(out.as_mut_ptr().add(16), hi);
        }
        assert_eq!(&out[..4], &[0xF0, 0, 0xF1, 0]);
        assert_eq!(&out[30..], &[0xFF, 0]);

        unsafe {
            let (lo, hi) = Portable::widen::<BigEndian>(v);
            Portable::store_words(out.as_mut_ptr(), lo);
            Portable::store_words(out.as_mut_ptr().add(16), hi);
        }
        assert_eq!(&out[..4], &[0, 0xF0, 0, 0xF1]);
        assert_eq!(&out[30..], &[0, 0xFF]);
    }

    #[test]
    fn test_load_words_respects_byte_order() {
        let bytes: [u8; 16] = [0x12, 0x34, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xAB, 0xCD];
        let le = unsafe { Portable::load_words::<LittleEndian>(bytes.as_ptr()) };
        let be = unsafe { Portable::load_words::<BigEndian>(bytes.as_ptr()) };
        assert_eq!((le[0], le[7]), (0x3412, 0xCDAB));
        assert_eq!((be[0], be[7]), (0x1234, 0xABCD));
    }

    #[test]
    fn test_is_ascii() {
        let mut v = [b'a'; 16];
        assert!(unsafe { Portable::is_ascii(v) });
        v[15] = 0x80;
        assert!(!unsafe { Portable::is_ascii(v) });
    }

    #[test]
    fn test_movemask_and_compact() {
        let w = [0x41u16, 0xA9C3, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47];
        let mut out = [0u8; 16];
        let n = unsafe {
            let ascii = Portable::eq(
                Portable::and(w, Portable::splat(0xFF00)),
                Portable::splat(0),
            );
            let bits = Portable::movemask(ascii);
            assert_eq!(bits, 0b1111_1101);
            Portable::compact_store(w, bits, out.as_mut_ptr())
        };
        assert_eq!(&out[..n], &[0x41, 0xC3, 0xA9, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47]);
    }
}
