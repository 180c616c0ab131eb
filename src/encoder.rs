//! Vector UTF-8 encoding of code points up to 11 bits.
//!
//! Input is one register of `u16` lanes, each a code point below U+0800. For
//! every lane we build the two-byte form
//!
//! ```text
//!   low byte  = 0b110a_aaaa   (cp >> 6 | 0xC0)
//!   high byte = 0b10bb_bbbb   (cp & 0x3F | 0x80)
//! ```
//!
//! and for ASCII lanes we keep the code point itself. A per-lane bitmask of
//! ASCII lanes then indexes a compaction shuffle that drops the unused high
//! byte of those lanes, so the output is contiguous.

use crate::lanes::Lanes;

/// Progress of one vector step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    /// Code units consumed.
    pub read: usize,
    /// Bytes produced.
    pub written: usize,
}

/// Encode `L::WORDS` code points (all `<= 0x7FF`) as UTF-8 at `dst`.
///
/// # Safety
///
/// `dst` must be writable for `2 * L::WORDS` bytes (the compaction stores whole
/// 16-byte blocks even when fewer bytes are kept), and the backend of `L` must
/// be runnable on this CPU.
#[inline(always)]
pub(crate) unsafe fn write_words_11bits_to_utf8<L: Lanes>(w: L::Words, dst: *mut u8) -> Step {
    // SAFETY: forwarded to the caller.
    unsafe {
        if L::words_all_below(w, 0xFF80) {
            L::narrow_store(dst, w);
            return Step {
                read: L::WORDS,
                written: L::WORDS,
            };
        }

        let ascii = L::eq(L::and(w, L::splat(0xFF80)), L::splat(0));
        let lead = L::or(L::shr::<6>(w), L::splat(0x00C0));
        let cont = L::or(L::and(L::shl::<8>(w), L::splat(0x3F00)), L::splat(0x8000));
        let pairs = L::select(ascii, w, L::or(lead, cont));
        let single = L::movemask(ascii);

        Step {
            read: L::WORDS,
            written: L::compact_store(pairs, single, dst),
        }
    }
}
