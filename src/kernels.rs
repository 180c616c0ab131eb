// The drivers below are written once against `Lanes` and stamped out per
// architecture. Pointer arithmetic is bounded by the worst-case output size each
// driver asserts on entry; see the `SAFETY:` notes inline.
#![allow(unsafe_op_in_unsafe_fn)]
//! Kernel drivers.
//!
//! Every driver follows the same shape:
//! - full-width vectors while at least `L::BYTES` of input remain
//! - a fast path that needs no decoding at all (ASCII, or units that fit the
//!   target with a plain narrow/widen)
//! - the vector encoder where one exists, otherwise the scalar routines for
//!   just that vector, resumed from the exact cursor
//! - the scalar routines for the tail
//!
//! The scalar routines own all validation semantics, so a vector that is not
//! trivially valid is never guessed at.
//!
//! `dst` must hold the worst case for `src` (`EncodingPair::max_output_len`);
//! the dispatcher only calls these under that condition. The 16-byte stores of
//! the compaction step fit within that bound: each UTF-16 vector of `WORDS`
//! units writes at most `2 * WORDS` bytes past `o` while its worst case is
//! `3 * WORDS`.

use byteorder::{BigEndian, LittleEndian};

use crate::Conversion;
use crate::encoder;
use crate::encoding::{Encoding, EncodingPair, Endianness};
use crate::error::Result;
use crate::lanes::Lanes;
use crate::scalar;

pub(crate) type ConvertFn = unsafe fn(&[u8], &mut [u8]) -> Result<Conversion>;
pub(crate) type ValidateFn = unsafe fn(&[u8]) -> Result<()>;

/// One function pointer per pair for a single capability.
#[derive(Clone, Copy)]
pub(crate) struct Kernels {
    pub latin1_to_utf8: ConvertFn,
    pub latin1_to_utf16le: ConvertFn,
    pub latin1_to_utf16be: ConvertFn,
    pub utf8_to_latin1: ConvertFn,
    pub utf8_to_utf16le: ConvertFn,
    pub utf8_to_utf16be: ConvertFn,
    pub utf16le_to_utf8: ConvertFn,
    pub utf16be_to_utf8: ConvertFn,
    pub utf16le_to_latin1: ConvertFn,
    pub utf16be_to_latin1: ConvertFn,
    pub validate_utf8: ValidateFn,
    pub validate_utf16le: ValidateFn,
    pub validate_utf16be: ValidateFn,
}

impl Kernels {
    pub(crate) fn for_pair(&self, pair: EncodingPair) -> Option<ConvertFn> {
        use Encoding::*;

        Some(match (pair.from, pair.to) {
            (Latin1, Utf8) => self.latin1_to_utf8,
            (Latin1, Utf16Le) => self.latin1_to_utf16le,
            (Latin1, Utf16Be) => self.latin1_to_utf16be,
            (Utf8, Latin1) => self.utf8_to_latin1,
            (Utf8, Utf16Le) => self.utf8_to_utf16le,
            (Utf8, Utf16Be) => self.utf8_to_utf16be,
            (Utf16Le, Utf8) => self.utf16le_to_utf8,
            (Utf16Be, Utf8) => self.utf16be_to_utf8,
            (Utf16Le, Latin1) => self.utf16le_to_latin1,
            (Utf16Be, Latin1) => self.utf16be_to_latin1,
            _ => return None,
        })
    }

    pub(crate) fn for_validation(&self, encoding: Encoding) -> Option<ValidateFn> {
        match encoding {
            Encoding::Latin1 => None,
            Encoding::Utf8 => Some(self.validate_utf8),
            Encoding::Utf16Le => Some(self.validate_utf16le),
            Encoding::Utf16Be => Some(self.validate_utf16be),
        }
    }
}

// ---------------------------------------------------------------------------
// Generic drivers
// ---------------------------------------------------------------------------

#[inline(always)]
pub(crate) unsafe fn latin1_to_utf8<L: Lanes>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    let n = src.len();
    assert!(dst.len() >= crate::max_utf8_len_from_latin1(n));

    let s = src.as_ptr();
    let mut i = 0usize;
    let mut o = 0usize;

    while i + L::BYTES <= n {
        // SAFETY: `i + BYTES <= n` bounds the load. Every vector of `BYTES`
        // input bytes writes at most `2 * BYTES` bytes (two compaction stores
        // per half), which the worst case `2 * n` covers from `o <= 2 * i`.
        let d = dst.as_mut_ptr();
        let v = L::load(s.add(i));
        if L::is_ascii(v) {
            L::store(d.add(o), v);
            o += L::BYTES;
        } else {
            let (lo, hi) = L::widen::<LittleEndian>(v);
            let first = encoder::write_words_11bits_to_utf8::<L>(lo, d.add(o));
            o += first.written;
            let second = encoder::write_words_11bits_to_utf8::<L>(hi, d.add(o));
            o += second.written;
        }
        i += L::BYTES;
    }

    let (read, written) = scalar::latin1_to_utf8_run(src, dst, i, o, n)?;
    Ok(Conversion { read, written })
}

#[inline(always)]
pub(crate) unsafe fn latin1_to_utf16<L: Lanes, E: Endianness>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    let n = src.len();
    assert!(dst.len() >= crate::max_utf16_len_from_latin1(n));

    let s = src.as_ptr();
    let mut i = 0usize;

    while i + L::BYTES <= n {
        // SAFETY: output offset is exactly `2 * i`; two stores of `BYTES`
        // end at `2 * (i + BYTES) <= 2 * n`.
        let d = dst.as_mut_ptr().add(2 * i);
        let (lo, hi) = L::widen::<E>(L::load(s.add(i)));
        L::store_words(d, lo);
        L::store_words(d.add(L::BYTES), hi);
        i += L::BYTES;
    }

    let (read, written) = scalar::latin1_to_utf16_run::<E>(src, dst, i, 2 * i, n)?;
    Ok(Conversion { read, written })
}

#[inline(always)]
pub(crate) unsafe fn utf8_to_latin1<L: Lanes>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    let n = src.len();
    assert!(dst.len() >= crate::max_latin1_len_from_utf8(n));

    let s = src.as_ptr();
    let mut i = 0usize;
    let mut o = 0usize;

    while i + L::BYTES <= n {
        // SAFETY: output never outruns input here (`o <= i`).
        let v = L::load(s.add(i));
        if L::is_ascii(v) {
            L::store(dst.as_mut_ptr().add(o), v);
            i += L::BYTES;
            o += L::BYTES;
        } else {
            (i, o) = scalar::utf8_to_latin1_run(src, dst, i, o, i + L::BYTES)?;
        }
    }

    let (read, written) = scalar::utf8_to_latin1_run(src, dst, i, o, n)?;
    Ok(Conversion { read, written })
}

#[inline(always)]
pub(crate) unsafe fn utf8_to_utf16<L: Lanes, E: Endianness>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    let n = src.len();
    assert!(dst.len() >= crate::max_utf16_len_from_utf8(n));

    let s = src.as_ptr();
    let mut i = 0usize;
    let mut o = 0usize;

    while i + L::BYTES <= n {
        // SAFETY: `o <= 2 * i`, and an ASCII vector writes exactly
        // `2 * BYTES` bytes, ending at most at `2 * n`.
        let v = L::load(s.add(i));
        if L::is_ascii(v) {
            let d = dst.as_mut_ptr().add(o);
            let (lo, hi) = L::widen::<E>(v);
            L::store_words(d, lo);
            L::store_words(d.add(L::BYTES), hi);
            i += L::BYTES;
            o += 2 * L::BYTES;
        } else {
            (i, o) = scalar::utf8_to_utf16_run::<E>(src, dst, i, o, i + L::BYTES)?;
        }
    }

    let (read, written) = scalar::utf8_to_utf16_run::<E>(src, dst, i, o, n)?;
    Ok(Conversion { read, written })
}

#[inline(always)]
pub(crate) unsafe fn utf16_to_utf8<L: Lanes, E: Endianness>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    let units = src.len() / 2;
    assert!(dst.len() >= crate::max_utf8_len_from_utf16(units));

    let s = src.as_ptr();
    let mut i = 0usize;
    let mut o = 0usize;

    while i + L::WORDS <= units {
        // SAFETY: the load covers units `i..i + WORDS`. `o <= 3 * i` and a
        // vector writes at most `2 * WORDS` bytes, within `3 * units`.
        let w = L::load_words::<E>(s.add(2 * i));
        if L::words_all_below(w, 0xF800) {
            let step = encoder::write_words_11bits_to_utf8::<L>(w, dst.as_mut_ptr().add(o));
            i += step.read;
            o += step.written;
        } else {
            (i, o) = scalar::utf16_to_utf8_run::<E>(src, dst, i, o, i + L::WORDS)?;
        }
    }

    let (read, written) = scalar::utf16_to_utf8_run::<E>(src, dst, i, o, units)?;
    scalar::utf16_finish::<E>(src, written)?;
    Ok(Conversion { read, written })
}

#[inline(always)]
pub(crate) unsafe fn utf16_to_latin1<L: Lanes, E: Endianness>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    let units = src.len() / 2;
    assert!(dst.len() >= crate::max_latin1_len_from_utf16(units));

    let s = src.as_ptr();
    let mut i = 0usize;
    let mut o = 0usize;

    while i + L::WORDS <= units {
        // SAFETY: one output byte per unit; `narrow_store` writes `WORDS`
        // bytes ending at `i + WORDS <= units`.
        let w = L::load_words::<E>(s.add(2 * i));
        if L::words_all_below(w, 0xFF00) {
            L::narrow_store(dst.as_mut_ptr().add(o), w);
            i += L::WORDS;
            o += L::WORDS;
        } else {
            // Reports the first unit above U+00FF.
            (i, o) = scalar::utf16_to_latin1_run::<E>(src, dst, i, o, i + L::WORDS)?;
        }
    }

    let (read, written) = scalar::utf16_to_latin1_run::<E>(src, dst, i, o, units)?;
    scalar::utf16_finish::<E>(src, written)?;
    Ok(Conversion { read, written })
}

#[inline(always)]
pub(crate) unsafe fn validate_utf8<L: Lanes>(src: &[u8]) -> Result<()> {
    let n = src.len();
    let s = src.as_ptr();
    let mut i = 0usize;

    while i + L::BYTES <= n {
        // SAFETY: `i + BYTES <= n`.
        if L::is_ascii(L::load(s.add(i))) {
            i += L::BYTES;
        } else {
            i = scalar::validate_utf8_run(src, i, i + L::BYTES)?;
        }
    }

    scalar::validate_utf8_run(src, i, n).map(|_| ())
}

#[inline(always)]
pub(crate) unsafe fn validate_utf16<L: Lanes, E: Endianness>(src: &[u8]) -> Result<()> {
    let units = src.len() / 2;
    let s = src.as_ptr();
    let mut i = 0usize;

    let surrogate_bits = L::splat(0xF800);
    let surrogate_tag = L::splat(0xD800);

    while i + L::WORDS <= units {
        // SAFETY: the load covers units `i..i + WORDS`.
        let w = L::load_words::<E>(s.add(2 * i));
        let surrogates = L::eq(L::and(w, surrogate_bits), surrogate_tag);
        if L::movemask(surrogates) == 0 {
            i += L::WORDS;
        } else {
            i = scalar::validate_utf16_run::<E>(src, i, i + L::WORDS)?;
        }
    }

    scalar::validate_utf16_run::<E>(src, i, units)?;
    scalar::utf16_finish::<E>(src, 0)
}

// ---------------------------------------------------------------------------
// Per-architecture instantiation
//
// Each module below provides the same set of `unsafe fn`s with the backend's
// target features enabled, so the generic drivers above are inlined and
// compiled with the right instruction set, and a `KERNELS` table pointing at
// them.
// ---------------------------------------------------------------------------

macro_rules! impl_arch_kernels {
    ($lanes:ty, $(#[$m:meta])*) => {
        use byteorder::{BigEndian, LittleEndian};

        use crate::Conversion;
        use crate::error::Result;

        $(#[$m])*
        pub(crate) unsafe fn latin1_to_utf8(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::latin1_to_utf8::<$lanes>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn latin1_to_utf16le(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::latin1_to_utf16::<$lanes, LittleEndian>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn latin1_to_utf16be(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::latin1_to_utf16::<$lanes, BigEndian>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn utf8_to_latin1(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::utf8_to_latin1::<$lanes>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn utf8_to_utf16le(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::utf8_to_utf16::<$lanes, LittleEndian>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn utf8_to_utf16be(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::utf8_to_utf16::<$lanes, BigEndian>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn utf16le_to_utf8(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::utf16_to_utf8::<$lanes, LittleEndian>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn utf16be_to_utf8(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::utf16_to_utf8::<$lanes, BigEndian>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn utf16le_to_latin1(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::utf16_to_latin1::<$lanes, LittleEndian>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn utf16be_to_latin1(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
            super::utf16_to_latin1::<$lanes, BigEndian>(src, dst)
        }

        $(#[$m])*
        pub(crate) unsafe fn validate_utf8(src: &[u8]) -> Result<()> {
            super::validate_utf8::<$lanes>(src)
        }

        $(#[$m])*
        pub(crate) unsafe fn validate_utf16le(src: &[u8]) -> Result<()> {
            super::validate_utf16::<$lanes, LittleEndian>(src)
        }

        $(#[$m])*
        pub(crate) unsafe fn validate_utf16be(src: &[u8]) -> Result<()> {
            super::validate_utf16::<$lanes, BigEndian>(src)
        }

        pub(crate) const KERNELS: super::Kernels = super::Kernels {
            latin1_to_utf8,
            latin1_to_utf16le,
            latin1_to_utf16be,
            utf8_to_latin1,
            utf8_to_utf16le,
            utf8_to_utf16be,
            utf16le_to_utf8,
            utf16be_to_utf8,
            utf16le_to_latin1,
            utf16be_to_latin1,
            validate_utf8,
            validate_utf16le,
            validate_utf16be,
        };
    };
}

pub(crate) mod portable {
    impl_arch_kernels!(crate::lanes::portable::Portable, #[inline]);
}

#[cfg(target_arch = "x86_64")]
pub(crate) mod westmere {
    impl_arch_kernels!(
        crate::lanes::westmere::Westmere,
        #[inline]
        #[target_feature(enable = "ssse3,sse4.1")]
    );
}

#[cfg(target_arch = "x86_64")]
pub(crate) mod haswell {
    impl_arch_kernels!(
        crate::lanes::haswell::Haswell,
        #[inline]
        #[target_feature(enable = "avx2")]
    );
}

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon {
    impl_arch_kernels!(
        crate::lanes::neon::Neon,
        #[inline]
        #[target_feature(enable = "neon")]
    );
}

/// The scalar routines, as a kernel table.
pub(crate) const FALLBACK: Kernels = Kernels {
    latin1_to_utf8: scalar::latin1_to_utf8_scalar,
    latin1_to_utf16le: scalar::latin1_to_utf16_scalar::<LittleEndian>,
    latin1_to_utf16be: scalar::latin1_to_utf16_scalar::<BigEndian>,
    utf8_to_latin1: scalar::utf8_to_latin1_scalar,
    utf8_to_utf16le: scalar::utf8_to_utf16_scalar::<LittleEndian>,
    utf8_to_utf16be: scalar::utf8_to_utf16_scalar::<BigEndian>,
    utf16le_to_utf8: scalar::utf16_to_utf8_scalar::<LittleEndian>,
    utf16be_to_utf8: scalar::utf16_to_utf8_scalar::<BigEndian>,
    utf16le_to_latin1: scalar::utf16_to_latin1_scalar::<LittleEndian>,
    utf16be_to_latin1: scalar::utf16_to_latin1_scalar::<BigEndian>,
    validate_utf8: scalar::validate_utf8_scalar,
    validate_utf16le: scalar::validate_utf16_scalar::<LittleEndian>,
    validate_utf16be: scalar::validate_utf16_scalar::<BigEndian>,
};
