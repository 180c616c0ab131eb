//! Scalar transcoding routines.
//!
//! These are the correctness reference for every pair: the vector kernels hand
//! them the tail of the input and any vector that falls out of a fast path, and
//! the `Fallback` capability runs nothing else. Unlike the vector code they are
//! fully bounds-checked and never touch a byte of `dst` they are not about to
//! keep.
//!
//! The `*_run` functions resume from a cursor `(i, o)` over the *whole* source
//! and destination and stop once `i >= stop`. A multi-unit sequence that starts
//! before `stop` is consumed whole, so the cursor may land a little past it.
//! Errors carry absolute offsets for that reason.

use crate::Conversion;
use crate::encoding::{Encoding, EncodingPair, Endianness};
use crate::error::{InvalidKind, Result, TranscodeError};

/// `(source units read, output bytes written)`.
pub(crate) type Cursor = (usize, usize);

#[inline(always)]
fn put(dst: &mut [u8], o: usize, bytes: &[u8]) -> Option<usize> {
    let end = o.checked_add(bytes.len())?;
    dst.get_mut(o..end)?.copy_from_slice(bytes);
    Some(end)
}

#[inline(always)]
fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

#[inline(always)]
fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

#[inline(always)]
fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

#[inline(always)]
fn decode_surrogate_pair(hi: u16, lo: u16) -> u32 {
    let hi = (hi as u32) - 0xD800;
    let lo = (lo as u32) - 0xDC00;
    0x10000 + ((hi << 10) | lo)
}

#[inline(always)]
fn read_unit<E: Endianness>(src: &[u8], idx: usize) -> u16 {
    E::read_u16(&src[idx * 2..idx * 2 + 2])
}

/// UTF-8 form of a scalar value, left-aligned.
#[inline(always)]
fn utf8_bytes(cp: u32) -> ([u8; 4], usize) {
    match cp {
        0..=0x7F => ([cp as u8, 0, 0, 0], 1),
        0x80..=0x7FF => ([0xC0 | (cp >> 6) as u8, 0x80 | (cp as u8 & 0x3F), 0, 0], 2),
        0x800..=0xFFFF => (
            [
                0xE0 | (cp >> 12) as u8,
                0x80 | ((cp >> 6) as u8 & 0x3F),
                0x80 | (cp as u8 & 0x3F),
                0,
            ],
            3,
        ),
        _ => (
            [
                0xF0 | (cp >> 18) as u8,
                0x80 | ((cp >> 12) as u8 & 0x3F),
                0x80 | ((cp >> 6) as u8 & 0x3F),
                0x80 | (cp as u8 & 0x3F),
            ],
            4,
        ),
    }
}

/// UTF-16 form of a scalar value in byte order `E`.
#[inline(always)]
fn utf16_bytes<E: Endianness>(cp: u32) -> ([u8; 4], usize) {
    let mut out = [0u8; 4];
    if cp < 0x10000 {
        E::write_u16(&mut out[..2], cp as u16);
        (out, 2)
    } else {
        let v = cp - 0x10000;
        E::write_u16(&mut out[..2], 0xD800 | (v >> 10) as u16);
        E::write_u16(&mut out[2..], 0xDC00 | (v & 0x3FF) as u16);
        (out, 4)
    }
}

/// Decode the UTF-8 sequence starting at `src[i]`.
///
/// Returns the scalar value and the sequence length, or why the sequence is
/// ill-formed. The error always belongs to offset `i`, which matches
/// `std::str::Utf8Error::valid_up_to`.
#[inline]
pub(crate) fn decode_utf8(src: &[u8], i: usize) -> core::result::Result<(u32, usize), InvalidKind> {
    let b0 = src[i];
    if b0 < 0x80 {
        return Ok((b0 as u32, 1));
    }

    let cont = |k: usize| -> core::result::Result<u32, InvalidKind> {
        match src.get(i + k) {
            Some(&b) if is_continuation(b) => Ok((b & 0x3F) as u32),
            _ => Err(InvalidKind::TooShort),
        }
    };

    match b0 {
        0x80..=0xBF => Err(InvalidKind::TooLong),
        0xC0 | 0xC1 => Err(InvalidKind::Overlong),
        0xC2..=0xDF => Ok((((b0 & 0x1F) as u32) << 6 | cont(1)?, 2)),
        0xE0..=0xEF => {
            let c1 = cont(1)?;
            match (b0, c1) {
                (0xE0, 0x00..=0x1F) => return Err(InvalidKind::Overlong),
                (0xED, 0x20..=0x3F) => return Err(InvalidKind::Surrogate),
                _ => {}
            }
            let c2 = cont(2)?;
            Ok((((b0 & 0x0F) as u32) << 12 | c1 << 6 | c2, 3))
        }
        0xF0..=0xF4 => {
            let c1 = cont(1)?;
            match (b0, c1) {
                (0xF0, 0x00..=0x0F) => return Err(InvalidKind::Overlong),
                (0xF4, 0x10..=0x3F) => return Err(InvalidKind::TooLarge),
                _ => {}
            }
            let c2 = cont(2)?;
            let c3 = cont(3)?;
            Ok((((b0 & 0x07) as u32) << 18 | c1 << 12 | c2 << 6 | c3, 4))
        }
        0xF5..=0xF7 => Err(InvalidKind::TooLarge),
        _ => Err(InvalidKind::HeaderBits),
    }
}

/// Decode the UTF-16 unit (or surrogate pair) at unit index `i` of `units`.
#[inline]
pub(crate) fn decode_utf16<E: Endianness>(
    src: &[u8],
    i: usize,
    units: usize,
) -> core::result::Result<(u32, usize), InvalidKind> {
    let unit = read_unit::<E>(src, i);
    if !(0xD800..=0xDFFF).contains(&unit) {
        return Ok((unit as u32, 1));
    }
    if !is_high_surrogate(unit) || i + 1 >= units {
        return Err(InvalidKind::Surrogate);
    }
    let next = read_unit::<E>(src, i + 1);
    if !is_low_surrogate(next) {
        return Err(InvalidKind::Surrogate);
    }
    Ok((decode_surrogate_pair(unit, next), 2))
}

// ---------------------------------------------------------------------------
// Resumable runs
// ---------------------------------------------------------------------------

pub(crate) fn latin1_to_utf8_run(src: &[u8], dst: &mut [u8], i: usize, mut o: usize, stop: usize) -> Result<Cursor> {
    let available = dst.len();
    let overflow = || TranscodeError::OutputTooSmall {
        needed: utf8_len_from_latin1(src),
        available,
    };

    for &b in &src[i..stop] {
        o = if b < 0x80 {
            put(dst, o, &[b])
        } else {
            put(dst, o, &[0xC0 | (b >> 6), 0x80 | (b & 0x3F)])
        }
        .ok_or_else(overflow)?;
    }
    Ok((stop, o))
}

pub(crate) fn latin1_to_utf16_run<E: Endianness>(
    src: &[u8],
    dst: &mut [u8],
    i: usize,
    mut o: usize,
    stop: usize,
) -> Result<Cursor> {
    let available = dst.len();
    let overflow = || TranscodeError::OutputTooSmall {
        needed: src.len() * 2,
        available,
    };

    let mut unit = [0u8; 2];
    for &b in &src[i..stop] {
        E::write_u16(&mut unit, b as u16);
        o = put(dst, o, &unit).ok_or_else(overflow)?;
    }
    Ok((stop, o))
}

pub(crate) fn utf8_to_latin1_run(src: &[u8], dst: &mut [u8], mut i: usize, mut o: usize, stop: usize) -> Result<Cursor> {
    let available = dst.len();
    let overflow = || TranscodeError::OutputTooSmall {
        needed: latin1_len_from_utf8(src),
        available,
    };

    while i < stop {
        let (cp, len) = decode_utf8(src, i).map_err(|kind| TranscodeError::invalid(Encoding::Utf8, kind, i, o))?;
        if cp > 0xFF {
            return Err(TranscodeError::invalid(Encoding::Utf8, InvalidKind::NotLatin1, i, o));
        }
        o = put(dst, o, &[cp as u8]).ok_or_else(overflow)?;
        i += len;
    }
    Ok((i, o))
}

pub(crate) fn utf8_to_utf16_run<E: Endianness>(
    src: &[u8],
    dst: &mut [u8],
    mut i: usize,
    mut o: usize,
    stop: usize,
) -> Result<Cursor> {
    let available = dst.len();
    let overflow = || TranscodeError::OutputTooSmall {
        needed: utf16_len_from_utf8(src),
        available,
    };

    while i < stop {
        let (cp, len) = decode_utf8(src, i).map_err(|kind| TranscodeError::invalid(Encoding::Utf8, kind, i, o))?;
        let (bytes, n) = utf16_bytes::<E>(cp);
        o = put(dst, o, &bytes[..n]).ok_or_else(overflow)?;
        i += len;
    }
    Ok((i, o))
}

pub(crate) fn utf16_to_utf8_run<E: Endianness>(
    src: &[u8],
    dst: &mut [u8],
    mut i: usize,
    mut o: usize,
    stop: usize,
) -> Result<Cursor> {
    let units = src.len() / 2;
    let available = dst.len();
    let overflow = || TranscodeError::OutputTooSmall {
        needed: utf8_len_from_utf16::<E>(src),
        available,
    };

    while i < stop {
        let (cp, len) = decode_utf16::<E>(src, i, units).map_err(|kind| TranscodeError::invalid(E::UTF16, kind, i, o))?;
        let (bytes, n) = utf8_bytes(cp);
        o = put(dst, o, &bytes[..n]).ok_or_else(overflow)?;
        i += len;
    }
    Ok((i, o))
}

pub(crate) fn utf16_to_latin1_run<E: Endianness>(
    src: &[u8],
    dst: &mut [u8],
    mut i: usize,
    mut o: usize,
    stop: usize,
) -> Result<Cursor> {
    let available = dst.len();
    let overflow = || TranscodeError::OutputTooSmall {
        needed: src.len() / 2,
        available,
    };

    while i < stop {
        let unit = read_unit::<E>(src, i);
        if unit > 0xFF {
            return Err(TranscodeError::invalid(E::UTF16, InvalidKind::NotLatin1, i, o));
        }
        o = put(dst, o, &[unit as u8]).ok_or_else(overflow)?;
        i += 1;
    }
    Ok((i, o))
}

pub(crate) fn validate_utf8_run(src: &[u8], mut i: usize, stop: usize) -> Result<usize> {
    while i < stop {
        let (_, len) = decode_utf8(src, i).map_err(|kind| TranscodeError::invalid(Encoding::Utf8, kind, i, 0))?;
        i += len;
    }
    Ok(i)
}

pub(crate) fn validate_utf16_run<E: Endianness>(src: &[u8], mut i: usize, stop: usize) -> Result<usize> {
    let units = src.len() / 2;
    while i < stop {
        let (_, len) = decode_utf16::<E>(src, i, units).map_err(|kind| TranscodeError::invalid(E::UTF16, kind, i, 0))?;
        i += len;
    }
    Ok(i)
}

/// Reject a dangling odd byte after all whole units were converted.
#[inline]
pub(crate) fn utf16_finish<E: Endianness>(src: &[u8], written: usize) -> Result<()> {
    if src.len() % 2 == 1 {
        return Err(TranscodeError::invalid(
            E::UTF16,
            InvalidKind::TruncatedUnit,
            src.len() / 2,
            written,
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Length queries
// ---------------------------------------------------------------------------

/// Exact UTF-8 length of Latin1 input.
pub fn utf8_len_from_latin1(src: &[u8]) -> usize {
    src.len() + src.iter().filter(|&&b| b >= 0x80).count()
}

/// Latin1 length of well-formed UTF-8 input (one byte per scalar value).
pub fn latin1_len_from_utf8(src: &[u8]) -> usize {
    src.iter().filter(|&&b| !is_continuation(b)).count()
}

/// UTF-16 length in bytes of well-formed UTF-8 input.
pub fn utf16_len_from_utf8(src: &[u8]) -> usize {
    src.iter()
        .map(|&b| match b {
            0x80..=0xBF => 0,
            0xF0..=0xFF => 4,
            _ => 2,
        })
        .sum()
}

/// UTF-8 length of well-formed UTF-16 input in byte order `E`.
pub fn utf8_len_from_utf16<E: Endianness>(src: &[u8]) -> usize {
    let units = src.len() / 2;
    let mut len = 0;
    let mut i = 0;
    while i < units {
        let unit = read_unit::<E>(src, i);
        len += match unit {
            0..=0x7F => 1,
            0x80..=0x7FF => 2,
            0xD800..=0xDBFF if i + 1 < units && is_low_surrogate(read_unit::<E>(src, i + 1)) => {
                i += 1;
                4
            }
            _ => 3,
        };
        i += 1;
    }
    len
}

/// Output bytes needed to convert well-formed `src` for `pair`.
pub(crate) fn required_len(pair: EncodingPair, src: &[u8]) -> usize {
    use byteorder::{BigEndian, LittleEndian};

    match (pair.from, pair.to) {
        (Encoding::Latin1, Encoding::Utf8) => utf8_len_from_latin1(src),
        (Encoding::Latin1, _) => src.len() * 2,
        (Encoding::Utf8, Encoding::Latin1) => latin1_len_from_utf8(src),
        (Encoding::Utf8, _) => utf16_len_from_utf8(src),
        (Encoding::Utf16Le, Encoding::Utf8) => utf8_len_from_utf16::<LittleEndian>(src),
        (Encoding::Utf16Be, Encoding::Utf8) => utf8_len_from_utf16::<BigEndian>(src),
        (_, _) => src.len() / 2,
    }
}

/// Fail with `OutputTooSmall` unless `available` bytes are enough.
///
/// The worst case is checked first so that well-sized buffers never pay for a
/// counting pass.
#[inline]
pub(crate) fn ensure_capacity(pair: EncodingPair, src: &[u8], available: usize) -> Result<()> {
    if available >= pair.max_output_len(src.len()) {
        return Ok(());
    }
    let needed = required_len(pair, src);
    if available < needed {
        return Err(TranscodeError::OutputTooSmall { needed, available });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Whole-buffer conversions
// ---------------------------------------------------------------------------

const LATIN1_TO_UTF8: EncodingPair = EncodingPair::new(Encoding::Latin1, Encoding::Utf8);
const UTF8_TO_LATIN1: EncodingPair = EncodingPair::new(Encoding::Utf8, Encoding::Latin1);

/// Scalar Latin1 to UTF-8 conversion.
pub fn latin1_to_utf8_scalar(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    ensure_capacity(LATIN1_TO_UTF8, src, dst.len())?;
    let (read, written) = latin1_to_utf8_run(src, dst, 0, 0, src.len())?;
    Ok(Conversion { read, written })
}

pub fn latin1_to_utf16_scalar<E: Endianness>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    ensure_capacity(EncodingPair::new(Encoding::Latin1, E::UTF16), src, dst.len())?;
    let (read, written) = latin1_to_utf16_run::<E>(src, dst, 0, 0, src.len())?;
    Ok(Conversion { read, written })
}

pub fn utf8_to_latin1_scalar(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    ensure_capacity(UTF8_TO_LATIN1, src, dst.len())?;
    let (read, written) = utf8_to_latin1_run(src, dst, 0, 0, src.len())?;
    Ok(Conversion { read, written })
}

pub fn utf8_to_utf16_scalar<E: Endianness>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    ensure_capacity(EncodingPair::new(Encoding::Utf8, E::UTF16), src, dst.len())?;
    let (read, written) = utf8_to_utf16_run::<E>(src, dst, 0, 0, src.len())?;
    Ok(Conversion { read, written })
}

/// Scalar UTF-16 to UTF-8 conversion. `read` counts UTF-16 units.
pub fn utf16_to_utf8_scalar<E: Endianness>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    ensure_capacity(EncodingPair::new(E::UTF16, Encoding::Utf8), src, dst.len())?;
    let (read, written) = utf16_to_utf8_run::<E>(src, dst, 0, 0, src.len() / 2)?;
    utf16_finish::<E>(src, written)?;
    Ok(Conversion { read, written })
}

pub fn utf16_to_latin1_scalar<E: Endianness>(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    ensure_capacity(EncodingPair::new(E::UTF16, Encoding::Latin1), src, dst.len())?;
    let (read, written) = utf16_to_latin1_run::<E>(src, dst, 0, 0, src.len() / 2)?;
    utf16_finish::<E>(src, written)?;
    Ok(Conversion { read, written })
}

pub fn validate_utf8_scalar(src: &[u8]) -> Result<()> {
    validate_utf8_run(src, 0, src.len()).map(|_| ())
}

pub fn validate_utf16_scalar<E: Endianness>(src: &[u8]) -> Result<()> {
    validate_utf16_run::<E>(src, 0, src.len() / 2)?;
    utf16_finish::<E>(src, 0)
}

#[cfg(test)]
mod tests {
    use byteorder::{BigEndian, LittleEndian};
    use pretty_assertions::assert_eq;

    use super::*;

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn test_utf8_bytes_matches_char_encoding() {
        for cp in [0x24u32, 0xA2, 0x939, 0x20AC, 0xD55C, 0x10348, 0x10FFFF] {
            let (bytes, n) = utf8_bytes(cp);
            let c = char::from_u32(cp).unwrap();
            let mut buf = [0u8; 4];
            assert_eq!(&bytes[..n], c.encode_utf8(&mut buf).as_bytes());
        }
    }

    #[test]
    fn test_decode_utf8_kinds() {
        let cases: &[(&[u8], InvalidKind)] = &[
            (b"\x80", InvalidKind::TooLong),
            (b"\xC0\xAF", InvalidKind::Overlong),
            (b"\xE0\x80\xAF", InvalidKind::Overlong),
            (b"\xF0\x80\x80\xAF", InvalidKind::Overlong),
            (b"\xED\xA0\x80", InvalidKind::Surrogate),
            (b"\xF4\x90\x80\x80", InvalidKind::TooLarge),
            (b"\xF5\x80\x80\x80", InvalidKind::TooLarge),
            (b"\xF8\x88\x80\x80\x80", InvalidKind::HeaderBits),
            (b"\xE2\x82", InvalidKind::TooShort),
            (b"\xC3A", InvalidKind::TooShort),
        ];
        for (input, kind) in cases {
            assert_eq!(decode_utf8(input, 0), Err(*kind), "{input:02X?}");
        }
        assert_eq!(decode_utf8("€".as_bytes(), 0), Ok((0x20AC, 3)));
        assert_eq!(decode_utf8("𝄞".as_bytes(), 0), Ok((0x1D11E, 4)));
    }

    #[test]
    fn test_latin1_to_utf8_scalar() {
        let mut dst = [0u8; 8];
        let res = latin1_to_utf8_scalar(b"caf\xE9", &mut dst).unwrap();
        assert_eq!(res, Conversion { read: 4, written: 5 });
        assert_eq!(&dst[..5], "café".as_bytes());
    }

    #[test]
    fn test_output_too_small_is_reported_before_writing() {
        let mut dst = [0xAAu8; 4];
        let err = latin1_to_utf8_scalar(b"\xE9\xE9\xE9", &mut dst).unwrap_err();
        assert_eq!(
            err,
            TranscodeError::OutputTooSmall {
                needed: 6,
                available: 4
            }
        );
        assert_eq!(dst, [0xAA; 4]);

        // Exactly enough room for the real output, short of the worst case.
        let mut dst = [0u8; 4];
        let res = latin1_to_utf8_scalar(b"ab\xE9", &mut dst).unwrap();
        assert_eq!(res.written, 4);
    }

    #[test]
    fn test_utf8_to_latin1_rejects_wide_code_points() {
        let mut dst = [0u8; 16];
        let err = utf8_to_latin1_scalar("ab€".as_bytes(), &mut dst).unwrap_err();
        assert_eq!(err.kind(), Some(InvalidKind::NotLatin1));
        assert_eq!(err.offset(), Some(2));
        assert_eq!(err.written(), Some(2));
    }

    #[test]
    fn test_utf8_to_utf16_surrogate_pairs() {
        let s = "a𝄞b";
        let mut dst = [0u8; 16];
        let res = utf8_to_utf16_scalar::<LittleEndian>(s.as_bytes(), &mut dst).unwrap();
        assert_eq!(&dst[..res.written], utf16le(s).as_slice());

        let res = utf8_to_utf16_scalar::<BigEndian>(s.as_bytes(), &mut dst).unwrap();
        let be: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        assert_eq!(&dst[..res.written], be.as_slice());
    }

    #[test]
    fn test_utf16_to_utf8_reports_lone_surrogate() {
        let mut src = utf16le("ab");
        src.extend_from_slice(&0xDC00u16.to_le_bytes());
        src.extend_from_slice(&utf16le("c"));

        let mut dst = [0u8; 16];
        let err = utf16_to_utf8_scalar::<LittleEndian>(&src, &mut dst).unwrap_err();
        assert_eq!(err.kind(), Some(InvalidKind::Surrogate));
        assert_eq!(err.offset(), Some(2));
        assert_eq!(err.written(), Some(2));
        assert_eq!(&dst[..2], b"ab");
    }

    #[test]
    fn test_utf16_odd_length_is_truncated_unit() {
        let mut src = utf16le("hé");
        src.push(0x41);
        let mut dst = [0u8; 16];
        let err = utf16_to_utf8_scalar::<LittleEndian>(&src, &mut dst).unwrap_err();
        assert_eq!(
            err,
            TranscodeError::invalid(Encoding::Utf16Le, InvalidKind::TruncatedUnit, 2, 3)
        );
        assert_eq!(&dst[..3], "hé".as_bytes());
    }

    #[test]
    fn test_length_queries() {
        let s = "aé€𝄞";
        assert_eq!(latin1_len_from_utf8(s.as_bytes()), 4);
        assert_eq!(utf16_len_from_utf8(s.as_bytes()), s.encode_utf16().count() * 2);
        assert_eq!(utf8_len_from_utf16::<LittleEndian>(&utf16le(s)), s.len());
        assert_eq!(utf8_len_from_latin1(b"a\xE9\xFF"), 5);
    }

    #[test]
    fn test_validate_scalar() {
        assert!(validate_utf8_scalar("plain ascii and ünïcödé".as_bytes()).is_ok());
        let err = validate_utf8_scalar(b"abc\xFF").unwrap_err();
        assert_eq!(err.offset(), Some(3));
        assert_eq!(err.kind(), Some(InvalidKind::HeaderBits));

        assert!(validate_utf16_scalar::<LittleEndian>(&utf16le("𝄞x")).is_ok());
        let lone_high = 0xD834u16.to_be_bytes();
        let err = validate_utf16_scalar::<BigEndian>(&lone_high).unwrap_err();
        assert_eq!(err.offset(), Some(0));
    }
}
