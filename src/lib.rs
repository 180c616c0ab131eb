#![doc = include_str!("../README.md")]

mod capability;
mod dispatch;
mod encoder;
mod encoding;
mod error;
mod kernels;
mod lanes;
mod scalar;
mod scratch;

pub mod procedures;

#[cfg(feature = "harness")]
pub mod harness;
#[cfg(feature = "harness")]
pub mod random_utf8;

#[cfg(feature = "perf-counters")]
pub mod perf;

pub use byteorder::{BigEndian, LittleEndian};

pub use capability::{Capability, CpuFeatures, FORCE_ENV_VAR, UnknownCapability};
pub use dispatch::{Transcoder, active};
pub use encoding::{Encoding, EncodingPair, Endianness};
pub use error::{InvalidKind, Result, TranscodeError};
pub use scalar::{
    latin1_len_from_utf8, latin1_to_utf8_scalar, latin1_to_utf16_scalar, utf8_len_from_latin1,
    utf8_len_from_utf16, utf8_to_latin1_scalar, utf8_to_utf16_scalar, utf16_len_from_utf8,
    utf16_to_latin1_scalar, utf16_to_utf8_scalar, validate_utf8_scalar, validate_utf16_scalar,
};
pub use scratch::{Scratch, latin1_to_utf8_in};

/// Outcome of a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conversion {
    /// Source code units consumed (bytes for Latin1/UTF-8, units for UTF-16).
    pub read: usize,
    /// Output bytes written.
    pub written: usize,
}

/// Worst-case UTF-8 output for `n` Latin1 bytes.
#[inline]
pub const fn max_utf8_len_from_latin1(n: usize) -> usize {
    n.saturating_mul(2)
}

/// Worst-case UTF-16 output (bytes) for `n` Latin1 bytes.
#[inline]
pub const fn max_utf16_len_from_latin1(n: usize) -> usize {
    n.saturating_mul(2)
}

#[inline]
pub const fn max_latin1_len_from_utf8(n: usize) -> usize {
    n
}

/// Worst-case UTF-16 output (bytes) for `n` UTF-8 bytes.
#[inline]
pub const fn max_utf16_len_from_utf8(n: usize) -> usize {
    n.saturating_mul(2)
}

/// Worst-case UTF-8 output for `units` UTF-16 code units.
#[inline]
pub const fn max_utf8_len_from_utf16(units: usize) -> usize {
    units.saturating_mul(3)
}

#[inline]
pub const fn max_latin1_len_from_utf16(units: usize) -> usize {
    units
}

/// UTF-8 length of well-formed UTF-16LE input.
#[inline]
pub fn utf8_len_from_utf16le(src: &[u8]) -> usize {
    utf8_len_from_utf16::<LittleEndian>(src)
}

/// UTF-8 length of well-formed UTF-16BE input.
#[inline]
pub fn utf8_len_from_utf16be(src: &[u8]) -> usize {
    utf8_len_from_utf16::<BigEndian>(src)
}

/// Convert Latin1 to UTF-8 into `dst`, using the fastest kernels available.
///
/// Size `dst` with [`max_utf8_len_from_latin1`] to always take the vector
/// path; smaller buffers work as long as they fit the actual output.
///
/// ```
/// let mut dst = [0u8; 8];
/// let res = transcode_simd::latin1_to_utf8(b"caf\xE9", &mut dst).unwrap();
/// assert_eq!(&dst[..res.written], "café".as_bytes());
/// ```
#[inline]
pub fn latin1_to_utf8(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().latin1_to_utf8(src, dst)
}

#[inline]
pub fn latin1_to_utf16le(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().latin1_to_utf16le(src, dst)
}

#[inline]
pub fn latin1_to_utf16be(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().latin1_to_utf16be(src, dst)
}

/// Convert UTF-8 to Latin1. Code points above U+00FF are an error
/// ([`InvalidKind::NotLatin1`]).
#[inline]
pub fn utf8_to_latin1(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().utf8_to_latin1(src, dst)
}

#[inline]
pub fn utf8_to_utf16le(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().utf8_to_utf16le(src, dst)
}

#[inline]
pub fn utf8_to_utf16be(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().utf8_to_utf16be(src, dst)
}

/// Convert UTF-16LE bytes to UTF-8. `read` in the result counts code units.
#[inline]
pub fn utf16le_to_utf8(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().utf16le_to_utf8(src, dst)
}

#[inline]
pub fn utf16be_to_utf8(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().utf16be_to_utf8(src, dst)
}

#[inline]
pub fn utf16le_to_latin1(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().utf16le_to_latin1(src, dst)
}

#[inline]
pub fn utf16be_to_latin1(src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().utf16be_to_latin1(src, dst)
}

#[inline]
pub fn validate_utf8(src: &[u8]) -> Result<()> {
    active().validate_utf8(src)
}

#[inline]
pub fn validate_utf16le(src: &[u8]) -> Result<()> {
    active().validate_utf16le(src)
}

#[inline]
pub fn validate_utf16be(src: &[u8]) -> Result<()> {
    active().validate_utf16be(src)
}

/// Convert according to a runtime [`EncodingPair`].
#[inline]
pub fn convert(pair: EncodingPair, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
    active().convert(pair, src, dst)
}

/// Convert into `out`, reusing its allocation. On error `out` holds the output
/// for the valid prefix.
pub fn convert_into(pair: EncodingPair, src: &[u8], out: &mut Vec<u8>) -> Result<Conversion> {
    out.clear();
    out.resize(pair.max_output_len(src.len()), 0);
    match convert(pair, src, out) {
        Ok(res) => {
            out.truncate(res.written);
            Ok(res)
        }
        Err(err) => {
            out.truncate(err.written().unwrap_or(0));
            Err(err)
        }
    }
}

/// Latin1 to UTF-8 into `out`, reusing its allocation.
#[inline]
pub fn latin1_to_utf8_into(src: &[u8], out: &mut Vec<u8>) -> Result<Conversion> {
    convert_into(EncodingPair::new(Encoding::Latin1, Encoding::Utf8), src, out)
}

/// UTF-16LE to UTF-8 into `out`, reusing its allocation.
#[inline]
pub fn utf16le_to_utf8_into(src: &[u8], out: &mut Vec<u8>) -> Result<Conversion> {
    convert_into(EncodingPair::new(Encoding::Utf16Le, Encoding::Utf8), src, out)
}

/// UTF-8 to UTF-16LE into `out`, reusing its allocation.
#[inline]
pub fn utf8_to_utf16le_into(src: &[u8], out: &mut Vec<u8>) -> Result<Conversion> {
    convert_into(EncodingPair::new(Encoding::Utf8, Encoding::Utf16Le), src, out)
}

/// Latin1 to UTF-8 in a new `String`.
pub fn latin1_to_string(src: &[u8]) -> String {
    let mut out = vec![0u8; max_utf8_len_from_latin1(src.len())];
    // Latin1 input cannot be ill-formed and `out` holds the worst case.
    let written = latin1_to_utf8(src, &mut out).map_or(0, |res| res.written);
    out.truncate(written);
    String::from_utf8(out).unwrap_or_default()
}
