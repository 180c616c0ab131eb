use std::io;

use bumpalo::Bump;

use crate::dispatch::active;
use crate::encoding::{Encoding, EncodingPair};
use crate::error::Result;
use crate::max_utf8_len_from_latin1;

/// Reusable output buffer.
///
/// Every call sizes the buffer for the worst case (so the vector kernels
/// always run) and returns a borrow of just the converted prefix. The buffer
/// only ever grows.
#[derive(Debug, Default)]
pub struct Scratch {
    buf: Vec<u8>,
}

impl Scratch {
    #[inline]
    pub fn new() -> Self {
        Scratch { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Scratch {
            buf: vec![0; capacity],
        }
    }

    /// Current buffer size in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Convert `src` for `pair` and return the output bytes.
    pub fn convert<'a>(&'a mut self, pair: EncodingPair, src: &[u8]) -> Result<&'a [u8]> {
        let dst = self.prepare(pair.max_output_len(src.len()));
        let res = active().convert(pair, src, dst)?;
        Ok(&dst[..res.written])
    }

    /// Latin1 to UTF-8, borrowed as `&str`.
    pub fn latin1_to_utf8<'a>(&'a mut self, src: &[u8]) -> &'a str {
        let dst = self.prepare(max_utf8_len_from_latin1(src.len()));
        // Latin1 input is never ill-formed and `dst` holds the worst case.
        let written = active().latin1_to_utf8(src, dst).map_or(0, |res| res.written);
        // SAFETY: successful conversions to UTF-8 produce well-formed UTF-8.
        unsafe { std::str::from_utf8_unchecked(&dst[..written]) }
    }

    /// UTF-16LE to UTF-8, borrowed as `&str`.
    pub fn utf16le_to_utf8<'a>(&'a mut self, src: &[u8]) -> Result<&'a str> {
        let out = self.convert(EncodingPair::new(Encoding::Utf16Le, Encoding::Utf8), src)?;
        // SAFETY: the conversion validated `src`, so `out` is well-formed UTF-8.
        Ok(unsafe { std::str::from_utf8_unchecked(out) })
    }

    pub fn utf16be_to_utf8<'a>(&'a mut self, src: &[u8]) -> Result<&'a str> {
        let out = self.convert(EncodingPair::new(Encoding::Utf16Be, Encoding::Utf8), src)?;
        // SAFETY: as in `utf16le_to_utf8`.
        Ok(unsafe { std::str::from_utf8_unchecked(out) })
    }

    pub fn utf8_to_utf16le<'a>(&'a mut self, src: &[u8]) -> Result<&'a [u8]> {
        self.convert(EncodingPair::new(Encoding::Utf8, Encoding::Utf16Le), src)
    }

    pub fn utf8_to_latin1<'a>(&'a mut self, src: &[u8]) -> Result<&'a [u8]> {
        self.convert(EncodingPair::new(Encoding::Utf8, Encoding::Latin1), src)
    }

    /// Write Latin1 input as UTF-8 into an `io::Write`, reusing this buffer.
    pub fn write_latin1_as_utf8_to<W: io::Write>(&mut self, writer: &mut W, src: &[u8]) -> io::Result<()> {
        let out = self.latin1_to_utf8(src);
        writer.write_all(out.as_bytes())
    }

    /// Write UTF-16LE input as UTF-8 into an `io::Write`.
    ///
    /// Ill-formed input is reported as `io::ErrorKind::InvalidData`.
    pub fn write_utf16le_as_utf8_to<W: io::Write>(&mut self, writer: &mut W, src: &[u8]) -> io::Result<()> {
        let out = self
            .utf16le_to_utf8(src)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        writer.write_all(out.as_bytes())
    }

    #[inline]
    fn prepare(&mut self, needed: usize) -> &mut [u8] {
        if self.buf.len() < needed {
            self.buf.resize(needed, 0);
        }
        &mut self.buf[..needed]
    }
}

/// Latin1 to UTF-8, allocated in `bump`.
///
/// The worst-case size is allocated up front; the unused tail stays in the
/// arena until it is reset.
pub fn latin1_to_utf8_in<'b>(src: &[u8], bump: &'b Bump) -> &'b str {
    let dst = bump.alloc_slice_fill_copy(max_utf8_len_from_latin1(src.len()), 0u8);
    let written = active().latin1_to_utf8(src, dst).map_or(0, |res| res.written);
    let out: &'b [u8] = &dst[..written];
    // SAFETY: successful conversions to UTF-8 produce well-formed UTF-8.
    unsafe { std::str::from_utf8_unchecked(out) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_reuses_buffer() {
        let mut scratch = Scratch::new();
        assert_eq!(scratch.latin1_to_utf8(b"na\xEFve"), "naïve");
        let cap = scratch.capacity();
        assert_eq!(scratch.latin1_to_utf8(b"ok"), "ok");
        assert_eq!(scratch.capacity(), cap);
    }

    #[test]
    fn test_scratch_utf16_round_trip() {
        let mut scratch = Scratch::new();
        let utf16 = scratch.utf8_to_utf16le("žluťoučký kůň".as_bytes()).unwrap().to_vec();
        assert_eq!(scratch.utf16le_to_utf8(&utf16).unwrap(), "žluťoučký kůň");
    }

    #[test]
    fn test_ill_formed_utf16_is_an_error_not_empty() {
        let mut scratch = Scratch::new();
        // Lone high surrogate after one valid unit.
        let err = scratch.utf16be_to_utf8(&[0x00, b'a', 0xD8, 0x00]).unwrap_err();
        assert_eq!(err.offset(), Some(1));
        let err = scratch.utf16le_to_utf8(&[b'a', 0x00, 0x00, 0xDC]).unwrap_err();
        assert_eq!(err.kind(), Some(crate::InvalidKind::Surrogate));

        // The buffer still works after a failure.
        assert_eq!(scratch.utf16be_to_utf8(&[0x00, b'o', 0x00, b'k']).unwrap(), "ok");
    }

    #[test]
    fn test_write_to_reports_invalid_data() {
        let mut scratch = Scratch::new();
        let mut out = Vec::new();
        let err = scratch
            .write_utf16le_as_utf8_to(&mut out, &[0x00, 0xD8])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        scratch.write_latin1_as_utf8_to(&mut out, b"\xA9 2024").unwrap();
        assert_eq!(out, "© 2024".as_bytes());
    }

    #[test]
    fn test_latin1_to_utf8_in_bump() {
        let bump = Bump::new();
        let s = latin1_to_utf8_in(b"Gr\xFC\xDFe", &bump);
        assert_eq!(s, "Grüße");
    }
}
