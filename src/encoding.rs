//! Encoding descriptors.
//!
//! An [`EncodingPair`] names the source and target encoding of one call. It is
//! resolved once per call by [`crate::Transcoder::convert`] and never consulted
//! inside a kernel loop: the kernels themselves are monomorphized per pair and
//! per endianness.

use std::fmt;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Type-level byte order marker for UTF-16 buffers.
///
/// Implemented for `byteorder`'s [`LittleEndian`] and [`BigEndian`] so that the
/// scalar paths can use [`ByteOrder::read_u16`] / [`ByteOrder::write_u16`]
/// directly, while the vector paths only look at [`Endianness::BIG`] to pick
/// their shuffle masks.
pub trait Endianness: ByteOrder + 'static {
    const BIG: bool;
    /// The matching UTF-16 encoding.
    const UTF16: Encoding;
}

impl Endianness for LittleEndian {
    const BIG: bool = false;
    const UTF16: Encoding = Encoding::Utf16Le;
}

impl Endianness for BigEndian {
    const BIG: bool = true;
    const UTF16: Encoding = Encoding::Utf16Be;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Latin1,
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    /// Size of one code unit in bytes.
    #[inline]
    pub const fn unit_size(self) -> usize {
        match self {
            Encoding::Latin1 | Encoding::Utf8 => 1,
            Encoding::Utf16Le | Encoding::Utf16Be => 2,
        }
    }

    /// Every byte sequence is valid Latin1; the others need validation.
    #[inline]
    pub const fn requires_validation(self) -> bool {
        !matches!(self, Encoding::Latin1)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Encoding::Latin1 => "latin1",
            Encoding::Utf8 => "utf8",
            Encoding::Utf16Le => "utf16le",
            Encoding::Utf16Be => "utf16be",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source/target pair selecting one kernel family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingPair {
    pub from: Encoding,
    pub to: Encoding,
}

impl EncodingPair {
    /// All pairs with a kernel behind them.
    pub const ALL: [EncodingPair; 10] = [
        EncodingPair::new(Encoding::Latin1, Encoding::Utf8),
        EncodingPair::new(Encoding::Latin1, Encoding::Utf16Le),
        EncodingPair::new(Encoding::Latin1, Encoding::Utf16Be),
        EncodingPair::new(Encoding::Utf8, Encoding::Latin1),
        EncodingPair::new(Encoding::Utf8, Encoding::Utf16Le),
        EncodingPair::new(Encoding::Utf8, Encoding::Utf16Be),
        EncodingPair::new(Encoding::Utf16Le, Encoding::Utf8),
        EncodingPair::new(Encoding::Utf16Be, Encoding::Utf8),
        EncodingPair::new(Encoding::Utf16Le, Encoding::Latin1),
        EncodingPair::new(Encoding::Utf16Be, Encoding::Latin1),
    ];

    pub const fn new(from: Encoding, to: Encoding) -> Self {
        EncodingPair { from, to }
    }

    #[inline]
    pub fn is_supported(self) -> bool {
        Self::ALL.contains(&self)
    }

    /// Worst-case output size in bytes for `src_bytes` bytes of input.
    ///
    /// This is a pure function of the input length and the pair; callers that
    /// size `dst` with it always get the vectorized path.
    pub fn max_output_len(self, src_bytes: usize) -> usize {
        let units = src_bytes / self.from.unit_size();
        match (self.from, self.to) {
            (Encoding::Latin1, Encoding::Utf8) => crate::max_utf8_len_from_latin1(units),
            (Encoding::Latin1, Encoding::Utf16Le | Encoding::Utf16Be) => {
                crate::max_utf16_len_from_latin1(units)
            }
            (Encoding::Utf8, Encoding::Latin1) => crate::max_latin1_len_from_utf8(units),
            (Encoding::Utf8, Encoding::Utf16Le | Encoding::Utf16Be) => {
                crate::max_utf16_len_from_utf8(units)
            }
            (Encoding::Utf16Le | Encoding::Utf16Be, Encoding::Utf8) => {
                crate::max_utf8_len_from_utf16(units)
            }
            (Encoding::Utf16Le | Encoding::Utf16Be, Encoding::Latin1) => {
                crate::max_latin1_len_from_utf16(units)
            }
            _ => 0,
        }
    }

    /// Procedure-style name, e.g. `latin1_to_utf8`.
    pub fn name(self) -> String {
        format!("{}_to_{}", self.from, self.to)
    }
}

impl fmt::Display for EncodingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_names() {
        let names: Vec<String> = EncodingPair::ALL.iter().map(|p| p.name()).collect();
        assert!(names.contains(&"latin1_to_utf8".to_string()));
        assert!(names.contains(&"utf16be_to_latin1".to_string()));
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn test_identity_pairs_are_unsupported() {
        assert!(!EncodingPair::new(Encoding::Utf8, Encoding::Utf8).is_supported());
        assert!(!EncodingPair::new(Encoding::Utf16Le, Encoding::Utf16Be).is_supported());
        assert!(EncodingPair::new(Encoding::Latin1, Encoding::Utf8).is_supported());
    }

    #[test]
    fn test_max_output_len_counts_units_not_bytes() {
        let pair = EncodingPair::new(Encoding::Utf16Le, Encoding::Utf8);
        // 10 bytes are 5 UTF-16 units, each at most 3 UTF-8 bytes.
        assert_eq!(pair.max_output_len(10), 15);
        let pair = EncodingPair::new(Encoding::Latin1, Encoding::Utf8);
        assert_eq!(pair.max_output_len(10), 20);
    }
}
