use thiserror::Error;

use crate::capability::Capability;
use crate::encoding::Encoding;

pub type Result<T> = std::result::Result<T, TranscodeError>;

/// Why a source unit was rejected.
///
/// The UTF-8 kinds follow the usual decoder taxonomy: the offset reported with
/// them is always the first byte of the ill-formed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum InvalidKind {
    #[error("invalid leading byte")]
    HeaderBits,
    #[error("sequence is missing continuation bytes")]
    TooShort,
    #[error("unexpected continuation byte")]
    TooLong,
    #[error("overlong encoding")]
    Overlong,
    #[error("code point above U+10FFFF")]
    TooLarge,
    #[error("unpaired or encoded surrogate")]
    Surrogate,
    #[error("code point above U+00FF is not representable in latin1")]
    NotLatin1,
    #[error("odd number of bytes in UTF-16 input")]
    TruncatedUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TranscodeError {
    /// The source is ill-formed (or not representable in the target).
    ///
    /// `offset` counts source code units from the start of the call. `written`
    /// is the number of output bytes produced for `src[..offset]`; `dst` past
    /// that point holds unspecified bytes.
    #[error("invalid {encoding} input at code unit {offset}: {kind}")]
    InvalidInput {
        encoding: Encoding,
        kind: InvalidKind,
        offset: usize,
        written: usize,
    },

    /// The caller's buffer cannot hold the output. Reported before any write.
    #[error("output buffer too small: need {needed} bytes, have {available}")]
    OutputTooSmall { needed: usize, available: usize },

    #[error("{capability} kernels cannot run on this CPU")]
    UnsupportedCapability { capability: Capability },

    #[error("no kernel converts {from} to {to}")]
    UnsupportedPair { from: Encoding, to: Encoding },
}

impl TranscodeError {
    #[inline]
    pub(crate) fn invalid(encoding: Encoding, kind: InvalidKind, offset: usize, written: usize) -> Self {
        TranscodeError::InvalidInput {
            encoding,
            kind,
            offset,
            written,
        }
    }

    /// Offset (in source code units) of the first invalid unit, if this is a
    /// validation failure.
    pub fn offset(&self) -> Option<usize> {
        match self {
            TranscodeError::InvalidInput { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<InvalidKind> {
        match self {
            TranscodeError::InvalidInput { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Output bytes that are valid before the failure.
    pub fn written(&self) -> Option<usize> {
        match self {
            TranscodeError::InvalidInput { written, .. } => Some(*written),
            _ => None,
        }
    }
}
