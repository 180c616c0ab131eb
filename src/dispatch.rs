//! Runtime kernel selection.
//!
//! A [`Transcoder`] is a capability plus a table of kernel entry points. It is
//! resolved once (either explicitly or through [`active`]) and is then just a
//! bundle of function pointers; no per-call feature detection happens.

use std::sync::OnceLock;

use log::debug;

use crate::Conversion;
use crate::capability::{Capability, CpuFeatures};
use crate::encoding::{Encoding, EncodingPair};
use crate::error::{Result, TranscodeError};
use crate::kernels::{self, Kernels};
use crate::scalar;

#[cfg(feature = "perf-counters")]
use crate::perf;

#[derive(Clone, Copy)]
pub struct Transcoder {
    capability: Capability,
    kernels: Kernels,
}

impl std::fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcoder")
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

fn kernels_for(capability: Capability) -> Kernels {
    match capability {
        Capability::Fallback => kernels::FALLBACK,
        Capability::Portable => kernels::portable::KERNELS,
        #[cfg(target_arch = "x86_64")]
        Capability::Westmere => kernels::westmere::KERNELS,
        #[cfg(target_arch = "x86_64")]
        Capability::Haswell => kernels::haswell::KERNELS,
        #[cfg(target_arch = "aarch64")]
        Capability::Neon => kernels::neon::KERNELS,
        // Not compiled for this target; `is_supported_by` never admits these.
        #[allow(unreachable_patterns)]
        _ => kernels::FALLBACK,
    }
}

impl Transcoder {
    /// Kernels for `capability`, if the running CPU can execute them.
    pub fn new(capability: Capability) -> Result<Self> {
        Self::with_features(capability, CpuFeatures::detect())
    }

    fn with_features(capability: Capability, features: CpuFeatures) -> Result<Self> {
        if !capability.is_supported_by(features) {
            return Err(TranscodeError::UnsupportedCapability { capability });
        }
        Ok(Transcoder {
            capability,
            kernels: kernels_for(capability),
        })
    }

    /// Best kernels for this machine (honours `TRANSCODE_SIMD_FORCE`).
    pub fn detect() -> Self {
        let capability = Capability::detect();
        Transcoder {
            capability,
            kernels: kernels_for(capability),
        }
    }

    /// The scalar routines only.
    pub fn fallback() -> Self {
        Transcoder {
            capability: Capability::Fallback,
            kernels: kernels::FALLBACK,
        }
    }

    #[inline]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Convert `src` from `pair.from` to `pair.to` into `dst`.
    ///
    /// If `dst` holds `pair.max_output_len(src.len())` bytes the vector kernel
    /// runs. Otherwise the exact output size is computed first and either the
    /// scalar routine runs or `OutputTooSmall` is returned with `dst`
    /// untouched.
    pub fn convert(&self, pair: EncodingPair, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        let (Some(kernel), Some(fallback)) = (self.kernels.for_pair(pair), kernels::FALLBACK.for_pair(pair)) else {
            return Err(TranscodeError::UnsupportedPair {
                from: pair.from,
                to: pair.to,
            });
        };

        if dst.len() < pair.max_output_len(src.len()) {
            #[cfg(feature = "perf-counters")]
            perf::record(pair, src.len() / pair.from.unit_size(), false);
            scalar::ensure_capacity(pair, src, dst.len())?;
            // SAFETY: the fallback table holds safe functions only.
            return unsafe { fallback(src, dst) };
        }

        #[cfg(feature = "perf-counters")]
        perf::record(pair, src.len() / pair.from.unit_size(), self.capability != Capability::Fallback);

        // SAFETY:
        // - `self.kernels` was built for a capability the CPU supports (checked
        //   in `new`, or chosen by the probe in `detect`).
        // - `dst` holds the worst case for `src`, which is the kernels' only
        //   precondition on buffer sizes.
        unsafe { kernel(src, dst) }
    }

    /// Check that `src` is well-formed `encoding`. Latin1 is always valid.
    pub fn validate(&self, encoding: Encoding, src: &[u8]) -> Result<()> {
        match self.kernels.for_validation(encoding) {
            // SAFETY: see `convert`; validation has no buffer precondition.
            Some(kernel) => unsafe { kernel(src) },
            None => Ok(()),
        }
    }

    #[inline]
    pub fn latin1_to_utf8(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Latin1, Encoding::Utf8), src, dst)
    }

    #[inline]
    pub fn latin1_to_utf16le(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Latin1, Encoding::Utf16Le), src, dst)
    }

    #[inline]
    pub fn latin1_to_utf16be(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Latin1, Encoding::Utf16Be), src, dst)
    }

    #[inline]
    pub fn utf8_to_latin1(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Utf8, Encoding::Latin1), src, dst)
    }

    #[inline]
    pub fn utf8_to_utf16le(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Utf8, Encoding::Utf16Le), src, dst)
    }

    #[inline]
    pub fn utf8_to_utf16be(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Utf8, Encoding::Utf16Be), src, dst)
    }

    #[inline]
    pub fn utf16le_to_utf8(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Utf16Le, Encoding::Utf8), src, dst)
    }

    #[inline]
    pub fn utf16be_to_utf8(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Utf16Be, Encoding::Utf8), src, dst)
    }

    #[inline]
    pub fn utf16le_to_latin1(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Utf16Le, Encoding::Latin1), src, dst)
    }

    #[inline]
    pub fn utf16be_to_latin1(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        self.convert(EncodingPair::new(Encoding::Utf16Be, Encoding::Latin1), src, dst)
    }

    #[inline]
    pub fn validate_utf8(&self, src: &[u8]) -> Result<()> {
        self.validate(Encoding::Utf8, src)
    }

    #[inline]
    pub fn validate_utf16le(&self, src: &[u8]) -> Result<()> {
        self.validate(Encoding::Utf16Le, src)
    }

    #[inline]
    pub fn validate_utf16be(&self, src: &[u8]) -> Result<()> {
        self.validate(Encoding::Utf16Be, src)
    }
}

static ACTIVE: OnceLock<Transcoder> = OnceLock::new();

/// The process-wide transcoder, probed on first use.
pub fn active() -> &'static Transcoder {
    ACTIVE.get_or_init(|| {
        let transcoder = Transcoder::detect();
        debug!("Using {} kernels for transcoding", transcoder.capability());
        transcoder
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_unsupported_capability() {
        let err = Transcoder::with_features(Capability::Haswell, CpuFeatures::empty()).unwrap_err();
        assert_eq!(
            err,
            TranscodeError::UnsupportedCapability {
                capability: Capability::Haswell
            }
        );
        assert!(Transcoder::with_features(Capability::Portable, CpuFeatures::empty()).is_ok());
    }

    #[test]
    fn test_convert_rejects_unknown_pair() {
        let t = Transcoder::fallback();
        let err = t
            .convert(EncodingPair::new(Encoding::Utf8, Encoding::Utf8), b"abc", &mut [0u8; 8])
            .unwrap_err();
        assert!(matches!(err, TranscodeError::UnsupportedPair { .. }));
    }

    #[test]
    fn test_active_is_stable() {
        let a = active().capability();
        let b = active().capability();
        assert_eq!(a, b);
        assert!(a.is_supported());
    }

    #[test]
    fn test_latin1_validation_is_trivial() {
        assert!(Transcoder::detect().validate(Encoding::Latin1, b"\xFF\x00").is_ok());
    }
}
