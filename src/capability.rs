//! Capability identifiers and the runtime CPU probe.
//!
//! The dispatcher only ever consumes a [`Capability`]; how it was chosen
//! (probe, override, caller) is decided here, once.
//!
//! Environment override for testing/debugging:
//! - `TRANSCODE_SIMD_FORCE=<name>` where `<name>` is one of `fallback`,
//!   `portable`, `westmere`, `haswell`, `neon`. Values the CPU cannot run are
//!   ignored with a warning.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use log::{debug, warn};
use thiserror::Error;

pub const FORCE_ENV_VAR: &str = "TRANSCODE_SIMD_FORCE";

bitflags! {
    /// Instruction set extensions relevant to the kernels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CpuFeatures: u32 {
        const SSE2 = 1 << 0;
        const SSSE3 = 1 << 1;
        const SSE41 = 1 << 2;
        const AVX2 = 1 << 3;
        const NEON = 1 << 4;
    }
}

impl CpuFeatures {
    /// Probe the running CPU.
    pub fn detect() -> Self {
        #[allow(unused_mut)]
        let mut features = CpuFeatures::empty();

        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("sse2") {
                features |= CpuFeatures::SSE2;
            }
            if std::arch::is_x86_feature_detected!("ssse3") {
                features |= CpuFeatures::SSSE3;
            }
            if std::arch::is_x86_feature_detected!("sse4.1") {
                features |= CpuFeatures::SSE41;
            }
            if std::arch::is_x86_feature_detected!("avx2") {
                features |= CpuFeatures::AVX2;
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            // NEON is mandatory on aarch64.
            features |= CpuFeatures::NEON;
        }

        features
    }
}

/// Kernel family selector.
///
/// `Fallback` is the scalar processor alone. `Portable` runs the vector
/// driver on emulated 16-byte lanes and is available everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Fallback,
    Portable,
    /// SSSE3 + SSE4.1, 128-bit.
    Westmere,
    /// AVX2, 256-bit.
    Haswell,
    /// aarch64 NEON, 128-bit.
    Neon,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Fallback,
        Capability::Portable,
        Capability::Westmere,
        Capability::Haswell,
        Capability::Neon,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Capability::Fallback => "fallback",
            Capability::Portable => "portable",
            Capability::Westmere => "westmere",
            Capability::Haswell => "haswell",
            Capability::Neon => "neon",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Capability::Fallback => "scalar, one code unit at a time",
            Capability::Portable => "emulated 128-bit lanes (SWAR)",
            Capability::Westmere => "SSSE3/SSE4.1 (128-bit, 16 bytes per step)",
            Capability::Haswell => "AVX2 (256-bit, 32 bytes per step)",
            Capability::Neon => "NEON (128-bit, 16 bytes per step)",
        }
    }

    /// Bytes consumed per vector step; 1 for the scalar fallback.
    pub const fn vector_width(self) -> usize {
        match self {
            Capability::Fallback => 1,
            Capability::Portable | Capability::Westmere | Capability::Neon => 16,
            Capability::Haswell => 32,
        }
    }

    /// Whether kernels for this capability exist in this build and can run
    /// on a CPU with `features`.
    pub fn is_supported_by(self, features: CpuFeatures) -> bool {
        match self {
            Capability::Fallback | Capability::Portable => true,
            Capability::Westmere => {
                cfg!(target_arch = "x86_64")
                    && features.contains(CpuFeatures::SSSE3 | CpuFeatures::SSE41)
            }
            Capability::Haswell => {
                cfg!(target_arch = "x86_64") && features.contains(CpuFeatures::AVX2)
            }
            Capability::Neon => cfg!(target_arch = "aarch64") && features.contains(CpuFeatures::NEON),
        }
    }

    #[inline]
    pub fn is_supported(self) -> bool {
        self.is_supported_by(CpuFeatures::detect())
    }

    /// All capabilities runnable on this machine, widest last.
    pub fn available() -> Vec<Capability> {
        let features = CpuFeatures::detect();
        Self::ALL
            .into_iter()
            .filter(|c| c.is_supported_by(features))
            .collect()
    }

    /// Pick the best capability for `features`, ignoring overrides.
    pub fn best_for(features: CpuFeatures) -> Capability {
        [Capability::Haswell, Capability::Westmere, Capability::Neon]
            .into_iter()
            .find(|c| c.is_supported_by(features))
            .unwrap_or(Capability::Portable)
    }

    /// Probe the CPU and apply the `TRANSCODE_SIMD_FORCE` override.
    pub fn detect() -> Capability {
        let features = CpuFeatures::detect();
        let best = Self::best_for(features);

        if let Ok(value) = std::env::var(FORCE_ENV_VAR) {
            match value.parse::<Capability>() {
                Ok(forced) if forced.is_supported_by(features) => {
                    debug!("{}={}: using {} kernels", FORCE_ENV_VAR, value, forced);
                    return forced;
                }
                Ok(forced) => {
                    warn!(
                        "{}={}: {} kernels cannot run here, using {}",
                        FORCE_ENV_VAR, value, forced, best
                    );
                }
                Err(_) => {
                    warn!("{}={}: unknown capability, using {}", FORCE_ENV_VAR, value, best);
                }
            }
        }

        debug!(
            "Detected CPU features {:?}, selected {} ({})",
            features,
            best,
            best.description()
        );
        best
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capability `{0}`")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Capability::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCapability(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrips_names() {
        for cap in Capability::ALL {
            assert_eq!(cap.name().parse::<Capability>(), Ok(cap));
        }
        assert_eq!("  HASWELL ".parse::<Capability>(), Ok(Capability::Haswell));
        let err = "avx512".parse::<Capability>().unwrap_err();
        assert_eq!(err, UnknownCapability("avx512".to_string()));
        insta::assert_snapshot!(err.to_string(), @"unknown capability `avx512`");
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_scalar_capabilities_always_supported() {
        assert!(Capability::Fallback.is_supported_by(CpuFeatures::empty()));
        assert!(Capability::Portable.is_supported_by(CpuFeatures::empty()));
        assert!(!Capability::Westmere.is_supported_by(CpuFeatures::empty()));
        assert!(!Capability::Haswell.is_supported_by(CpuFeatures::SSE2));
    }

    #[test]
    fn test_best_for_prefers_widest() {
        assert_eq!(Capability::best_for(CpuFeatures::empty()), Capability::Portable);

        #[cfg(target_arch = "x86_64")]
        {
            let sse = CpuFeatures::SSE2 | CpuFeatures::SSSE3 | CpuFeatures::SSE41;
            assert_eq!(Capability::best_for(sse), Capability::Westmere);
            assert_eq!(Capability::best_for(sse | CpuFeatures::AVX2), Capability::Haswell);
        }

        #[cfg(target_arch = "aarch64")]
        assert_eq!(Capability::best_for(CpuFeatures::NEON), Capability::Neon);
    }

    #[test]
    fn test_detected_capability_is_runnable() {
        let cap = Capability::detect();
        assert!(cap.is_supported());
        assert!(Capability::available().contains(&cap));
    }
}
