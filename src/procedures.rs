//! Name-keyed registry of runnable procedures.
//!
//! Every (operation, capability) combination the host can execute is listed
//! under a name like `latin1_to_utf8+westmere` or `validate_utf8+portable`,
//! and runs through the same `run(src, dst)` signature so measurement code can
//! treat them uniformly.

use std::fmt;

use ahash::RandomState;
use hashbrown::HashMap;
use log::trace;

use crate::Conversion;
use crate::capability::Capability;
use crate::dispatch::Transcoder;
use crate::encoding::{Encoding, EncodingPair};
use crate::error::Result;

pub type Registry = HashMap<String, Procedure, RandomState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Convert(EncodingPair),
    Validate(Encoding),
}

impl Operation {
    pub const VALIDATIONS: [Encoding; 3] = [Encoding::Utf8, Encoding::Utf16Le, Encoding::Utf16Be];

    /// All operations with kernels behind them.
    pub fn all() -> impl Iterator<Item = Operation> {
        EncodingPair::ALL
            .into_iter()
            .map(Operation::Convert)
            .chain(Self::VALIDATIONS.into_iter().map(Operation::Validate))
    }

    pub fn source(self) -> Encoding {
        match self {
            Operation::Convert(pair) => pair.from,
            Operation::Validate(encoding) => encoding,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Convert(pair) => f.write_str(&pair.name()),
            Operation::Validate(encoding) => write!(f, "validate_{}", encoding),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Procedure {
    pub name: String,
    pub operation: Operation,
    pub capability: Capability,
    transcoder: Transcoder,
}

impl Procedure {
    pub fn new(operation: Operation, capability: Capability) -> Result<Self> {
        Ok(Procedure {
            name: format!("{}+{}", operation, capability),
            operation,
            capability,
            transcoder: Transcoder::new(capability)?,
        })
    }

    /// Output buffer size that keeps this procedure on its vector path.
    pub fn output_len(&self, src_len: usize) -> usize {
        match self.operation {
            Operation::Convert(pair) => pair.max_output_len(src_len),
            Operation::Validate(_) => 0,
        }
    }

    /// Run once. Validation procedures report `written: 0`.
    pub fn run(&self, src: &[u8], dst: &mut [u8]) -> Result<Conversion> {
        match self.operation {
            Operation::Convert(pair) => self.transcoder.convert(pair, src, dst),
            Operation::Validate(encoding) => {
                self.transcoder.validate(encoding, src)?;
                Ok(Conversion {
                    read: src.len() / encoding.unit_size(),
                    written: 0,
                })
            }
        }
    }
}

/// Every procedure runnable on this machine.
pub fn all_procedures() -> Registry {
    let mut registry = Registry::default();
    for capability in Capability::available() {
        for operation in Operation::all() {
            // `available()` only lists runnable capabilities.
            if let Ok(procedure) = Procedure::new(operation, capability) {
                trace!("Registered procedure {}", procedure.name);
                registry.insert(procedure.name.clone(), procedure);
            }
        }
    }
    registry
}

/// Registry names in a stable order.
pub fn procedure_names(registry: &Registry) -> Vec<&str> {
    let mut names: Vec<&str> = registry.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lists_portable_and_fallback() {
        let registry = all_procedures();
        assert!(registry.contains_key("latin1_to_utf8+fallback"));
        assert!(registry.contains_key("latin1_to_utf8+portable"));
        assert!(registry.contains_key("validate_utf16be+portable"));
        // 10 conversions + 3 validations per capability.
        assert_eq!(registry.len(), Capability::available().len() * 13);
    }

    #[test]
    fn test_procedure_run() {
        let registry = all_procedures();
        let proc = &registry["latin1_to_utf8+portable"];
        let mut dst = vec![0u8; proc.output_len(3)];
        let res = proc.run(b"\xE9t\xE9", &mut dst).unwrap();
        assert_eq!(&dst[..res.written], "été".as_bytes());

        let proc = &registry["validate_utf16le+fallback"];
        let res = proc.run(&[0x41, 0x00, 0x42, 0x00], &mut []).unwrap();
        assert_eq!(res, Conversion { read: 2, written: 0 });
    }

    #[test]
    fn test_operation_names() {
        let pair = EncodingPair::new(Encoding::Utf16Be, Encoding::Latin1);
        assert_eq!(Operation::Convert(pair).to_string(), pair.name());
        assert_eq!(Operation::Convert(pair).to_string(), "utf16be_to_latin1");
        assert_eq!(Operation::Validate(Encoding::Utf8).to_string(), "validate_utf8");
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = all_procedures();
        let names = procedure_names(&registry);
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }
}
