//! Measurement harness.
//!
//! Test cases are described in JSON:
//!
//! ```json
//! [
//!   { "input": { "type": "file", "path": "corpus/latin1.txt" },
//!     "iterations": 200,
//!     "tested_procedures": ["latin1_to_utf8+haswell", "latin1_to_utf8+fallback"] },
//!   { "input": { "type": "random_utf8", "size": 65536,
//!                "weights": [0.7, 0.2, 0.08, 0.02], "seed": 1 } }
//! ]
//! ```
//!
//! An empty `tested_procedures` list runs every registered procedure; names
//! that are not registered on this machine are skipped with a warning.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::TranscodeError;
use crate::procedures::{Registry, procedure_names};
use crate::random_utf8::{DistributionError, RandomUtf8};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to read input file `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read test case description")]
    Description(#[from] std::io::Error),

    #[error("invalid test case description")]
    Json(#[from] serde_json::Error),

    #[error("invalid random input distribution")]
    Distribution(#[from] DistributionError),

    #[error("no procedure named `{name}`")]
    UnknownProcedure { name: String },

    #[error("procedure `{name}` failed")]
    Procedure {
        name: String,
        #[source]
        source: TranscodeError,
    },
}

pub type Result<T> = std::result::Result<T, HarnessError>;

/// One timed run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    pub elapsed: Duration,
    /// Reference cycles (time-stamp counter) where the platform exposes one.
    pub cycles: Option<u64>,
    /// Retired instructions. No portable source exists, so this stays `None`
    /// unless a caller fills it from an external counter.
    pub instructions: Option<u64>,
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn read_cycles() -> Option<u64> {
    // SAFETY: `rdtsc` is available on every x86_64 CPU.
    #[allow(unused_unsafe)]
    let tsc = unsafe { core::arch::x86_64::_rdtsc() };
    Some(tsc)
}

#[cfg(not(target_arch = "x86_64"))]
#[inline]
fn read_cycles() -> Option<u64> {
    None
}

impl Measurement {
    /// Time a single call of `f`.
    pub fn measure<T>(f: impl FnOnce() -> T) -> (T, Measurement) {
        let start_cycles = read_cycles();
        let start = Instant::now();
        let value = f();
        let elapsed = start.elapsed();
        let cycles = match (start_cycles, read_cycles()) {
            (Some(a), Some(b)) => Some(b.wrapping_sub(a)),
            _ => None,
        };
        (
            value,
            Measurement {
                elapsed,
                cycles,
                instructions: None,
            },
        )
    }
}

/// Best and total over a series of runs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventAggregate {
    pub iterations: usize,
    pub best: Measurement,
    pub total: Measurement,
}

fn add_counts(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    Some(a?.wrapping_add(b?))
}

impl EventAggregate {
    pub fn push(&mut self, m: Measurement) {
        if self.iterations == 0 || m.elapsed < self.best.elapsed {
            self.best = m;
        }
        self.total = if self.iterations == 0 {
            m
        } else {
            Measurement {
                elapsed: self.total.elapsed + m.elapsed,
                cycles: add_counts(self.total.cycles, m.cycles),
                instructions: add_counts(self.total.instructions, m.instructions),
            }
        };
        self.iterations += 1;
    }

    pub fn mean_elapsed(&self) -> Duration {
        match u32::try_from(self.iterations) {
            Ok(n) if n > 0 => self.total.elapsed / n,
            _ => Duration::ZERO,
        }
    }

    /// Throughput figures for `input_len` bytes per run, from the best run.
    pub fn summary(&self, input_len: usize) -> Summary {
        let secs = self.best.elapsed.as_secs_f64();
        let bytes = input_len as f64;
        let gb_per_s = if secs > 0.0 { bytes / secs / 1e9 } else { 0.0 };
        let ghz = match self.best.cycles {
            Some(cycles) if secs > 0.0 => Some(cycles as f64 / secs / 1e9),
            _ => None,
        };
        let ins_per_byte = match self.best.instructions {
            Some(ins) if input_len > 0 => Some(ins as f64 / bytes),
            _ => None,
        };
        Summary {
            ins_per_byte,
            ghz,
            gb_per_s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub ins_per_byte: Option<f64>,
    pub ghz: Option<f64>,
    pub gb_per_s: f64,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ins) = self.ins_per_byte {
            write!(f, "{:8.3} ins/byte, ", ins)?;
        }
        if let Some(ghz) = self.ghz {
            write!(f, "{:6.3} GHz, ", ghz)?;
        }
        write!(f, "{:8.3} GB/s", self.gb_per_s)
    }
}

/// Run `name` from `registry` over `input` `iterations` times.
///
/// The output buffer is allocated once, sized so the procedure stays on its
/// vector path. The first failing run aborts the measurement.
pub fn run_procedure(registry: &Registry, name: &str, input: &[u8], iterations: usize) -> Result<EventAggregate> {
    let procedure = registry.get(name).ok_or_else(|| HarnessError::UnknownProcedure {
        name: name.to_string(),
    })?;

    let mut dst = vec![0u8; procedure.output_len(input.len())];
    let mut aggregate = EventAggregate::default();
    for _ in 0..iterations {
        let (res, m) = Measurement::measure(|| procedure.run(std::hint::black_box(input), &mut dst));
        std::hint::black_box(res).map_err(|source| HarnessError::Procedure {
            name: name.to_string(),
            source,
        })?;
        aggregate.push(m);
    }
    Ok(aggregate)
}

fn default_iterations() -> usize {
    100
}

fn default_weights() -> [f64; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Input {
    File {
        path: PathBuf,
    },
    RandomUtf8 {
        size: usize,
        /// Relative frequency of 1, 2, 3 and 4-byte sequences.
        #[serde(default = "default_weights")]
        weights: [f64; 4],
        #[serde(default)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testcase {
    pub input: Input,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default)]
    pub tested_procedures: Vec<String>,
}

impl Testcase {
    /// Parse a JSON list of test cases (a single object is accepted too).
    pub fn parse_list(json: &str) -> Result<Vec<Testcase>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<Testcase>),
            One(Testcase),
        }

        Ok(match serde_json::from_str(json)? {
            OneOrMany::Many(cases) => cases,
            OneOrMany::One(case) => vec![case],
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Vec<Testcase>> {
        let mut json = String::new();
        std::fs::File::open(path.as_ref())?.read_to_string(&mut json)?;
        Self::parse_list(&json)
    }
}

/// Materialise the input bytes of a test case.
pub fn prepare_input(testcase: &Testcase) -> Result<Vec<u8>> {
    match &testcase.input {
        Input::File { path } => std::fs::read(path).map_err(|source| HarnessError::Io {
            path: path.clone(),
            source,
        }),
        Input::RandomUtf8 { size, weights, seed } => {
            let mut generator = match seed {
                Some(seed) => RandomUtf8::seeded(*seed, *weights)?,
                None => RandomUtf8::from_entropy(*weights)?,
            };
            Ok(generator.generate(*size))
        }
    }
}

/// Result of one procedure within a test case.
#[derive(Debug, Clone)]
pub struct ProcedureReport {
    pub name: String,
    pub input_len: usize,
    pub aggregate: EventAggregate,
}

impl ProcedureReport {
    pub fn summary(&self) -> Summary {
        self.aggregate.summary(self.input_len)
    }
}

/// Run every selected procedure of `testcase` and log a summary line for each.
pub fn run_testcase(registry: &Registry, testcase: &Testcase) -> Result<Vec<ProcedureReport>> {
    let input = prepare_input(testcase)?;
    info!("Input size: {} bytes, {} iterations", input.len(), testcase.iterations);

    let names: Vec<&str> = if testcase.tested_procedures.is_empty() {
        procedure_names(registry)
    } else {
        testcase
            .tested_procedures
            .iter()
            .map(String::as_str)
            .filter(|name| {
                let known = registry.contains_key(*name);
                if !known {
                    warn!("Procedure `{}` is not available, skipping", name);
                }
                known
            })
            .collect()
    };

    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        let aggregate = run_procedure(registry, name, &input, testcase.iterations)?;
        let report = ProcedureReport {
            name: name.to_string(),
            input_len: input.len(),
            aggregate,
        };
        info!("{:<40} : {}", report.name, report.summary());
        reports.push(report);
    }
    Ok(reports)
}
