#![cfg(feature = "harness")]


use std::io::Write;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use fixtures::*;
use transcode_simd::harness::{HarnessError, Input, Testcase, run_procedure, run_testcase};
use transcode_simd::procedures::{Operation, all_procedures, procedure_names};
use transcode_simd::random_utf8::{DistributionError, RandomUtf8};
use transcode_simd::{Capability, Encoding, EncodingPair};

#[test]
fn test_registry_names_are_sorted_and_complete() {
    ensure_env_logger_initialized();
    let registry = all_procedures();
    let names = procedure_names(&registry);

    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    for cap in Capability::available() {
        for op in Operation::all() {
            let name = format!("{}+{}", op, cap);
            let procedure = registry.get(&name).unwrap();
            assert_eq!(procedure.operation, op);
            assert_eq!(procedure.capability, cap);
        }
    }
}

#[test]
fn test_random_utf8_is_deterministic_and_well_formed() {
    let weights = [0.4, 0.3, 0.2, 0.1];
    let a = RandomUtf8::seeded(7, weights).unwrap().generate(10_000);
    let b = RandomUtf8::seeded(7, weights).unwrap().generate(10_000);
    assert_eq!(a, b);
    assert_eq!(a.len(), 10_000);
    assert!(std::str::from_utf8(&a).is_ok());

    assert_eq!(
        RandomUtf8::seeded(1, [0.0; 4]).unwrap_err(),
        DistributionError::AllZero
    );
}

#[test]
fn test_random_input_converts_on_every_capability() {
    let src = RandomUtf8::seeded(42, [0.5, 0.2, 0.2, 0.1]).unwrap().generate(4096);
    let expected = utf16le_from_str(std::str::from_utf8(&src).unwrap());
    for t in transcoders() {
        let mut dst = vec![0u8; src.len() * 2];
        let res = t.utf8_to_utf16le(&src, &mut dst).unwrap();
        assert_eq!(&dst[..res.written], expected.as_slice(), "{}", t.capability());
    }
}

#[test]
fn test_run_procedure_counts_iterations() {
    let registry = all_procedures();
    let input = all_latin1_bytes(8);
    let agg = run_procedure(&registry, "latin1_to_utf8+fallback", &input, 5).unwrap();
    assert_eq!(agg.iterations, 5);
    assert!(agg.best.elapsed <= agg.total.elapsed);

    let err = run_procedure(&registry, "latin1_to_utf32+fallback", &input, 1).unwrap_err();
    assert!(matches!(err, HarnessError::UnknownProcedure { .. }));
}

#[test]
fn test_run_procedure_surfaces_invalid_input() {
    let registry = all_procedures();
    let err = run_procedure(&registry, "validate_utf8+portable", b"ok\xFF", 3).unwrap_err();
    assert!(matches!(err, HarnessError::Procedure { ref name, .. } if name == "validate_utf8+portable"));
}

#[test]
fn test_testcase_from_file() {
    ensure_env_logger_initialized();
    let mut corpus = NamedTempFile::new().unwrap();
    corpus.write_all(mixed_text().as_bytes()).unwrap();

    let mut description = NamedTempFile::new().unwrap();
    let json = serde_json::json!([
        {
            "input": { "type": "file", "path": corpus.path() },
            "iterations": 3,
            "tested_procedures": ["utf8_to_utf16le+portable", "utf8_to_utf16le+no_such_backend"]
        },
        {
            "input": { "type": "random_utf8", "size": 512, "weights": [1, 1, 1, 1], "seed": 3 },
            "iterations": 2,
            "tested_procedures": ["validate_utf8+fallback"]
        }
    ]);
    write!(description, "{}", json).unwrap();

    let cases = Testcase::load(description.path()).unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(
        cases[0].input,
        Input::File {
            path: corpus.path().to_path_buf()
        }
    );

    let registry = all_procedures();
    let reports = run_testcase(&registry, &cases[0]).unwrap();
    // The unknown name is skipped, not an error.
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].name, "utf8_to_utf16le+portable");
    assert_eq!(reports[0].input_len, mixed_text().len());
    assert_eq!(reports[0].aggregate.iterations, 3);

    let reports = run_testcase(&registry, &cases[1]).unwrap();
    assert_eq!(reports[0].input_len, 512);
}

#[test]
fn test_missing_input_file() {
    let case = Testcase {
        input: Input::File {
            path: "/nonexistent/transcode-simd/input.txt".into(),
        },
        iterations: 1,
        tested_procedures: vec![],
    };
    let err = run_testcase(&all_procedures(), &case).unwrap_err();
    assert!(matches!(err, HarnessError::Io { .. }));
}

#[test]
fn test_empty_selection_runs_everything() {
    // NUL bytes are valid in every source encoding and fit Latin1 as UTF-16.
    let mut corpus = NamedTempFile::new().unwrap();
    corpus.write_all(&[0u8; 64]).unwrap();

    let case = Testcase {
        input: Input::File {
            path: corpus.path().to_path_buf(),
        },
        iterations: 1,
        tested_procedures: vec![],
    };
    let registry = all_procedures();
    let reports = run_testcase(&registry, &case).unwrap();
    assert_eq!(reports.len(), registry.len());

    let name = format!(
        "{}+fallback",
        Operation::Convert(EncodingPair::new(Encoding::Latin1, Encoding::Utf8))
    );
    assert!(reports.iter().any(|r| r.name == name));
}
