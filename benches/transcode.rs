use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use transcode_simd::random_utf8::RandomUtf8;
use transcode_simd::{Capability, Encoding, EncodingPair, Transcoder};

const SIZE: usize = 64 * 1024;

struct Case {
    name: &'static str,
    pair: EncodingPair,
    input: Vec<u8>,
}

fn utf16le_from_str(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

fn random_string(weights: [f64; 4]) -> String {
    match RandomUtf8::seeded(0x5EED, weights) {
        Ok(mut generator) => generator.generate_string(SIZE),
        Err(err) => panic!("bad weights: {err}"),
    }
}

fn build_cases() -> Vec<Case> {
    let latin1: Vec<u8> = (0..SIZE).map(|i| (i.wrapping_mul(2654435761) >> 7) as u8).collect();
    let ascii = random_string([1.0, 0.0, 0.0, 0.0]);
    let two_byte = random_string([0.2, 0.8, 0.0, 0.0]);
    let mixed = random_string([0.5, 0.2, 0.2, 0.1]);

    vec![
        Case {
            name: "latin1",
            pair: EncodingPair::new(Encoding::Latin1, Encoding::Utf8),
            input: latin1.clone(),
        },
        Case {
            name: "latin1",
            pair: EncodingPair::new(Encoding::Latin1, Encoding::Utf16Le),
            input: latin1,
        },
        Case {
            name: "ascii",
            pair: EncodingPair::new(Encoding::Utf8, Encoding::Utf16Le),
            input: ascii.clone().into_bytes(),
        },
        Case {
            name: "mixed",
            pair: EncodingPair::new(Encoding::Utf8, Encoding::Utf16Le),
            input: mixed.clone().into_bytes(),
        },
        Case {
            name: "ascii",
            pair: EncodingPair::new(Encoding::Utf16Le, Encoding::Utf8),
            input: utf16le_from_str(&ascii),
        },
        Case {
            name: "two_byte",
            pair: EncodingPair::new(Encoding::Utf16Le, Encoding::Utf8),
            input: utf16le_from_str(&two_byte),
        },
        Case {
            name: "mixed",
            pair: EncodingPair::new(Encoding::Utf16Le, Encoding::Utf8),
            input: utf16le_from_str(&mixed),
        },
    ]
}

fn bench_convert(c: &mut Criterion) {
    let cases = build_cases();
    let transcoders: Vec<Transcoder> = Capability::available()
        .into_iter()
        .filter_map(|cap| Transcoder::new(cap).ok())
        .collect();

    for case in &cases {
        let mut group = c.benchmark_group(format!("{}/{}", case.pair.name(), case.name));
        group.throughput(Throughput::Bytes(case.input.len() as u64));
        let mut dst = vec![0u8; case.pair.max_output_len(case.input.len())];

        for t in &transcoders {
            group.bench_with_input(BenchmarkId::from_parameter(t.capability()), &case.input, |b, input| {
                b.iter(|| {
                    let res = t.convert(case.pair, black_box(input), &mut dst);
                    black_box(res)
                })
            });
        }
        group.finish();
    }
}

fn bench_validate(c: &mut Criterion) {
    let mixed = random_string([0.5, 0.2, 0.2, 0.1]);
    let utf16 = utf16le_from_str(&mixed);
    let transcoders: Vec<Transcoder> = Capability::available()
        .into_iter()
        .filter_map(|cap| Transcoder::new(cap).ok())
        .collect();

    let mut group = c.benchmark_group("validate_utf8/mixed");
    group.throughput(Throughput::Bytes(mixed.len() as u64));
    for t in &transcoders {
        group.bench_function(BenchmarkId::from_parameter(t.capability()), |b| {
            b.iter(|| black_box(t.validate_utf8(black_box(mixed.as_bytes()))))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("validate_utf16le/mixed");
    group.throughput(Throughput::Bytes(utf16.len() as u64));
    for t in &transcoders {
        group.bench_function(BenchmarkId::from_parameter(t.capability()), |b| {
            b.iter(|| black_box(t.validate_utf16le(black_box(&utf16))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_convert, bench_validate);
criterion_main!(benches);
