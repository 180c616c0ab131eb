
use proptest::prelude::*;

use fixtures::*;
use transcode_simd::{Encoding, EncodingPair, Transcoder};

/// Output of the valid prefix plus the outcome, for comparing backends.
fn run(t: &Transcoder, pair: EncodingPair, src: &[u8]) -> (Result<usize, transcode_simd::TranscodeError>, Vec<u8>) {
    let mut dst = vec![0u8; pair.max_output_len(src.len())];
    match t.convert(pair, src, &mut dst) {
        Ok(res) => {
            dst.truncate(res.written);
            (Ok(res.read), dst)
        }
        Err(err) => {
            dst.truncate(err.written().unwrap_or(0));
            (Err(err), dst)
        }
    }
}

fn assert_backends_agree(src: &[u8]) {
    let fallback = Transcoder::fallback();
    for pair in EncodingPair::ALL {
        let expected = run(&fallback, pair, src);
        for t in transcoders() {
            let got = run(&t, pair, src);
            assert_eq!(got, expected, "{} on {}", pair.name(), t.capability());
        }
    }
    for encoding in [Encoding::Utf8, Encoding::Utf16Le, Encoding::Utf16Be] {
        let expected = fallback.validate(encoding, src);
        for t in transcoders() {
            assert_eq!(t.validate(encoding, src), expected, "validate {} on {}", encoding, t.capability());
        }
    }
}

proptest! {
    #[test]
    fn prop_arbitrary_bytes_agree(src in proptest::collection::vec(any::<u8>(), 0..200)) {
        assert_backends_agree(&src);
    }

    #[test]
    fn prop_mostly_ascii_agree(
        ascii in proptest::collection::vec(0u8..0x80, 0..120),
        noise in proptest::collection::vec(any::<u8>(), 0..4),
        at in 0usize..120,
    ) {
        let mut src = ascii;
        let at = at.min(src.len());
        src.splice(at..at, noise);
        assert_backends_agree(&src);
    }

    #[test]
    fn prop_strings_round_trip(s in "\\PC{0,80}") {
        for t in transcoders() {
            let mut utf16 = vec![0u8; s.len() * 2];
            let res = t.utf8_to_utf16be(s.as_bytes(), &mut utf16).unwrap();
            utf16.truncate(res.written);
            prop_assert_eq!(&utf16, &utf16be_from_str(&s));

            let mut back = vec![0u8; utf16.len() / 2 * 3];
            let res = t.utf16be_to_utf8(&utf16, &mut back).unwrap();
            prop_assert_eq!(&back[..res.written], s.as_bytes());
        }
    }

    #[test]
    fn prop_utf8_error_offset_matches_std(src in proptest::collection::vec(any::<u8>(), 0..160)) {
        let std_result = std::str::from_utf8(&src).map(|_| ()).map_err(|e| e.valid_up_to());
        for t in transcoders() {
            let ours = t.validate_utf8(&src).map_err(|e| e.offset().unwrap_or(usize::MAX));
            prop_assert_eq!(ours, std_result);
        }
    }

    #[test]
    fn prop_utf16_error_offset_matches_std(units in proptest::collection::vec(
        prop_oneof![0u16..0x80, 0xD7F0u16..0xE010, any::<u16>()], 0..80)
    ) {
        let std_result = char::decode_utf16(units.iter().copied())
            .position(|r| r.is_err());
        let mut expected = None;
        if let Some(bad) = std_result {
            // `decode_utf16` yields one item per scalar, map it back to a unit index.
            let mut idx = 0;
            for r in char::decode_utf16(units.iter().copied()).take(bad) {
                idx += r.map_or(1, char::len_utf16);
            }
            expected = Some(idx);
        }
        let src = utf16le_from_units(&units);
        for t in transcoders() {
            let ours = t.validate_utf16le(&src).err().and_then(|e| e.offset());
            prop_assert_eq!(ours, expected);
        }
    }
}
