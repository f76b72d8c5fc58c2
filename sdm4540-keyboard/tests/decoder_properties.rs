//! Decoder behaviour over whole report spaces

use sdm4540_keyboard::{
    classify, KeyCode, KeyEvent, KeyMapping, KeySource, KeyState, RawReport, ReportDecoder,
    SpecialKey,
};

// Every value either secondary byte takes for a button, plus "no bit"
const SECONDARY_VALUES: [u8; 8] = [0, 1, 2, 4, 8, 16, 32, 64];

fn decode_events(decoder: &ReportDecoder, bytes: [u8; 8]) -> Vec<KeyEvent> {
    let mut events = Vec::new();
    decoder
        .dispatch(&RawReport::new(bytes), &mut events)
        .unwrap();
    events
}

fn pair(code: u16) -> Vec<KeyEvent> {
    vec![
        KeyEvent::new(KeyCode(code), KeyState::Pressed),
        KeyEvent::new(KeyCode(code), KeyState::Released),
    ]
}

#[test]
fn scenarios() {
    let decoder = ReportDecoder::default();
    let cases: [([u8; 8], u16); 6] = [
        ([4, 0, 0, 16, 0, 0, 0, 0], 183),
        ([4, 0, 0, 32, 0, 0, 0, 0], 184),
        ([3, 0, 0, 0, 1, 0, 0, 0], 190),
        ([3, 0, 0, 0, 2, 0, 0, 0], 191),
        ([0, 0, 30, 0, 0, 0, 0, 0], 30),
        // Group 4 with no button bit falls through to byte 2
        ([4, 0, 0, 0, 0, 0, 0, 0], 0),
    ];
    for (bytes, code) in cases {
        assert_eq!(decode_events(&decoder, bytes), pair(code), "report {bytes:?}");
    }
}

#[test]
fn every_button_decodes_to_its_code() {
    let decoder = ReportDecoder::default();
    for key in SpecialKey::ALL {
        let sig = key.signature();
        let mut bytes = [0u8; 8];
        bytes[0] = sig.group;
        bytes[sig.index] = sig.value;
        // Byte 2 must not leak into a vendor button result
        bytes[2] = 0x1e;

        let events = decode_events(&decoder, bytes);
        assert_eq!(events, pair(key.default_key_code().code()), "{key}");
    }
}

#[test]
fn signatures_do_not_overlap() {
    for group in [3u8, 4] {
        for blue_bar in SECONDARY_VALUES {
            for side in SECONDARY_VALUES {
                let bytes = [group, 0, 0, blue_bar, side, 0, 0, 0];
                let report = RawReport::new(bytes);
                let matching: Vec<SpecialKey> = SpecialKey::ALL
                    .into_iter()
                    .filter(|k| k.signature().matches(&report))
                    .collect();
                assert!(matching.len() <= 1, "{bytes:?} matches {matching:?}");
                assert_eq!(classify(&report), matching.first().copied());
            }
        }
    }
}

#[test]
fn unmatched_reports_pass_byte_two_through() {
    let decoder = ReportDecoder::default();
    for group in [0u8, 1, 2, 5, 0xff] {
        for code in [0u8, 4, 0x28, 0x65, 0xff] {
            let bytes = [group, 0, code, 16, 1, 0, 0, 0];
            let decoded = decoder.decode(&RawReport::new(bytes));
            assert_eq!(decoded.source, KeySource::Passthrough);
            assert_eq!(decoded.code, KeyCode(code as u16));
        }
    }
}

#[test]
fn decoding_is_idempotent_and_order_independent() {
    let decoder = ReportDecoder::default();
    let x = [4, 0, 0, 64, 0, 0, 0, 0];
    let y = [3, 0, 0, 0, 1, 0, 0, 0];

    assert_eq!(decode_events(&decoder, x), decode_events(&decoder, x));

    let alone = decode_events(&decoder, y);
    let _ = decode_events(&decoder, x);
    assert_eq!(decode_events(&decoder, y), alone);
}

#[test]
fn custom_mapping_only_changes_its_button() {
    let mapping = KeyMapping::DEFAULT.with_override(SpecialKey::Help, KeyCode::HELP);
    let decoder = ReportDecoder::new(mapping);
    assert_eq!(
        decode_events(&decoder, [3, 0, 0, 0, 1, 0, 0, 0]),
        pair(KeyCode::HELP.code())
    );
    assert_eq!(decode_events(&decoder, [3, 0, 0, 0, 2, 0, 0, 0]), pair(191));
}
