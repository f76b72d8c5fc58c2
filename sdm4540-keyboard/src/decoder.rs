//! Raw report decoder
//!
//! Every report becomes exactly one key code, emitted as a press followed
//! immediately by a release. Vendor buttons are looked up in the signature
//! table; anything else passes the byte at offset 2 through untouched.

use sdm4540_transport::RawReport;
use serde::Serialize;
use tracing::debug;

use crate::event::{EventSink, KeyEvent, KeyState};
use crate::keycode::KeyCode;
use crate::keymap::{classify, KeyMapping, SpecialKey};

/// Where a decoded key code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "button")]
pub enum KeySource {
    /// A vendor button, replaced by its substitute code
    Special(SpecialKey),
    /// Byte 2 of the report, unchanged
    Passthrough,
}

/// Result of decoding one report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decoded {
    pub code: KeyCode,
    pub source: KeySource,
}

impl Decoded {
    /// Press then release of the decoded code
    pub fn events(&self) -> [KeyEvent; 2] {
        [
            KeyEvent::new(self.code, KeyState::Pressed),
            KeyEvent::new(self.code, KeyState::Released),
        ]
    }
}

/// Stateless report decoder
#[derive(Debug, Clone, Default)]
pub struct ReportDecoder {
    mapping: KeyMapping,
}

impl ReportDecoder {
    pub fn new(mapping: KeyMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &KeyMapping {
        &self.mapping
    }

    /// Decode a report without emitting anything
    pub fn decode(&self, report: &RawReport) -> Decoded {
        match classify(report) {
            Some(key) => Decoded {
                code: self.mapping.key_code(key),
                source: KeySource::Special(key),
            },
            None => Decoded {
                code: KeyCode::from(report.key_code()),
                source: KeySource::Passthrough,
            },
        }
    }

    /// Decode a report and forward its press/release pair to `sink`
    ///
    /// Stops at the first sink error; the release is not sent if the press
    /// failed.
    pub fn dispatch<S: EventSink>(
        &self,
        report: &RawReport,
        sink: &mut S,
    ) -> Result<Decoded, S::Error> {
        let decoded = self.decode(report);
        debug!("{} -> {} ({:?})", report, decoded.code, decoded.source);
        for event in decoded.events() {
            sink.emit(event)?;
        }
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink {
        calls: usize,
    }

    impl EventSink for FailingSink {
        type Error = &'static str;

        fn emit(&mut self, _event: KeyEvent) -> Result<(), Self::Error> {
            self.calls += 1;
            Err("device gone")
        }
    }

    #[test]
    fn test_decode_special() {
        let decoder = ReportDecoder::default();
        let decoded = decoder.decode(&RawReport::new([4, 0, 0, 8, 0, 0, 0, 0]));
        assert_eq!(decoded.code, KeyCode::F16);
        assert_eq!(decoded.source, KeySource::Special(SpecialKey::Info));
    }

    #[test]
    fn test_decode_passthrough() {
        let decoder = ReportDecoder::default();
        let decoded = decoder.decode(&RawReport::new([0, 0, 0x2c, 0, 0, 0, 0, 0]));
        assert_eq!(decoded.code, KeyCode(0x2c));
        assert_eq!(decoded.source, KeySource::Passthrough);
    }

    #[test]
    fn test_dispatch_uses_mapping() {
        let mapping = KeyMapping::DEFAULT.with_override(SpecialKey::Media, KeyCode::MEDIA);
        let decoder = ReportDecoder::new(mapping);
        let mut events = Vec::new();
        decoder
            .dispatch(&RawReport::new([4, 0, 0, 2, 0, 0, 0, 0]), &mut events)
            .unwrap();
        assert_eq!(
            events,
            vec![
                KeyEvent::new(KeyCode::MEDIA, KeyState::Pressed),
                KeyEvent::new(KeyCode::MEDIA, KeyState::Released),
            ]
        );
    }

    #[test]
    fn test_dispatch_stops_on_sink_error() {
        let decoder = ReportDecoder::default();
        let mut sink = FailingSink { calls: 0 };
        let result = decoder.dispatch(&RawReport::new([3, 0, 0, 0, 1, 0, 0, 0]), &mut sink);
        assert_eq!(result, Err("device gone"));
        assert_eq!(sink.calls, 1);
    }

    #[test]
    fn test_state_values() {
        assert_eq!(KeyState::Pressed.value(), 1);
        assert_eq!(KeyState::Released.value(), 0);
    }
}
