//! Vendor button signatures and their substitute key codes
//!
//! The nine buttons above the function row are reported with a group byte
//! at offset 0 and a single bit in byte 3 (blue bar) or byte 4 (help and
//! contact). The generic HID parser has no usage for them, so each one is
//! given a substitute Linux key code, `KEY_F13` to `KEY_F21` by default.

use std::fmt;
use std::str::FromStr;

use sdm4540_transport::protocol::{group, offset};
use sdm4540_transport::RawReport;
use serde::{Deserialize, Serialize};

use crate::error::KeyboardError;
use crate::keycode::{KeyCode, KEY_MAX};

/// Highest key code ordinary keys can produce on this keyboard
///
/// Boot keyboard reports carry HID usages up to 0x65 (Application key), and
/// those bytes are passed through unchanged.
pub const PASSTHROUGH_MAX: u16 = 0x65;

/// The vendor-specific buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialKey {
    Magnifier,
    Bullseye,
    Mail,
    Info,
    Logo,
    Marketplace,
    Media,
    Help,
    Contact,
}

impl SpecialKey {
    pub const COUNT: usize = 9;

    /// All buttons, in table order
    pub const ALL: [SpecialKey; Self::COUNT] = [
        SpecialKey::Magnifier,
        SpecialKey::Bullseye,
        SpecialKey::Mail,
        SpecialKey::Info,
        SpecialKey::Logo,
        SpecialKey::Marketplace,
        SpecialKey::Media,
        SpecialKey::Help,
        SpecialKey::Contact,
    ];

    /// Lowercase name, as used in the configuration file
    pub const fn label(self) -> &'static str {
        match self {
            SpecialKey::Magnifier => "magnifier",
            SpecialKey::Bullseye => "bullseye",
            SpecialKey::Mail => "mail",
            SpecialKey::Info => "info",
            SpecialKey::Logo => "logo",
            SpecialKey::Marketplace => "marketplace",
            SpecialKey::Media => "media",
            SpecialKey::Help => "help",
            SpecialKey::Contact => "contact",
        }
    }

    pub const fn default_key_code(self) -> KeyCode {
        match self {
            SpecialKey::Magnifier => KeyCode::F13,
            SpecialKey::Bullseye => KeyCode::F14,
            SpecialKey::Mail => KeyCode::F15,
            SpecialKey::Info => KeyCode::F16,
            SpecialKey::Logo => KeyCode::F17,
            SpecialKey::Marketplace => KeyCode::F18,
            SpecialKey::Media => KeyCode::F19,
            SpecialKey::Help => KeyCode::F20,
            SpecialKey::Contact => KeyCode::F21,
        }
    }

    /// Report signature identifying this button
    pub const fn signature(self) -> Signature {
        match self {
            SpecialKey::Magnifier => Signature::blue_bar(0x10),
            SpecialKey::Bullseye => Signature::blue_bar(0x20),
            SpecialKey::Mail => Signature::blue_bar(0x01),
            SpecialKey::Info => Signature::blue_bar(0x08),
            SpecialKey::Logo => Signature::blue_bar(0x04),
            SpecialKey::Marketplace => Signature::blue_bar(0x40),
            SpecialKey::Media => Signature::blue_bar(0x02),
            SpecialKey::Help => Signature::side(0x01),
            SpecialKey::Contact => Signature::side(0x02),
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SpecialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SpecialKey {
    type Err = KeyboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SpecialKey::ALL
            .into_iter()
            .find(|k| k.label() == wanted)
            .ok_or_else(|| KeyboardError::UnknownButton(s.to_string()))
    }
}

/// Group byte plus one secondary byte that must both match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Signature {
    pub group: u8,
    pub index: usize,
    pub value: u8,
}

impl Signature {
    const fn blue_bar(value: u8) -> Self {
        Self {
            group: group::BLUE_BAR,
            index: offset::BLUE_BAR,
            value,
        }
    }

    const fn side(value: u8) -> Self {
        Self {
            group: group::SIDE,
            index: offset::SIDE_BUTTONS,
            value,
        }
    }

    #[inline]
    pub fn matches(&self, report: &RawReport) -> bool {
        report.group() == self.group && report.byte(self.index) == self.value
    }
}

/// Classification table, checked top to bottom
const SIGNATURES: [(Signature, SpecialKey); SpecialKey::COUNT] = [
    (SpecialKey::Magnifier.signature(), SpecialKey::Magnifier),
    (SpecialKey::Bullseye.signature(), SpecialKey::Bullseye),
    (SpecialKey::Mail.signature(), SpecialKey::Mail),
    (SpecialKey::Info.signature(), SpecialKey::Info),
    (SpecialKey::Logo.signature(), SpecialKey::Logo),
    (SpecialKey::Marketplace.signature(), SpecialKey::Marketplace),
    (SpecialKey::Media.signature(), SpecialKey::Media),
    (SpecialKey::Help.signature(), SpecialKey::Help),
    (SpecialKey::Contact.signature(), SpecialKey::Contact),
];

/// Identify the vendor button a report belongs to, if any
pub fn classify(report: &RawReport) -> Option<SpecialKey> {
    SIGNATURES
        .iter()
        .find(|(sig, _)| sig.matches(report))
        .map(|(_, key)| *key)
}

/// Substitute key code for each vendor button
///
/// Built once before the decoder is constructed and never changed after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMapping {
    codes: [KeyCode; SpecialKey::COUNT],
}

impl KeyMapping {
    /// `KEY_F13` through `KEY_F21`
    pub const DEFAULT: KeyMapping = KeyMapping {
        codes: [
            SpecialKey::Magnifier.default_key_code(),
            SpecialKey::Bullseye.default_key_code(),
            SpecialKey::Mail.default_key_code(),
            SpecialKey::Info.default_key_code(),
            SpecialKey::Logo.default_key_code(),
            SpecialKey::Marketplace.default_key_code(),
            SpecialKey::Media.default_key_code(),
            SpecialKey::Help.default_key_code(),
            SpecialKey::Contact.default_key_code(),
        ],
    };

    pub fn set(&mut self, key: SpecialKey, code: KeyCode) {
        self.codes[key.index()] = code;
    }

    /// Builder form of [`KeyMapping::set`]
    pub fn with_override(mut self, key: SpecialKey, code: KeyCode) -> Self {
        self.set(key, code);
        self
    }

    #[inline]
    pub fn key_code(&self, key: SpecialKey) -> KeyCode {
        self.codes[key.index()]
    }

    /// Buttons with their signature and current code, in table order
    pub fn entries(&self) -> impl Iterator<Item = (SpecialKey, Signature, KeyCode)> + '_ {
        SIGNATURES
            .iter()
            .map(move |(sig, key)| (*key, *sig, self.key_code(*key)))
    }

    /// Every substitute code, in table order
    pub fn codes(&self) -> &[KeyCode] {
        &self.codes
    }

    /// Check the mapping can be emitted unambiguously
    ///
    /// Substitute codes must be distinct, non-zero, within `KEY_MAX` and above
    /// the range ordinary keys pass through.
    pub fn validate(&self) -> Result<(), KeyboardError> {
        for (i, key) in SpecialKey::ALL.iter().enumerate() {
            let code = self.key_code(*key);
            if code == KeyCode::RESERVED {
                return Err(KeyboardError::ReservedKeyCode {
                    button: key.label(),
                });
            }
            if code.code() > KEY_MAX {
                return Err(KeyboardError::OutOfRange {
                    button: key.label(),
                    code: code.code(),
                });
            }
            if code.code() <= PASSTHROUGH_MAX {
                return Err(KeyboardError::CollidesWithPassthrough {
                    button: key.label(),
                    code,
                    max: PASSTHROUGH_MAX,
                });
            }
            if let Some(other) = SpecialKey::ALL[..i]
                .iter()
                .find(|other| self.key_code(**other) == code)
            {
                return Err(KeyboardError::DuplicateKeyCode {
                    code,
                    first: other.label(),
                    second: key.label(),
                });
            }
        }
        Ok(())
    }
}

impl Default for KeyMapping {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_enum() {
        for (i, (sig, key)) in SIGNATURES.iter().enumerate() {
            assert_eq!(SpecialKey::ALL[i], *key);
            assert_eq!(key.signature(), *sig);
        }
    }

    #[test]
    fn test_default_codes_are_f13_to_f21() {
        let codes: Vec<u16> = KeyMapping::DEFAULT.codes().iter().map(|c| c.code()).collect();
        assert_eq!(codes, (183..=191).collect::<Vec<u16>>());
        KeyMapping::DEFAULT.validate().unwrap();
    }

    #[test]
    fn test_classify() {
        let report = RawReport::new([4, 0, 0, 0x40, 0, 0, 0, 0]);
        assert_eq!(classify(&report), Some(SpecialKey::Marketplace));
        let report = RawReport::new([3, 0, 0, 0, 0x02, 0, 0, 0]);
        assert_eq!(classify(&report), Some(SpecialKey::Contact));
        // Right bit, wrong byte
        let report = RawReport::new([3, 0, 0, 0x02, 0, 0, 0, 0]);
        assert_eq!(classify(&report), None);
        // Two bits at once is not a known button
        let report = RawReport::new([4, 0, 0, 0x11, 0, 0, 0, 0]);
        assert_eq!(classify(&report), None);
    }

    #[test]
    fn test_override() {
        let mapping = KeyMapping::DEFAULT.with_override(SpecialKey::Mail, KeyCode::MAIL);
        assert_eq!(mapping.key_code(SpecialKey::Mail), KeyCode::MAIL);
        assert_eq!(mapping.key_code(SpecialKey::Info), KeyCode::F16);
        mapping.validate().unwrap();
    }

    #[test]
    fn test_validate_duplicate() {
        let mapping = KeyMapping::DEFAULT.with_override(SpecialKey::Contact, KeyCode::F13);
        assert_eq!(
            mapping.validate(),
            Err(KeyboardError::DuplicateKeyCode {
                code: KeyCode::F13,
                first: "magnifier",
                second: "contact",
            })
        );
    }

    #[test]
    fn test_validate_reserved_and_passthrough() {
        let mapping = KeyMapping::DEFAULT.with_override(SpecialKey::Help, KeyCode::RESERVED);
        assert!(matches!(
            mapping.validate(),
            Err(KeyboardError::ReservedKeyCode { button: "help" })
        ));

        let mapping = KeyMapping::DEFAULT.with_override(SpecialKey::Logo, KeyCode(30));
        assert!(matches!(
            mapping.validate(),
            Err(KeyboardError::CollidesWithPassthrough { button: "logo", .. })
        ));

        let mapping = KeyMapping::DEFAULT.with_override(SpecialKey::Logo, KeyCode(KEY_MAX + 1));
        assert!(matches!(
            mapping.validate(),
            Err(KeyboardError::OutOfRange { button: "logo", .. })
        ));
    }

    #[test]
    fn test_button_from_str() {
        assert_eq!("Bullseye".parse::<SpecialKey>(), Ok(SpecialKey::Bullseye));
        assert!(matches!(
            "volume".parse::<SpecialKey>(),
            Err(KeyboardError::UnknownButton(_))
        ));
    }
}
