//! Linux input key codes
//!
//! Values follow `include/uapi/linux/input-event-codes.h`. Only the codes the
//! driver emits by name are listed; any other code can still be used
//! numerically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KeyboardError;

/// Highest valid key code (`KEY_MAX`)
pub const KEY_MAX: u16 = 0x2ff;

/// A key code in the Linux input subsystem's `EV_KEY` space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const RESERVED: KeyCode = KeyCode(0);
    pub const HELP: KeyCode = KeyCode(138);
    pub const WWW: KeyCode = KeyCode(150);
    pub const MAIL: KeyCode = KeyCode(155);
    pub const HOMEPAGE: KeyCode = KeyCode(172);
    pub const F13: KeyCode = KeyCode(183);
    pub const F14: KeyCode = KeyCode(184);
    pub const F15: KeyCode = KeyCode(185);
    pub const F16: KeyCode = KeyCode(186);
    pub const F17: KeyCode = KeyCode(187);
    pub const F18: KeyCode = KeyCode(188);
    pub const F19: KeyCode = KeyCode(189);
    pub const F20: KeyCode = KeyCode(190);
    pub const F21: KeyCode = KeyCode(191);
    pub const F22: KeyCode = KeyCode(192);
    pub const F23: KeyCode = KeyCode(193);
    pub const F24: KeyCode = KeyCode(194);
    pub const PROG3: KeyCode = KeyCode(202);
    pub const PROG4: KeyCode = KeyCode(203);
    pub const EMAIL: KeyCode = KeyCode(215);
    pub const SEARCH: KeyCode = KeyCode(217);
    pub const SHOP: KeyCode = KeyCode(221);
    pub const MEDIA: KeyCode = KeyCode(226);
    pub const INFO: KeyCode = KeyCode(358);
    pub const ADDRESSBOOK: KeyCode = KeyCode(429);

    /// Numeric value
    #[inline]
    pub const fn code(self) -> u16 {
        self.0
    }

    /// `KEY_*` name, if the code is one of the named ones
    pub fn name(self) -> Option<&'static str> {
        NAMES
            .iter()
            .find(|(_, code)| *code == self)
            .map(|(name, _)| *name)
    }

    /// Look up a code by name
    ///
    /// Accepts `KEY_F13`, `F13` and `f13`.
    pub fn from_name(name: &str) -> Option<KeyCode> {
        let upper = name.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("KEY_").unwrap_or(&upper);
        NAMES
            .iter()
            .find(|(n, _)| n.strip_prefix("KEY_") == Some(bare))
            .map(|(_, code)| *code)
    }
}

impl From<u8> for KeyCode {
    fn from(code: u8) -> Self {
        KeyCode(code as u16)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Parses a key name (see [`KeyCode::from_name`]) or a decimal code
impl FromStr for KeyCode {
    type Err = KeyboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(code) = KeyCode::from_name(s) {
            return Ok(code);
        }
        s.trim()
            .parse::<u16>()
            .map(KeyCode)
            .map_err(|_| KeyboardError::UnknownKeyName(s.to_string()))
    }
}

const NAMES: &[(&str, KeyCode)] = &[
    ("KEY_RESERVED", KeyCode::RESERVED),
    ("KEY_HELP", KeyCode::HELP),
    ("KEY_WWW", KeyCode::WWW),
    ("KEY_MAIL", KeyCode::MAIL),
    ("KEY_HOMEPAGE", KeyCode::HOMEPAGE),
    ("KEY_F13", KeyCode::F13),
    ("KEY_F14", KeyCode::F14),
    ("KEY_F15", KeyCode::F15),
    ("KEY_F16", KeyCode::F16),
    ("KEY_F17", KeyCode::F17),
    ("KEY_F18", KeyCode::F18),
    ("KEY_F19", KeyCode::F19),
    ("KEY_F20", KeyCode::F20),
    ("KEY_F21", KeyCode::F21),
    ("KEY_F22", KeyCode::F22),
    ("KEY_F23", KeyCode::F23),
    ("KEY_F24", KeyCode::F24),
    ("KEY_PROG3", KeyCode::PROG3),
    ("KEY_PROG4", KeyCode::PROG4),
    ("KEY_EMAIL", KeyCode::EMAIL),
    ("KEY_SEARCH", KeyCode::SEARCH),
    ("KEY_SHOP", KeyCode::SHOP),
    ("KEY_MEDIA", KeyCode::MEDIA),
    ("KEY_INFO", KeyCode::INFO),
    ("KEY_ADDRESSBOOK", KeyCode::ADDRESSBOOK),
];

// ---------------------------------------------------------------------------
// Serde: named codes as `"KEY_F13"`, others as plain numbers
// ---------------------------------------------------------------------------

impl Serialize for KeyCode {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.name() {
            Some(name) => s.serialize_str(name),
            None => s.serialize_u16(self.0),
        }
    }
}

impl<'de> Deserialize<'de> for KeyCode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum KeyCodeRepr {
            Code(u16),
            Name(String),
        }

        match KeyCodeRepr::deserialize(d)? {
            KeyCodeRepr::Code(code) => Ok(KeyCode(code)),
            KeyCodeRepr::Name(name) => name.parse::<KeyCode>().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_key_values() {
        // Consecutive in input-event-codes.h
        assert_eq!(KeyCode::F13.code(), 183);
        assert_eq!(KeyCode::F21.code(), 191);
        assert_eq!(KeyCode::F24.code(), 194);
    }

    #[test]
    fn test_name_lookup() {
        assert_eq!(KeyCode::F15.name(), Some("KEY_F15"));
        assert_eq!(KeyCode(30).name(), None);
        assert_eq!(KeyCode::from_name("KEY_F20"), Some(KeyCode::F20));
        assert_eq!(KeyCode::from_name("f20"), Some(KeyCode::F20));
        assert_eq!(KeyCode::from_name(" key_search "), Some(KeyCode::SEARCH));
        assert_eq!(KeyCode::from_name("KEY_DOES_NOT_EXIST"), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("KEY_MAIL".parse::<KeyCode>(), Ok(KeyCode::MAIL));
        assert_eq!("200".parse::<KeyCode>(), Ok(KeyCode(200)));
        assert_eq!(
            "KEY_NOPE".parse::<KeyCode>(),
            Err(KeyboardError::UnknownKeyName("KEY_NOPE".to_string()))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyCode::F13.to_string(), "KEY_F13");
        assert_eq!(KeyCode::from(30u8).to_string(), "30");
    }

    #[test]
    fn test_names_are_unique() {
        for (i, (name_a, code_a)) in NAMES.iter().enumerate() {
            for (name_b, code_b) in &NAMES[i + 1..] {
                assert_ne!(name_a, name_b);
                assert_ne!(code_a, code_b, "{name_a} and {name_b} share a code");
            }
        }
        assert!(NAMES.iter().all(|(_, c)| c.code() <= KEY_MAX));
    }
}
