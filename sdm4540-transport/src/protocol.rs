//! Wire format of the SDM4540UL input reports
//!
//! The keyboard exposes a boot-protocol keyboard interface and a second
//! interface carrying the vendor buttons. Both deliver fixed 8-byte input
//! reports. For the vendor buttons, byte 0 is a report group (3 or 4) and one
//! bit in byte 3 or byte 4 identifies the button that was pressed.
//!
//! ```text
//! Offset  Meaning
//! 0       group byte (3 = side buttons, 4 = blue bar, other = standard report)
//! 2       key code of the first pressed standard key
//! 3       blue-bar button bitmask (group 4)
//! 4       side button bitmask (group 3)
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{ReportParseError, TransportError};

/// Size of one input report
pub const REPORT_SIZE: usize = 8;

/// Byte offsets inside an input report
pub mod offset {
    /// Report group byte
    pub const GROUP: usize = 0;
    /// Key code of a standard key
    pub const KEY_CODE: usize = 2;
    /// Bitmask of the seven blue-bar buttons (group 4)
    pub const BLUE_BAR: usize = 3;
    /// Bitmask of the help/contact buttons (group 3)
    pub const SIDE_BUTTONS: usize = 4;
}

/// Values of the group byte used by vendor button reports
pub mod group {
    /// Help and contact buttons right of the blue bar
    pub const SIDE: u8 = 3;
    /// The seven buttons on the blue bar
    pub const BLUE_BAR: u8 = 4;
}

/// One raw input report, exactly as delivered by the device
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(transparent)]
pub struct RawReport([u8; REPORT_SIZE]);

impl RawReport {
    /// Wrap an 8-byte buffer
    pub const fn new(bytes: [u8; REPORT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Convert a buffer read from the device.
    ///
    /// The buffer must be exactly `REPORT_SIZE` bytes long.
    pub fn from_slice(data: &[u8]) -> Result<Self, TransportError> {
        Self::read_from_bytes(data).map_err(|_| TransportError::MalformedReport {
            expected: REPORT_SIZE,
            actual: data.len(),
        })
    }

    /// Byte at `index`.
    ///
    /// # Panics
    /// If `index >= REPORT_SIZE`.
    #[inline]
    pub fn byte(&self, index: usize) -> u8 {
        self.0[index]
    }

    /// Report group byte (offset 0)
    #[inline]
    pub fn group(&self) -> u8 {
        self.0[offset::GROUP]
    }

    /// Standard key code byte (offset 2)
    #[inline]
    pub fn key_code(&self) -> u8 {
        self.0[offset::KEY_CODE]
    }

    /// The raw bytes
    pub fn bytes(&self) -> &[u8; REPORT_SIZE] {
        &self.0
    }
}

impl From<[u8; REPORT_SIZE]> for RawReport {
    fn from(bytes: [u8; REPORT_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for RawReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Parses hex text such as `04 00 00 10 00 00 00 00`, `04:00:00:10:00:00:00:00`,
/// `0x04,0x00,...` or the compact `0400001000000000`.
impl FromStr for RawReport {
    type Err = ReportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let is_separator = |c: char| c.is_whitespace() || matches!(c, ',' | ':' | '-');

        let bytes: Vec<u8> = if s.contains(is_separator) {
            s.split(is_separator)
                .filter(|tok| !tok.is_empty())
                .map(|tok| {
                    let digits = strip_hex_prefix(tok);
                    if digits.is_empty() || digits.len() > 2 {
                        return Err(ReportParseError::InvalidHex(tok.to_string()));
                    }
                    u8::from_str_radix(digits, 16)
                        .map_err(|_| ReportParseError::InvalidHex(tok.to_string()))
                })
                .collect::<Result<_, _>>()?
        } else {
            let digits = strip_hex_prefix(s);
            if digits.len() % 2 != 0 || !digits.is_ascii() {
                return Err(ReportParseError::InvalidHex(s.to_string()));
            }
            (0..digits.len())
                .step_by(2)
                .map(|i| {
                    u8::from_str_radix(&digits[i..i + 2], 16)
                        .map_err(|_| ReportParseError::InvalidHex(digits[i..i + 2].to_string()))
                })
                .collect::<Result<_, _>>()?
        };

        let array: [u8; REPORT_SIZE] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ReportParseError::WrongLength {
                    expected: REPORT_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
