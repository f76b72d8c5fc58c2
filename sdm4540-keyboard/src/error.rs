//! Keyboard crate error types

use thiserror::Error;

use crate::keycode::KeyCode;

/// Errors from building a key mapping
///
/// Decoding itself cannot fail; only the mapping handed to the decoder is
/// checked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyboardError {
    /// Two buttons were given the same substitute code
    #[error("Key code {code} assigned to both {first} and {second}")]
    DuplicateKeyCode {
        code: KeyCode,
        first: &'static str,
        second: &'static str,
    },

    /// `KEY_RESERVED` cannot be emitted for a button
    #[error("Button {button} mapped to reserved key code 0")]
    ReservedKeyCode { button: &'static str },

    /// Substitute code is also produced by ordinary keys
    #[error("Key code {code} for {button} collides with ordinary key codes (0..={max})")]
    CollidesWithPassthrough {
        button: &'static str,
        code: KeyCode,
        max: u16,
    },

    /// Substitute code above `KEY_MAX`
    #[error("Key code {code} for {button} is out of range")]
    OutOfRange { button: &'static str, code: u16 },

    /// Name not found in the key code table
    #[error("Unknown key name: {0}")]
    UnknownKeyName(String),

    /// Button name not recognised
    #[error("Unknown button: {0}")]
    UnknownButton(String),
}
