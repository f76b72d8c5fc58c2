//! Report decoding for the Compaq Internet Keyboard (SDM4540UL)
//!
//! Turns raw 8-byte input reports into key press/release pairs. The nine
//! vendor buttons get substitute key codes from a [`KeyMapping`]; every other
//! report passes its key code byte through. Output goes to any [`EventSink`].

pub mod decoder;
pub mod error;
pub mod event;
pub mod keycode;
pub mod keymap;

pub use decoder::{Decoded, KeySource, ReportDecoder};
pub use error::KeyboardError;
pub use event::{EventSink, KeyEvent, KeyState};
pub use keycode::{KeyCode, KEY_MAX};
pub use keymap::{classify, KeyMapping, Signature, SpecialKey, PASSTHROUGH_MAX};

pub use sdm4540_transport::RawReport;
