//! Key events and the sink they are delivered to

use std::convert::Infallible;

use serde::Serialize;

use crate::keycode::KeyCode;

/// Key state, with the `EV_KEY` value it is written as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyState {
    Released = 0,
    Pressed = 1,
}

impl KeyState {
    #[inline]
    pub const fn value(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub state: KeyState,
}

impl KeyEvent {
    pub const fn new(code: KeyCode, state: KeyState) -> Self {
        Self { code, state }
    }
}

/// Receiver of decoded key events
///
/// Events must be forwarded in the order `emit` is called.
pub trait EventSink {
    type Error;

    fn emit(&mut self, event: KeyEvent) -> Result<(), Self::Error>;
}

/// Collects events, used for offline decoding and tests
impl EventSink for Vec<KeyEvent> {
    type Error = Infallible;

    fn emit(&mut self, event: KeyEvent) -> Result<(), Self::Error> {
        self.push(event);
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    type Error = S::Error;

    fn emit(&mut self, event: KeyEvent) -> Result<(), Self::Error> {
        (**self).emit(event)
    }
}
