//! Virtual keyboard device using evdev/uinput
//!
//! Decoded key events are written to a uinput device, where they appear to
//! the desktop like events from any other keyboard.

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AttributeSet, BusType, EventType, InputEvent, InputId, Key,
};
use thiserror::Error;

use sdm4540_keyboard::{EventSink, KeyEvent, KeyMapping};
use sdm4540_transport::{PRODUCT_ID, VENDOR_ID};

/// Errors from virtual keyboard operations
#[derive(Debug, Error)]
pub enum VirtualKeyboardError {
    #[error("Failed to create virtual device: {0}")]
    CreateDevice(#[source] std::io::Error),
    #[error("Failed to emit event: {0}")]
    EmitEvent(#[source] std::io::Error),
}

/// Key codes the device must advertise for `mapping`
///
/// Every byte value an ordinary key can pass through, plus the substitutes.
pub fn supported_keys(mapping: &KeyMapping) -> Vec<u16> {
    let mut codes: Vec<u16> = (1..=u8::MAX as u16).collect();
    for code in mapping.codes() {
        if !codes.contains(&code.code()) {
            codes.push(code.code());
        }
    }
    codes
}

/// Virtual keyboard device
pub struct VirtualKeyboard {
    device: VirtualDevice,
}

impl VirtualKeyboard {
    /// Create a new virtual keyboard device
    ///
    /// # Arguments
    /// * `name` - Device name (shown in `evtest` and `libinput list-devices`)
    /// * `mapping` - Substitute codes that must be emittable
    pub fn new(name: &str, mapping: &KeyMapping) -> Result<Self, VirtualKeyboardError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in supported_keys(mapping) {
            keys.insert(Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(VirtualKeyboardError::CreateDevice)?
            .name(name)
            .input_id(InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, 1))
            .with_keys(&keys)
            .map_err(VirtualKeyboardError::CreateDevice)?
            .build()
            .map_err(VirtualKeyboardError::CreateDevice)?;

        Ok(Self { device })
    }

    /// Get the device path (e.g., /dev/input/eventX)
    pub fn device_path(&mut self) -> Option<std::path::PathBuf> {
        self.device
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }
}

impl EventSink for VirtualKeyboard {
    type Error = VirtualKeyboardError;

    /// Writes one key event followed by a sync report
    fn emit(&mut self, event: KeyEvent) -> Result<(), Self::Error> {
        let input = InputEvent::new_now(EventType::KEY, event.code.code(), event.state.value());
        self.device
            .emit(&[input])
            .map_err(VirtualKeyboardError::EmitEvent)
    }
}
