// Compaq Internet Keyboard (SDM4540UL) userspace driver - shared library
// Configuration, uinput sink, report bridge and capture replay

pub mod bridge;
pub mod capture;
pub mod config;
pub mod virtual_keyboard;

pub use bridge::{Bridge, BridgeStats, PumpExit};
pub use capture::{CaptureError, CaptureStats, ReplayFilter, ReplayRecord};
pub use config::{DriverConfig, KeyOverrides, ReaderSettings};
pub use virtual_keyboard::{VirtualKeyboard, VirtualKeyboardError};
