//! Transport error types

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device disconnected")]
    Disconnected,

    /// The device delivered a report whose length is not `REPORT_SIZE`
    #[error("Malformed input report: expected {expected} bytes, got {actual}")]
    MalformedReport { expected: usize, actual: usize },

    // HID-specific errors
    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),

    #[error("Hot-plug monitor error: {0}")]
    Hotplug(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") || msg.contains("EACCES") {
            TransportError::HidPermissionDenied(msg)
        } else {
            TransportError::HidError(msg)
        }
    }
}

/// Errors from parsing a report written as hex text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportParseError {
    #[error("Invalid hex byte: {0:?}")]
    InvalidHex(String),

    #[error("Wrong report length: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}
