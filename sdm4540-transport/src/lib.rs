//! Transport layer for the Compaq Internet Keyboard (SDM4540UL)
//!
//! Finds the keyboard by its USB vendor/product id, opens every one of its
//! hidraw interfaces and delivers the raw 8-byte input reports, timestamped,
//! through the [`Transport`] trait. Hot-plug notifications come from udev
//! (feature `hotplug`).

pub mod device_registry;
pub mod error;
pub mod protocol;
pub mod report_reader;
pub mod types;

mod discovery;
mod hid_input;

pub use device_registry::{is_supported, PRODUCT_ID, PRODUCT_NAME, VENDOR_ID};
pub use error::{ReportParseError, TransportError};
pub use protocol::{RawReport, REPORT_SIZE};
pub use report_reader::{normalize_report, ReaderConfig};
pub use types::{
    DiscoveredDevice, DiscoveryEvent, HidInterfaceInfo, HotplugDevice, TimestampedReport,
    TransportDeviceInfo,
};

pub use discovery::{parse_hid_id, DeviceDiscovery, HidDiscovery};
pub use hid_input::HidInputTransport;

use async_trait::async_trait;

/// The core transport trait
///
/// Delivers raw input reports from the keyboard, in arrival order.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Wait for the next input report
    ///
    /// # Arguments
    /// * `timeout_ms` - Timeout in milliseconds
    ///
    /// # Returns
    /// `None` on timeout, `Some(report)` if a report arrived,
    /// `TransportError::Disconnected` once no interface can deliver more
    async fn read_report(&self, timeout_ms: u32)
        -> Result<Option<TimestampedReport>, TransportError>;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Check if transport is still connected
    async fn is_connected(&self) -> bool;

    /// Close the transport gracefully
    async fn close(&self) -> Result<(), TransportError>;
}
