//! Common types for transport layer

use std::path::PathBuf;

use serde::Serialize;

use crate::protocol::RawReport;

/// One HID interface (hidraw node) of the keyboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HidInterfaceInfo {
    /// hidapi device path (e.g. `/dev/hidraw3`)
    pub path: String,
    /// USB interface number, -1 if unknown
    pub interface_number: i32,
    /// Top-level usage page from the report descriptor
    pub usage_page: u16,
    /// Top-level usage from the report descriptor
    pub usage: u16,
}

/// Device identification information
#[derive(Debug, Clone, Serialize)]
pub struct TransportDeviceInfo {
    /// USB Vendor ID
    pub vid: u16,
    /// USB Product ID
    pub pid: u16,
    /// Serial number if available
    pub serial: Option<String>,
    /// Product name if available
    pub product_name: Option<String>,
    /// Manufacturer name if available
    pub manufacturer: Option<String>,
    /// All HID interfaces belonging to this keyboard
    pub interfaces: Vec<HidInterfaceInfo>,
}

/// Discovered device that can be opened
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// Device information
    pub info: TransportDeviceInfo,
}

/// A udev device node reported by the hot-plug monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotplugDevice {
    /// sysfs path of the hidraw device
    pub syspath: PathBuf,
    /// `/dev/hidrawN` node, if udev reported one
    pub devnode: Option<PathBuf>,
}

/// Discovery events for hot-plug support
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A hidraw node of the keyboard appeared
    DeviceAdded(HotplugDevice),
    /// A hidraw node of the keyboard (or of an unidentifiable device) went away
    DeviceRemoved(HotplugDevice),
}

/// Input report with the time it was read
#[derive(Debug, Clone, Copy)]
pub struct TimestampedReport {
    /// Seconds since the transport was opened
    pub timestamp: f64,
    /// USB interface the report arrived on
    pub interface_number: i32,
    /// The report itself
    pub report: RawReport,
}

impl TimestampedReport {
    pub fn new(timestamp: f64, interface_number: i32, report: RawReport) -> Self {
        Self {
            timestamp,
            interface_number,
            report,
        }
    }
}
