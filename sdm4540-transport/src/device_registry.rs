//! Device registry - the one keyboard this driver binds to
//!
//! Only the exact vendor/product pairing below is supported. Other Compaq
//! keyboards use different report layouts and are left to the generic
//! HID driver.

/// Compaq vendor ID
pub const VENDOR_ID: u16 = 0x049F;

/// Compaq Internet Keyboard SDM4540UL product ID
pub const PRODUCT_ID: u16 = 0x000E;

/// Human-readable device name
pub const PRODUCT_NAME: &str = "Compaq Internet Keyboard (SDM4540UL)";

/// Check if a VID/PID pair is the supported keyboard
#[inline]
pub fn is_supported(vid: u16, pid: u16) -> bool {
    vid == VENDOR_ID && pid == PRODUCT_ID
}
