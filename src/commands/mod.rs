//! Command handlers for the CLI application.
//!
//! - `run`: the driver loop (virtual keyboard + bridge)
//! - `decode`: offline decoding of hex reports and capture files
//! - `utility`: list, keymap, init-config

pub mod decode;
pub mod run;
pub mod utility;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use sdm4540_driver::DriverConfig;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Setup Ctrl+C handler and return running flag
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}

/// Load the configuration, falling back to defaults when the file is absent
pub fn load_config(path: &Path) -> anyhow::Result<DriverConfig> {
    if path.exists() {
        info!("Loading config from {}", path.display());
    }
    DriverConfig::load(path).with_context(|| format!("invalid config file {}", path.display()))
}

/// Explain how to get access to hidraw/uinput after a permission error
pub fn permission_hint() {
    // SAFETY: geteuid has no preconditions and cannot fail
    if unsafe { libc::geteuid() } == 0 {
        return;
    }
    warn!("Access to /dev/hidraw* and /dev/uinput usually needs a udev rule, e.g.:");
    warn!(
        "  SUBSYSTEM==\"hidraw\", ATTRS{{idVendor}}==\"049f\", ATTRS{{idProduct}}==\"000e\", TAG+=\"uaccess\""
    );
    warn!("  KERNEL==\"uinput\", GROUP=\"input\", MODE=\"0660\"");
}
