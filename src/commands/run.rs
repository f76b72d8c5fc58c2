//! The driver loop

use std::time::Duration;

use tracing::info;

use sdm4540_driver::bridge::{self, Bridge};
use sdm4540_driver::{DriverConfig, VirtualKeyboard, VirtualKeyboardError};
use sdm4540_keyboard::ReportDecoder;
use sdm4540_transport::{HidDiscovery, TransportError};

use super::{permission_hint, setup_interrupt_handler, CommandResult};

/// Create the virtual keyboard and feed it from the physical one until Ctrl+C
pub async fn run(config: &DriverConfig) -> CommandResult {
    let mapping = config.key_mapping()?;

    let mut keyboard = match VirtualKeyboard::new(&config.device_name, &mapping) {
        Ok(k) => k,
        Err(e @ VirtualKeyboardError::CreateDevice(_)) => {
            permission_hint();
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    info!("Created virtual keyboard: {}", config.device_name);
    if let Some(path) = keyboard.device_path() {
        info!("Device path: {}", path.display());
    }

    let running = setup_interrupt_handler();
    let discovery = HidDiscovery::with_reader_config(config.reader_config());
    let mut bridge = Bridge::new(ReportDecoder::new(mapping), keyboard);

    info!("Entering main loop. Press Ctrl+C to exit.");
    let rescan = Duration::from_millis(config.rescan_interval_ms.max(100));
    match bridge::run(&mut bridge, &discovery, &running, rescan).await {
        Ok(()) => Ok(()),
        Err(e @ TransportError::HidPermissionDenied(_)) => {
            permission_hint();
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
