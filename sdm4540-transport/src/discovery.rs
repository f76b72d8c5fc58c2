//! Device discovery and hot-plug monitoring for the SDM4540UL

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use hidapi::HidApi;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::device_registry;
use crate::error::TransportError;
use crate::hid_input::HidInputTransport;
use crate::report_reader::ReaderConfig;
use crate::types::{DiscoveredDevice, DiscoveryEvent, HidInterfaceInfo, TransportDeviceInfo};
use crate::Transport;

/// Device discovery abstraction
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// List currently available devices
    async fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError>;

    /// Open a specific device
    async fn open_device(
        &self,
        device: &DiscoveredDevice,
    ) -> Result<Arc<dyn Transport>, TransportError>;

    /// Subscribe to hot-plug events
    ///
    /// The channel closes when the monitor stops.
    async fn watch(&self) -> Result<broadcast::Receiver<DiscoveryEvent>, TransportError>;
}

/// HID discovery over hidapi
pub struct HidDiscovery {
    /// Reader configuration handed to every opened transport
    reader_config: ReaderConfig,
}

impl Default for HidDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl HidDiscovery {
    /// Create a new HID discovery instance
    pub fn new() -> Self {
        Self::with_reader_config(ReaderConfig::default())
    }

    /// Create with a custom reader loop configuration
    pub fn with_reader_config(reader_config: ReaderConfig) -> Self {
        Self { reader_config }
    }

    /// Collect the keyboard's interfaces from the hidapi device list
    ///
    /// hidapi may list one interface several times (once per top-level usage on
    /// some backends), so entries are de-duplicated by path.
    fn collect_interfaces(api: &HidApi) -> Vec<(HidInterfaceInfo, &hidapi::DeviceInfo)> {
        let mut seen = HashSet::new();
        api.device_list()
            .filter(|d| device_registry::is_supported(d.vendor_id(), d.product_id()))
            .filter(|d| seen.insert(d.path().to_owned()))
            .map(|d| {
                (
                    HidInterfaceInfo {
                        path: d.path().to_string_lossy().to_string(),
                        interface_number: d.interface_number(),
                        usage_page: d.usage_page(),
                        usage: d.usage(),
                    },
                    d,
                )
            })
            .collect()
    }
}

#[async_trait]
impl DeviceDiscovery for HidDiscovery {
    async fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let api = HidApi::new()?;
        let interfaces = Self::collect_interfaces(&api);

        // All matching interfaces are treated as one keyboard. Decoding is
        // stateless, so two identical keyboards sharing one decoder is harmless.
        let Some((_, first)) = interfaces.first() else {
            info!("Found 0 devices");
            return Ok(Vec::new());
        };

        let info = TransportDeviceInfo {
            vid: first.vendor_id(),
            pid: first.product_id(),
            serial: first.serial_number().map(|s| s.to_string()),
            product_name: first.product_string().map(|s| s.to_string()),
            manufacturer: first.manufacturer_string().map(|s| s.to_string()),
            interfaces: interfaces.iter().map(|(iface, _)| iface.clone()).collect(),
        };

        for iface in &info.interfaces {
            debug!(
                "Found interface {} usage {:04X}:{:04X} path={}",
                iface.interface_number, iface.usage_page, iface.usage, iface.path
            );
        }
        info!(
            "Found {:04X}:{:04X} with {} interfaces",
            info.vid,
            info.pid,
            info.interfaces.len()
        );

        Ok(vec![DiscoveredDevice { info }])
    }

    async fn open_device(
        &self,
        device: &DiscoveredDevice,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        let api = HidApi::new()?;
        let available = Self::collect_interfaces(&api);

        let mut opened = Vec::new();
        let mut last_error = None;
        for iface in &device.info.interfaces {
            let Some((_, hid_info)) = available.iter().find(|(a, _)| a.path == iface.path) else {
                debug!("Interface {} vanished before open", iface.path);
                continue;
            };
            match hid_info.open_device(&api) {
                Ok(handle) => opened.push((iface.clone(), handle)),
                Err(e) => {
                    warn!("Failed to open {}: {}", iface.path, e);
                    last_error = Some(TransportError::from(e));
                }
            }
        }

        if opened.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                TransportError::DeviceNotFound(format!(
                    "{:04X}:{:04X}",
                    device.info.vid, device.info.pid
                ))
            }));
        }

        info!(
            "Opened {} of {} interfaces of {:04X}:{:04X}",
            opened.len(),
            device.info.interfaces.len(),
            device.info.vid,
            device.info.pid
        );

        let transport =
            HidInputTransport::new(opened, device.info.clone(), self.reader_config.clone())?;
        Ok(Arc::new(transport))
    }

    async fn watch(&self) -> Result<broadcast::Receiver<DiscoveryEvent>, TransportError> {
        #[cfg(all(target_os = "linux", feature = "hotplug"))]
        {
            // The monitor thread owns the only sender
            let (tx, rx) = broadcast::channel(16);
            hotplug::spawn_monitor(tx)?;
            Ok(rx)
        }
        #[cfg(not(all(target_os = "linux", feature = "hotplug")))]
        {
            Err(TransportError::Hotplug(
                "not available in this build".to_string(),
            ))
        }
    }
}

/// Parse a udev `HID_ID` property (`BBBB:VVVVVVVV:PPPPPPPP`)
///
/// Returns `(bus, vendor id, product id)`.
pub fn parse_hid_id(value: &str) -> Option<(u16, u16, u16)> {
    let mut parts = value.trim().split(':');
    let bus = u32::from_str_radix(parts.next()?, 16).ok()?;
    let vid = u32::from_str_radix(parts.next()?, 16).ok()?;
    let pid = u32::from_str_radix(parts.next()?, 16).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((
        u16::try_from(bus).ok()?,
        u16::try_from(vid).ok()?,
        u16::try_from(pid).ok()?,
    ))
}

#[cfg(all(target_os = "linux", feature = "hotplug"))]
mod hotplug {
    use futures::StreamExt;
    use tokio::sync::broadcast;
    use tokio_udev::{AsyncMonitorSocket, EventType, MonitorBuilder};
    use tracing::{debug, warn};

    use super::parse_hid_id;
    use crate::device_registry;
    use crate::error::TransportError;
    use crate::types::{DiscoveryEvent, HotplugDevice};

    fn udev_err(e: std::io::Error) -> TransportError {
        TransportError::Hotplug(e.to_string())
    }

    /// Start the udev monitor on its own thread
    ///
    /// The monitor socket is driven by a current-thread runtime so the caller's
    /// runtime never has to hold udev handles.
    pub(super) fn spawn_monitor(
        tx: broadcast::Sender<DiscoveryEvent>,
    ) -> Result<(), TransportError> {
        std::thread::Builder::new()
            .name("sdm4540-hotplug".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        warn!("Hot-plug runtime failed to start: {}", e);
                        return;
                    }
                };
                if let Err(e) = runtime.block_on(monitor_loop(tx)) {
                    warn!("Hot-plug monitor stopped: {}", e);
                }
            })
            .map(|_| ())
            .map_err(|e| TransportError::Internal(format!("failed to spawn hot-plug thread: {e}")))
    }

    async fn monitor_loop(tx: broadcast::Sender<DiscoveryEvent>) -> Result<(), TransportError> {
        let socket = MonitorBuilder::new()
            .and_then(|b| b.match_subsystem("hidraw"))
            .and_then(|b| b.listen())
            .map_err(udev_err)?;
        let mut monitor = AsyncMonitorSocket::new(socket).map_err(udev_err)?;
        debug!("Hot-plug monitor listening on hidraw");

        while let Some(event) = monitor.next().await {
            let event = event.map_err(udev_err)?;
            let device = event.device();

            let ids = device
                .parent_with_subsystem("hid")
                .ok()
                .flatten()
                .and_then(|parent| {
                    parent
                        .property_value("HID_ID")
                        .and_then(|v| v.to_str())
                        .and_then(parse_hid_id)
                });
            let is_ours = matches!(ids, Some((_, vid, pid)) if device_registry::is_supported(vid, pid));

            let hotplug_device = HotplugDevice {
                syspath: device.syspath().to_path_buf(),
                devnode: device.devnode().map(|p| p.to_path_buf()),
            };

            let notification = match event.event_type() {
                EventType::Add if is_ours => DiscoveryEvent::DeviceAdded(hotplug_device),
                // Parents are often gone by the time a remove arrives
                EventType::Remove if is_ours || ids.is_none() => {
                    DiscoveryEvent::DeviceRemoved(hotplug_device)
                }
                _ => continue,
            };

            debug!("Hot-plug: {:?}", notification);
            if tx.send(notification).is_err() && tx.receiver_count() == 0 {
                debug!("No hot-plug subscribers left, stopping monitor");
                break;
            }
        }
        Ok(())
    }
}
