//! HID input transport: raw reports from every interface of the keyboard

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hidapi::HidDevice;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::report_reader::{run_report_reader_loop, ReaderConfig, ReaderExit};
use crate::types::{HidInterfaceInfo, TimestampedReport, TransportDeviceInfo};
use crate::Transport;

/// Broadcast channel capacity for input reports
const REPORT_CHANNEL_CAPACITY: usize = 256;

/// Input transport over hidraw
///
/// Spawns one reader thread per opened interface. All threads feed the same
/// broadcast channel, so reports from the boot keyboard interface and the
/// multimedia interface arrive in a single ordered stream. The reader threads
/// hold the only senders, so the channel closes when the last one exits.
pub struct HidInputTransport {
    /// Device information
    info: TransportDeviceInfo,
    /// Receiver backing `read_report`, created up front so no report is missed
    report_rx: Mutex<broadcast::Receiver<TimestampedReport>>,
    /// Shutdown flag for reader threads
    shutdown: Arc<AtomicBool>,
    /// Number of reader threads still running
    live_readers: Arc<AtomicUsize>,
}

impl HidInputTransport {
    /// Create a transport from already opened HID interfaces
    ///
    /// # Arguments
    /// * `interfaces` - Interface description and open handle for each hidraw node
    /// * `info` - Device information
    /// * `config` - Reader loop configuration
    pub fn new(
        interfaces: Vec<(HidInterfaceInfo, HidDevice)>,
        info: TransportDeviceInfo,
        config: ReaderConfig,
    ) -> Result<Self, TransportError> {
        if interfaces.is_empty() {
            return Err(TransportError::DeviceNotFound(format!(
                "no HID interfaces for {:04X}:{:04X}",
                info.vid, info.pid
            )));
        }

        let (report_tx, report_rx) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let live_readers = Arc::new(AtomicUsize::new(0));
        let start_time = Instant::now();

        for (iface, device) in interfaces {
            let tx = report_tx.clone();
            let shutdown_clone = shutdown.clone();
            let live = live_readers.clone();
            let config = config.clone();
            let number = iface.interface_number;

            live.fetch_add(1, Ordering::SeqCst);
            let spawned = std::thread::Builder::new()
                .name(format!("sdm4540-iface{}", number))
                .spawn(move || {
                    let exit =
                        run_report_reader_loop(device, number, tx, shutdown_clone, start_time, config);
                    if exit == ReaderExit::Failed {
                        debug!("Reader for {} stopped after errors", iface.path);
                    }
                    live.fetch_sub(1, Ordering::SeqCst);
                });

            if let Err(e) = spawned {
                live_readers.fetch_sub(1, Ordering::SeqCst);
                shutdown.store(true, Ordering::SeqCst);
                return Err(TransportError::Internal(format!(
                    "failed to spawn reader thread: {}",
                    e
                )));
            }
        }

        Ok(Self {
            info,
            report_rx: Mutex::new(report_rx),
            shutdown,
            live_readers,
        })
    }

    /// Number of interfaces whose reader thread is still running
    pub fn live_interfaces(&self) -> usize {
        self.live_readers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for HidInputTransport {
    async fn read_report(
        &self,
        timeout_ms: u32,
    ) -> Result<Option<TimestampedReport>, TransportError> {
        let mut rx = self.report_rx.lock().await;
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms as u64);

        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Ok(report)) => return Ok(Some(report)),
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    warn!("Report consumer lagged, {} reports skipped", skipped);
                    continue;
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(TransportError::Disconnected)
                }
                Err(_) => return Ok(None),
            }
        }
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn is_connected(&self) -> bool {
        !self.shutdown.load(Ordering::SeqCst) && self.live_interfaces() > 0
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shutdown.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for HidInputTransport {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
