//! Report pump from the keyboard transport into the event sink
//!
//! The bridge owns the decoder and the sink. Reports are decoded and emitted
//! one at a time, in the order the transport delivers them. [`run`] adds the
//! outer connect / pump / wait-for-replug loop used by the `run` command.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use sdm4540_keyboard::{Decoded, EventSink, KeySource, ReportDecoder};
use sdm4540_transport::{DeviceDiscovery, DiscoveryEvent, RawReport, Transport, TransportError};

/// How long one `read_report` call may block, bounds Ctrl-C latency
const POLL_INTERVAL_MS: u32 = 100;

/// Delay between a hot-plug add and opening the device, lets udev apply permissions
const HOTPLUG_SETTLE: Duration = Duration::from_millis(250);

/// Counters for one bridge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    pub reports: u64,
    pub special: u64,
    pub passthrough: u64,
    pub sink_errors: u64,
    pub connections: u64,
}

impl fmt::Display for BridgeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reports ({} vendor buttons, {} passthrough), {} sink errors, {} connections",
            self.reports, self.special, self.passthrough, self.sink_errors, self.connections
        )
    }
}

/// Why [`Bridge::pump`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The running flag was cleared
    Stopped,
    /// The transport went away
    Disconnected,
}

pub struct Bridge<S> {
    decoder: ReportDecoder,
    sink: S,
    stats: BridgeStats,
}

impl<S> Bridge<S>
where
    S: EventSink,
    S::Error: fmt::Display,
{
    pub fn new(decoder: ReportDecoder, sink: S) -> Self {
        Self {
            decoder,
            sink,
            stats: BridgeStats::default(),
        }
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Decode one report into the sink
    pub fn handle_report(&mut self, report: &RawReport) -> Result<Decoded, S::Error> {
        self.stats.reports += 1;
        match self.decoder.dispatch(report, &mut self.sink) {
            Ok(decoded) => {
                match decoded.source {
                    KeySource::Special(_) => self.stats.special += 1,
                    KeySource::Passthrough => self.stats.passthrough += 1,
                }
                Ok(decoded)
            }
            Err(e) => {
                self.stats.sink_errors += 1;
                Err(e)
            }
        }
    }

    /// Forward reports from `transport` until it disconnects or `running` is cleared
    ///
    /// Sink errors are logged and the report is skipped; only transport
    /// errors other than a disconnect end the pump with an error.
    pub async fn pump(
        &mut self,
        transport: &dyn Transport,
        running: &AtomicBool,
    ) -> Result<PumpExit, TransportError> {
        while running.load(Ordering::SeqCst) {
            match transport.read_report(POLL_INTERVAL_MS).await {
                Ok(Some(ts)) => {
                    if let Err(e) = self.handle_report(&ts.report) {
                        warn!("Failed to emit key event for {}: {}", ts.report, e);
                    }
                }
                Ok(None) => {
                    if !transport.is_connected().await {
                        return Ok(PumpExit::Disconnected);
                    }
                }
                Err(TransportError::Disconnected) => return Ok(PumpExit::Disconnected),
                Err(e) => return Err(e),
            }
        }
        Ok(PumpExit::Stopped)
    }
}

/// Wait until the keyboard may have appeared
///
/// Returns on a hot-plug add, after `rescan` elapses, or when `running` is
/// cleared. A closed event channel is dropped and plain rescans take over.
async fn wait_for_device(
    events: &mut Option<broadcast::Receiver<DiscoveryEvent>>,
    rescan: Duration,
    running: &AtomicBool,
) {
    let deadline = tokio::time::Instant::now() + rescan;
    let tick = Duration::from_millis(POLL_INTERVAL_MS as u64);

    while running.load(Ordering::SeqCst) {
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return;
        }
        let step = tick.min(deadline - now);

        let Some(rx) = events.as_mut() else {
            tokio::time::sleep(step).await;
            continue;
        };
        match tokio::time::timeout(step, rx.recv()).await {
            Ok(Ok(DiscoveryEvent::DeviceAdded(dev))) => {
                debug!("Hot-plug add: {}", dev.syspath.display());
                tokio::time::sleep(HOTPLUG_SETTLE).await;
                return;
            }
            Ok(Ok(DiscoveryEvent::DeviceRemoved(_))) => {}
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => return,
            Ok(Err(broadcast::error::RecvError::Closed)) => {
                warn!("Hot-plug monitor closed, falling back to periodic rescan");
                *events = None;
            }
            Err(_) => {}
        }
    }
}

/// Connect, pump, and reconnect until `running` is cleared
pub async fn run<S, D>(
    bridge: &mut Bridge<S>,
    discovery: &D,
    running: &AtomicBool,
    rescan: Duration,
) -> Result<(), TransportError>
where
    S: EventSink,
    S::Error: fmt::Display,
    D: DeviceDiscovery + ?Sized,
{
    let mut events = match discovery.watch().await {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!("Hot-plug monitoring unavailable ({}), using periodic rescan", e);
            None
        }
    };

    let mut waiting_logged = false;
    while running.load(Ordering::SeqCst) {
        let devices = discovery.list_devices().await?;
        let Some(device) = devices.first() else {
            if !waiting_logged {
                info!("Waiting for keyboard to be plugged in");
                waiting_logged = true;
            }
            wait_for_device(&mut events, rescan, running).await;
            continue;
        };

        let transport = match discovery.open_device(device).await {
            Ok(t) => t,
            Err(e @ TransportError::HidPermissionDenied(_)) => return Err(e),
            Err(e) => {
                warn!("Failed to open keyboard: {}", e);
                wait_for_device(&mut events, rescan, running).await;
                continue;
            }
        };
        waiting_logged = false;
        bridge.stats.connections += 1;

        let info = transport.device_info();
        info!(
            "Connected to {} ({:04x}:{:04x}), {} interfaces",
            info.product_name.as_deref().unwrap_or("Unknown"),
            info.vid,
            info.pid,
            info.interfaces.len()
        );

        let exit = bridge.pump(transport.as_ref(), running).await;
        if let Err(e) = transport.close().await {
            debug!("Error closing transport: {}", e);
        }
        match exit? {
            PumpExit::Stopped => break,
            PumpExit::Disconnected => info!("Keyboard disconnected"),
        }
    }

    info!("Bridge stopped: {}", bridge.stats());
    Ok(())
}
