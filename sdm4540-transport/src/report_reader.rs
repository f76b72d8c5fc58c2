//! Blocking reader loop for HID input reports
//!
//! Each opened hidraw interface gets its own reader thread running
//! [`run_report_reader_loop`]. Reads are converted to [`RawReport`]s and
//! broadcast, with a timestamp, to every subscriber.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hidapi::HidDevice;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::protocol::{RawReport, REPORT_SIZE};
use crate::types::TimestampedReport;

/// Configuration for the report reader loop
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Read timeout in milliseconds (for checking shutdown flag when idle)
    pub read_timeout_ms: i32,
    /// Sleep duration on error before retrying
    pub error_sleep_ms: u64,
    /// Consecutive read errors after which the interface is considered gone
    pub max_consecutive_errors: u32,
    /// Zero-fill reads shorter than `REPORT_SIZE` instead of dropping them
    pub pad_short_reports: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 10,
            error_sleep_ms: 100,
            max_consecutive_errors: 20,
            pad_short_reports: true,
        }
    }
}

/// Why a reader loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// The shutdown flag was set
    Shutdown,
    /// Too many consecutive read errors (device unplugged)
    Failed,
}

/// Turn one read into a report.
///
/// Reads longer than `REPORT_SIZE` are rejected. Shorter reads are zero-filled
/// when `pad_short` is set, the same way the kernel HID core completes short
/// reports, and rejected otherwise.
pub fn normalize_report(data: &[u8], pad_short: bool) -> Result<RawReport, TransportError> {
    if pad_short && !data.is_empty() && data.len() < REPORT_SIZE {
        let mut buf = [0u8; REPORT_SIZE];
        buf[..data.len()].copy_from_slice(data);
        return Ok(RawReport::new(buf));
    }
    RawReport::from_slice(data)
}

/// Reader loop for one HID interface
///
/// Runs until the shutdown flag is set or the interface keeps failing.
///
/// # Arguments
/// * `device` - HID device to read from
/// * `interface_number` - USB interface number, attached to every report
/// * `tx` - Broadcast sender for timestamped reports
/// * `shutdown` - Atomic flag to signal shutdown
/// * `start_time` - Reference point for report timestamps
/// * `config` - Configuration options
pub fn run_report_reader_loop(
    device: HidDevice,
    interface_number: i32,
    tx: broadcast::Sender<TimestampedReport>,
    shutdown: Arc<AtomicBool>,
    start_time: Instant,
    config: ReaderConfig,
) -> ReaderExit {
    debug!("Report reader for interface {} started", interface_number);
    let mut buf = [0u8; 64];
    let mut consecutive_errors = 0u32;

    while !shutdown.load(Ordering::Relaxed) {
        match device.read_timeout(&mut buf, config.read_timeout_ms.max(0)) {
            Ok(len) if len > 0 => {
                consecutive_errors = 0;
                let timestamp = start_time.elapsed().as_secs_f64();
                trace!(
                    "iface {} read {} bytes at {:.3}s: {:02X?}",
                    interface_number,
                    len,
                    timestamp,
                    &buf[..len.min(16)]
                );
                match normalize_report(&buf[..len], config.pad_short_reports) {
                    Ok(report) => {
                        // Ignores the error when nobody is subscribed
                        let _ = tx.send(TimestampedReport::new(timestamp, interface_number, report));
                    }
                    Err(e) => warn!("iface {}: dropping report: {}", interface_number, e),
                }
            }
            Ok(_) => {
                // Timeout, no data - loop continues to check shutdown
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= config.max_consecutive_errors {
                    warn!(
                        "iface {}: giving up after {} read errors: {}",
                        interface_number, consecutive_errors, e
                    );
                    return ReaderExit::Failed;
                }
                debug!("iface {} read error: {}", interface_number, e);
                std::thread::sleep(Duration::from_millis(config.error_sleep_ms));
            }
        }
    }

    debug!("Report reader for interface {} exiting", interface_number);
    ReaderExit::Shutdown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_exact() {
        let report = normalize_report(&[4, 0, 0, 16, 0, 0, 0, 0], true).unwrap();
        assert_eq!(report, RawReport::new([4, 0, 0, 16, 0, 0, 0, 0]));
    }

    #[test]
    fn test_normalize_pads_short_read() {
        // Multimedia interface sends [report id, ...payload] shorter than 8
        let report = normalize_report(&[3, 0, 0, 0, 2], true).unwrap();
        assert_eq!(report, RawReport::new([3, 0, 0, 0, 2, 0, 0, 0]));
    }

    #[test]
    fn test_normalize_strict_rejects_short_read() {
        assert!(matches!(
            normalize_report(&[3, 0, 0, 0, 2], false),
            Err(TransportError::MalformedReport {
                expected: 8,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_normalize_rejects_long_and_empty_reads() {
        assert!(normalize_report(&[0u8; 9], true).is_err());
        assert!(normalize_report(&[], true).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::default();
        assert_eq!(config.read_timeout_ms, 10);
        assert!(config.max_consecutive_errors > 0);
        assert!(config.pad_short_reports);
    }
}
