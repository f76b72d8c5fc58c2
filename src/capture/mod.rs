//! Replay of USB captures through the report decoder
//!
//! Reads pcap or pcapng files recorded with USBPcap or usbmon, picks out the
//! 8-byte interrupt IN transfers the keyboard sends, and decodes each one
//! exactly as the live driver would.
//!
//! ```ignore
//! let decoder = ReportDecoder::default();
//! let stats = capture::analyze_file(path, &decoder, &ReplayFilter::default(), |rec| {
//!     println!("{}", rec.report);
//! })?;
//! ```

mod usb_urb;

pub use usb_urb::{
    parse_usb_packet, Direction, TransferType, UsbHeaderFormat, UsbPacket, UsbUrb,
    LINKTYPE_USBPCAP, LINKTYPE_USB_LINUX, LINKTYPE_USB_LINUX_MMAPPED,
};

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use pcap_parser::pcapng::Block;
use pcap_parser::traits::PcapNGPacketBlock;
use pcap_parser::{create_reader, PcapBlockOwned, PcapError};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use sdm4540_keyboard::{Decoded, KeySource, ReportDecoder};
use sdm4540_transport::RawReport;

/// Consecutive refills without a complete block before giving up
const MAX_STALLED_REFILLS: u32 = 2;

/// Timestamp units per second when an interface does not say otherwise
const DEFAULT_TS_RESOLUTION: u64 = 1_000_000;

/// Errors from reading a capture file
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to open capture: {0}")]
    Io(#[from] std::io::Error),

    #[error("PCAP parse error: {0}")]
    Parse(String),

    #[error("Capture has no USB interfaces (link type {0})")]
    UnsupportedLinkType(i32),
}

/// Which packets to keep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayFilter {
    pub bus: Option<u16>,
    pub device: Option<u16>,
}

impl ReplayFilter {
    fn accepts(&self, urb: &UsbUrb) -> bool {
        self.bus.map_or(true, |bus| bus == urb.bus)
            && self.device.map_or(true, |device| device == urb.device)
    }
}

/// One decoded report from the capture
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReplayRecord {
    /// Seconds since the first packet in the file
    pub timestamp: f64,
    pub bus: u16,
    pub device: u16,
    pub endpoint: u8,
    #[serde(serialize_with = "as_display")]
    pub report: RawReport,
    #[serde(flatten)]
    pub decoded: Decoded,
}

fn as_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// Packet statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub packets: u64,
    pub unsupported_link: u64,
    pub parse_failed: u64,
    pub not_interrupt_in: u64,
    pub filtered: u64,
    pub wrong_length: u64,
    pub reports: u64,
    pub special: u64,
    pub passthrough: u64,
}

impl CaptureStats {
    pub fn print_summary(&self) {
        eprintln!("\nPacket statistics:");
        eprintln!("  Packets:            {}", self.packets);
        eprintln!("  Unsupported link:   {}", self.unsupported_link);
        eprintln!("  Parse failed:       {}", self.parse_failed);
        eprintln!("  Not interrupt IN:   {}", self.not_interrupt_in);
        eprintln!("  Filtered out:       {}", self.filtered);
        eprintln!("  Wrong length:       {}", self.wrong_length);
        eprintln!("  Reports decoded:    {}", self.reports);
        eprintln!("    Vendor buttons:   {}", self.special);
        eprintln!("    Passthrough:      {}", self.passthrough);
    }
}

/// One capture interface: a pcapng IDB, or the legacy file header
#[derive(Debug, Clone, Copy)]
struct Interface {
    format: Option<UsbHeaderFormat>,
    ts_resolution: u64,
}

/// Per-file state while walking the blocks
struct Replay<'a, F> {
    decoder: &'a ReportDecoder,
    filter: &'a ReplayFilter,
    on_record: F,
    stats: CaptureStats,
    base_timestamp: Option<f64>,
    /// Interfaces of the current section, indexed by interface id
    interfaces: Vec<Interface>,
    first_linktype: Option<i32>,
}

impl<F: FnMut(&ReplayRecord)> Replay<'_, F> {
    fn add_interface(&mut self, linktype: i32, ts_resolution: u64) {
        let format = UsbHeaderFormat::from_linktype(linktype);
        if format.is_none() {
            warn!("Interface {} has unsupported link type {}", self.interfaces.len(), linktype);
        }
        self.first_linktype.get_or_insert(linktype);
        self.interfaces.push(Interface {
            format,
            ts_resolution,
        });
    }

    fn ts_resolution(&self, if_id: usize) -> u64 {
        self.interfaces
            .get(if_id)
            .map_or(DEFAULT_TS_RESOLUTION, |iface| iface.ts_resolution)
    }

    fn process_packet(&mut self, if_id: usize, timestamp: f64, raw: &[u8]) {
        self.stats.packets += 1;
        let base = *self.base_timestamp.get_or_insert(timestamp);

        let Some(format) = self.interfaces.get(if_id).and_then(|iface| iface.format) else {
            self.stats.unsupported_link += 1;
            return;
        };
        let Some(packet) = parse_usb_packet(format, raw) else {
            self.stats.parse_failed += 1;
            return;
        };
        if !packet.is_interrupt_in() || packet.data.is_empty() {
            self.stats.not_interrupt_in += 1;
            return;
        }
        if !self.filter.accepts(&packet.urb) {
            self.stats.filtered += 1;
            return;
        }
        let Ok(report) = RawReport::from_slice(packet.data) else {
            debug!(
                "Skipping {}-byte transfer from {}:{}",
                packet.data.len(),
                packet.urb.bus,
                packet.urb.device
            );
            self.stats.wrong_length += 1;
            return;
        };

        let decoded = self.decoder.decode(&report);
        self.stats.reports += 1;
        match decoded.source {
            KeySource::Special(_) => self.stats.special += 1,
            KeySource::Passthrough => self.stats.passthrough += 1,
        }

        (self.on_record)(&ReplayRecord {
            timestamp: timestamp - base,
            bus: packet.urb.bus,
            device: packet.urb.device,
            endpoint: packet.urb.endpoint,
            report,
            decoded,
        });
    }
}

/// Decode every keyboard report in a capture read from `input`
///
/// `on_record` is called once per decoded report, in file order.
pub fn analyze<R, F>(
    input: R,
    decoder: &ReportDecoder,
    filter: &ReplayFilter,
    on_record: F,
) -> Result<CaptureStats, CaptureError>
where
    R: Read,
    F: FnMut(&ReplayRecord),
{
    let mut reader =
        create_reader(65536, input).map_err(|e| CaptureError::Parse(format!("{e:?}")))?;
    let mut replay = Replay {
        decoder,
        filter,
        on_record,
        stats: CaptureStats::default(),
        base_timestamp: None,
        interfaces: Vec::new(),
        first_linktype: None,
    };
    let mut stalled_refills = 0u32;

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                stalled_refills = 0;
                match block {
                    PcapBlockOwned::LegacyHeader(header) => {
                        replay.add_interface(header.network.0, DEFAULT_TS_RESOLUTION)
                    }
                    PcapBlockOwned::Legacy(packet) => {
                        let ts = packet.ts_sec as f64 + packet.ts_usec as f64 / 1_000_000.0;
                        replay.process_packet(0, ts, packet.data);
                    }
                    // Interface ids restart in every section
                    PcapBlockOwned::NG(Block::SectionHeader(_)) => replay.interfaces.clear(),
                    PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => replay.add_interface(
                        idb.linktype.0,
                        idb.ts_resolution().unwrap_or(DEFAULT_TS_RESOLUTION),
                    ),
                    PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                        let if_id = epb.if_id as usize;
                        let ts = epb.decode_ts_f64(0, replay.ts_resolution(if_id));
                        // `data` is padded to 32 bits, `packet_data` is cut to caplen
                        replay.process_packet(if_id, ts, epb.packet_data());
                    }
                    _ => {}
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                stalled_refills += 1;
                if stalled_refills > MAX_STALLED_REFILLS {
                    warn!("Could not read complete data block (file may be truncated)");
                    break;
                }
                reader
                    .refill()
                    .map_err(|e| CaptureError::Parse(format!("refill: {e:?}")))?;
            }
            Err(e) => return Err(CaptureError::Parse(format!("{e:?}"))),
        }
    }

    let stats = replay.stats;
    if stats.packets > 0 && stats.unsupported_link == stats.packets {
        return Err(CaptureError::UnsupportedLinkType(
            replay.first_linktype.unwrap_or_default(),
        ));
    }
    Ok(stats)
}

/// [`analyze`] on a file
pub fn analyze_file<F>(
    path: &Path,
    decoder: &ReportDecoder,
    filter: &ReplayFilter,
    on_record: F,
) -> Result<CaptureStats, CaptureError>
where
    F: FnMut(&ReplayRecord),
{
    let file = File::open(path)?;
    analyze(file, decoder, filter, on_record)
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use sdm4540_keyboard::{KeyCode, SpecialKey};
    use std::io::Cursor;

    fn run(file: Vec<u8>, filter: ReplayFilter) -> (CaptureStats, Vec<ReplayRecord>) {
        let decoder = ReportDecoder::default();
        let mut records = Vec::new();
        let stats = analyze(Cursor::new(file), &decoder, &filter, |r| records.push(*r)).unwrap();
        (stats, records)
    }

    #[test]
    fn test_usbmon_capture() {
        let file = legacy_pcap(
            LINKTYPE_USB_LINUX_MMAPPED as u32,
            &[
                usbmon_interrupt(b'S', 1, 4, 0x82, &[]),
                usbmon_interrupt(b'C', 1, 4, 0x82, &[4, 0, 0, 16, 0, 0, 0, 0]),
                usbmon_interrupt(b'C', 1, 4, 0x81, &[0, 0, 30, 0, 0, 0, 0, 0]),
                // Mouse on the same bus, wrong report size
                usbmon_interrupt(b'C', 1, 9, 0x81, &[1, 2, 3, 4]),
            ],
        );
        let (stats, records) = run(file, ReplayFilter::default());

        assert_eq!(stats.packets, 4);
        assert_eq!(stats.not_interrupt_in, 1);
        assert_eq!(stats.wrong_length, 1);
        assert_eq!(stats.reports, 2);
        assert_eq!(stats.special, 1);
        assert_eq!(stats.passthrough, 1);

        assert_eq!(records[0].decoded.code, KeyCode::F13);
        assert_eq!(
            records[0].decoded.source,
            KeySource::Special(SpecialKey::Magnifier)
        );
        assert_eq!(records[1].decoded.code, KeyCode(30));
        assert!(records[1].timestamp > records[0].timestamp);
        assert_eq!(records[0].timestamp, 0.25);
    }

    #[test]
    fn test_usbpcap_capture_with_filter() {
        let file = legacy_pcap(
            LINKTYPE_USBPCAP as u32,
            &[
                usbpcap_interrupt(1, 3, 0x81, &[3, 0, 0, 0, 2, 0, 0, 0]),
                usbpcap_interrupt(1, 6, 0x81, &[3, 0, 0, 0, 1, 0, 0, 0]),
            ],
        );
        let filter = ReplayFilter {
            bus: Some(1),
            device: Some(6),
        };
        let (stats, records) = run(file, filter);

        assert_eq!(stats.filtered, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].device, 6);
        assert_eq!(records[0].decoded.code, KeyCode::F20);
    }

    #[test]
    fn test_pcapng_sections_and_timestamps() {
        let mut file = pcapng::section_header();
        file.extend(pcapng::interface(LINKTYPE_USBPCAP as u16, None));
        file.extend(pcapng::enhanced_packet(
            0,
            0,
            &usbpcap_interrupt(1, 3, 0x81, &[4, 0, 0, 16, 0, 0, 0, 0]),
        ));
        file.extend(pcapng::enhanced_packet(
            0,
            500_000,
            &usbpcap_interrupt(1, 3, 0x81, &[0, 0, 30, 0, 0, 0, 0, 0]),
        ));
        // Second section: interface 0 is now usbmon with nanosecond stamps
        file.extend(pcapng::section_header());
        file.extend(pcapng::interface(LINKTYPE_USB_LINUX_MMAPPED as u16, Some(9)));
        file.extend(pcapng::enhanced_packet(
            0,
            1_000_000_000,
            &usbmon_interrupt(b'C', 2, 5, 0x82, &[3, 0, 0, 0, 2, 0, 0, 0]),
        ));

        let (stats, records) = run(file, ReplayFilter::default());

        assert_eq!(stats.packets, 3);
        assert_eq!(stats.parse_failed, 0);
        assert_eq!(stats.reports, 3);
        let decoded: Vec<(f64, KeyCode)> = records
            .iter()
            .map(|r| (r.timestamp, r.decoded.code))
            .collect();
        assert_eq!(
            decoded,
            vec![(0.0, KeyCode::F13), (0.5, KeyCode(30)), (1.0, KeyCode::F21)]
        );
        assert_eq!((records[2].bus, records[2].device), (2, 5));
    }

    #[test]
    fn test_unsupported_link_type() {
        let file = legacy_pcap(1, &[vec![0u8; 60]]);
        let decoder = ReportDecoder::default();
        let result = analyze(
            Cursor::new(file),
            &decoder,
            &ReplayFilter::default(),
            |_| {},
        );
        assert!(matches!(result, Err(CaptureError::UnsupportedLinkType(1))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let decoder = ReportDecoder::default();
        let result = analyze(
            Cursor::new(vec![0x42u8; 64]),
            &decoder,
            &ReplayFilter::default(),
            |_| {},
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_record_json() {
        let record = ReplayRecord {
            timestamp: 1.5,
            bus: 1,
            device: 2,
            endpoint: 1,
            report: RawReport::new([3, 0, 0, 0, 1, 0, 0, 0]),
            decoded: ReportDecoder::default().decode(&RawReport::new([3, 0, 0, 0, 1, 0, 0, 0])),
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["report"], "03 00 00 00 01 00 00 00");
        assert_eq!(json["code"], "KEY_F20");
        assert_eq!(json["source"]["kind"], "special");
        assert_eq!(json["source"]["button"], "help");
    }
}
