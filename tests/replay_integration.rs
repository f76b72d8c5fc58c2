//! Integration tests for capture replay through the public API.

use std::io::Cursor;

use sdm4540_driver::capture::{analyze, CaptureError, ReplayFilter, LINKTYPE_USB_LINUX};
use sdm4540_keyboard::{KeyCode, KeyMapping, KeySource, ReportDecoder, SpecialKey};

/// usbmon packet with the 48-byte header (link type 189)
fn usbmon_packet(kind: u8, bus: u16, device: u8, endpoint: u8, data: &[u8]) -> Vec<u8> {
    let mut raw = vec![0u8; 48];
    raw[8] = kind;
    raw[9] = 1; // interrupt
    raw[10] = endpoint;
    raw[11] = device;
    raw[12..14].copy_from_slice(&bus.to_le_bytes());
    raw[32..36].copy_from_slice(&(data.len() as u32).to_le_bytes());
    raw[36..40].copy_from_slice(&(data.len() as u32).to_le_bytes());
    raw.extend_from_slice(data);
    raw
}

/// Big-endian legacy pcap, as written by tcpdump on some hosts
fn pcap_be(linktype: u32, packets: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_be_bytes());
    out.extend_from_slice(&2u16.to_be_bytes());
    out.extend_from_slice(&4u16.to_be_bytes());
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&262144u32.to_be_bytes());
    out.extend_from_slice(&linktype.to_be_bytes());
    for (i, data) in packets.iter().enumerate() {
        out.extend_from_slice(&(1_700_000_000u32 + i as u32).to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(data);
    }
    out
}

#[test]
fn every_vendor_button_in_a_capture() {
    let packets: Vec<Vec<u8>> = SpecialKey::ALL
        .iter()
        .map(|key| {
            let sig = key.signature();
            let mut report = [0u8; 8];
            report[0] = sig.group;
            report[sig.index] = sig.value;
            usbmon_packet(b'C', 2, 5, 0x82, &report)
        })
        .collect();
    let file = pcap_be(LINKTYPE_USB_LINUX as u32, &packets);

    let mapping = KeyMapping::DEFAULT.with_override(SpecialKey::Media, KeyCode::MEDIA);
    let decoder = ReportDecoder::new(mapping);
    let mut seen = Vec::new();
    let stats = analyze(Cursor::new(file), &decoder, &ReplayFilter::default(), |r| {
        seen.push(r.decoded)
    })
    .unwrap();

    assert_eq!(stats.reports, 9);
    assert_eq!(stats.special, 9);
    let sources: Vec<_> = seen.iter().map(|d| d.source).collect();
    let expected: Vec<_> = SpecialKey::ALL.iter().map(|k| KeySource::Special(*k)).collect();
    assert_eq!(sources, expected);
    assert_eq!(seen[6].code, KeyCode::MEDIA);
    assert_eq!(seen[8].code, KeyCode::F21);
}

#[test]
fn bus_filter_and_timestamps() {
    let file = pcap_be(
        LINKTYPE_USB_LINUX as u32,
        &[
            usbmon_packet(b'C', 1, 5, 0x81, &[0, 0, 0x1e, 0, 0, 0, 0, 0]),
            usbmon_packet(b'C', 2, 5, 0x81, &[0, 0, 0x1f, 0, 0, 0, 0, 0]),
            usbmon_packet(b'C', 2, 5, 0x81, &[0, 0, 0x20, 0, 0, 0, 0, 0]),
        ],
    );
    let filter = ReplayFilter {
        bus: Some(2),
        device: None,
    };
    let mut records = Vec::new();
    let stats = analyze(Cursor::new(file), &ReportDecoder::default(), &filter, |r| {
        records.push(*r)
    })
    .unwrap();

    assert_eq!(stats.filtered, 1);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].decoded.code, KeyCode(0x1f));
    assert_eq!(records[0].timestamp, 1.0);
    assert_eq!(records[1].timestamp, 2.0);
}

#[test]
fn missing_file_is_an_io_error() {
    let result = sdm4540_driver::capture::analyze_file(
        std::path::Path::new("/nonexistent/capture.pcap"),
        &ReportDecoder::default(),
        &ReplayFilter::default(),
        |_| {},
    );
    assert!(matches!(result, Err(CaptureError::Io(_))));
}
