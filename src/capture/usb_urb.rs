//! USB packet headers found in capture files
//!
//! Two capture sources are understood: USBPcap on Windows (link type 249)
//! and the Linux usbmon binary interface (link type 189 with a 48-byte
//! header, 220 with the 64-byte mmapped header).

/// pcap link type of USBPcap captures
pub const LINKTYPE_USBPCAP: i32 = 249;
/// pcap link type of usbmon captures with the 48-byte header
pub const LINKTYPE_USB_LINUX: i32 = 189;
/// pcap link type of usbmon captures with the 64-byte mmapped header
pub const LINKTYPE_USB_LINUX_MMAPPED: i32 = 220;

/// Endpoint address bit set for IN endpoints
const ENDPOINT_DIR_IN: u8 = 0x80;

/// Direction of USB transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to device (OUT)
    Out,
    /// Device to host (IN)
    In,
}

/// USB transfer type
///
/// Both USBPcap and usbmon number these the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Isochronous,
    Interrupt,
    Control,
    Bulk,
}

impl TransferType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Isochronous),
            1 => Some(Self::Interrupt),
            2 => Some(Self::Control),
            3 => Some(Self::Bulk),
            _ => None,
        }
    }
}

/// Header format, selected by the capture's link type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbHeaderFormat {
    UsbPcap,
    Usbmon { header_len: usize },
}

impl UsbHeaderFormat {
    pub fn from_linktype(linktype: i32) -> Option<Self> {
        match linktype {
            LINKTYPE_USBPCAP => Some(Self::UsbPcap),
            LINKTYPE_USB_LINUX => Some(Self::Usbmon { header_len: 48 }),
            LINKTYPE_USB_LINUX_MMAPPED => Some(Self::Usbmon { header_len: 64 }),
            _ => None,
        }
    }
}

/// Fields common to both header formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbUrb {
    pub bus: u16,
    pub device: u16,
    /// Endpoint number without the direction bit
    pub endpoint: u8,
    pub direction: Direction,
    pub transfer_type: TransferType,
    /// Whether this is a completion (data flowing back to the host)
    pub completion: bool,
}

/// One parsed USB packet, borrowing its payload from the capture buffer
#[derive(Debug, Clone, Copy)]
pub struct UsbPacket<'a> {
    pub urb: UsbUrb,
    pub data: &'a [u8],
}

impl UsbPacket<'_> {
    /// Interrupt transfer from the device with its data attached
    pub fn is_interrupt_in(&self) -> bool {
        self.urb.transfer_type == TransferType::Interrupt
            && self.urb.direction == Direction::In
            && self.urb.completion
    }
}

/// Parse a packet according to `format`
pub fn parse_usb_packet(format: UsbHeaderFormat, raw: &[u8]) -> Option<UsbPacket<'_>> {
    match format {
        UsbHeaderFormat::UsbPcap => parse_usbpcap(raw),
        UsbHeaderFormat::Usbmon { header_len } => parse_usbmon(raw, header_len),
    }
}

/// Parse a USBPcap packet
///
/// ```text
/// Offset  Size  Field
/// 0       2     headerLen
/// 2       8     irpId
/// 10      4     status
/// 14      2     function
/// 16      1     info (bit 0: 1 = completion, device to host)
/// 17      2     bus
/// 19      2     device
/// 21      1     endpoint (bit 7 = IN)
/// 22      1     transferType
/// 23      4     dataLength
/// ```
fn parse_usbpcap(raw: &[u8]) -> Option<UsbPacket<'_>> {
    if raw.len() < 27 {
        return None;
    }
    let header_len = u16::from_le_bytes([raw[0], raw[1]]) as usize;
    if header_len < 27 || raw.len() < header_len {
        return None;
    }

    let info = raw[16];
    let bus = u16::from_le_bytes([raw[17], raw[18]]);
    let device = u16::from_le_bytes([raw[19], raw[20]]);
    let endpoint = raw[21];
    let transfer_type = TransferType::from_byte(raw[22])?;
    let data_len = u32::from_le_bytes([raw[23], raw[24], raw[25], raw[26]]) as usize;

    let payload = &raw[header_len..];
    let data = &payload[..data_len.min(payload.len())];

    Some(UsbPacket {
        urb: UsbUrb {
            bus,
            device,
            endpoint: endpoint & !ENDPOINT_DIR_IN,
            direction: endpoint_direction(endpoint),
            transfer_type,
            completion: info & 0x01 != 0,
        },
        data,
    })
}

/// Parse a usbmon packet
///
/// ```text
/// Offset  Size  Field
/// 0       8     id
/// 8       1     type ('S' submit, 'C' complete, 'E' error)
/// 9       1     xfer_type
/// 10      1     epnum (bit 7 = IN)
/// 11      1     devnum
/// 12      2     busnum
/// 14      1     flag_setup
/// 15      1     flag_data
/// 16      8     ts_sec
/// 24      4     ts_usec
/// 28      4     status
/// 32      4     length
/// 36      4     len_cap
/// 40      8     setup
/// 48      16    (mmapped only) interval, start_frame, xfer_flags, ndesc
/// ```
fn parse_usbmon(raw: &[u8], header_len: usize) -> Option<UsbPacket<'_>> {
    if raw.len() < header_len {
        return None;
    }

    let event_type = raw[8];
    let transfer_type = TransferType::from_byte(raw[9])?;
    let endpoint = raw[10];
    let device = raw[11] as u16;
    let bus = u16::from_le_bytes([raw[12], raw[13]]);
    let len_cap = u32::from_le_bytes([raw[36], raw[37], raw[38], raw[39]]) as usize;

    let payload = &raw[header_len..];
    let data = &payload[..len_cap.min(payload.len())];

    Some(UsbPacket {
        urb: UsbUrb {
            bus,
            device,
            endpoint: endpoint & !ENDPOINT_DIR_IN,
            direction: endpoint_direction(endpoint),
            transfer_type,
            completion: event_type == b'C',
        },
        data,
    })
}

fn endpoint_direction(endpoint: u8) -> Direction {
    if endpoint & ENDPOINT_DIR_IN != 0 {
        Direction::In
    } else {
        Direction::Out
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_linktype() {
        assert_eq!(
            UsbHeaderFormat::from_linktype(249),
            Some(UsbHeaderFormat::UsbPcap)
        );
        assert_eq!(
            UsbHeaderFormat::from_linktype(220),
            Some(UsbHeaderFormat::Usbmon { header_len: 64 })
        );
        assert_eq!(
            UsbHeaderFormat::from_linktype(189),
            Some(UsbHeaderFormat::Usbmon { header_len: 48 })
        );
        assert_eq!(UsbHeaderFormat::from_linktype(1), None);
    }

    #[test]
    fn test_parse_usbpcap_interrupt_in() {
        let raw = build::usbpcap_interrupt(1, 5, 0x82, &[4, 0, 0, 16, 0, 0, 0, 0]);
        let packet = parse_usb_packet(UsbHeaderFormat::UsbPcap, &raw).unwrap();
        assert!(packet.is_interrupt_in());
        assert_eq!(packet.urb.bus, 1);
        assert_eq!(packet.urb.device, 5);
        assert_eq!(packet.urb.endpoint, 2);
        assert_eq!(packet.data, &[4, 0, 0, 16, 0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_usbpcap_truncated() {
        assert!(parse_usb_packet(UsbHeaderFormat::UsbPcap, &[0u8; 10]).is_none());
        let mut raw = build::usbpcap_interrupt(1, 5, 0x81, &[]);
        raw[0] = 40; // header claims more than present
        assert!(parse_usb_packet(UsbHeaderFormat::UsbPcap, &raw).is_none());
    }

    #[test]
    fn test_parse_usbmon() {
        let format = UsbHeaderFormat::Usbmon { header_len: 64 };

        let raw = build::usbmon_interrupt(b'C', 3, 7, 0x81, &[0, 0, 30, 0, 0, 0, 0, 0]);
        let packet = parse_usb_packet(format, &raw).unwrap();
        assert!(packet.is_interrupt_in());
        assert_eq!((packet.urb.bus, packet.urb.device), (3, 7));
        assert_eq!(packet.data[2], 30);

        let raw = build::usbmon_interrupt(b'S', 3, 7, 0x81, &[]);
        let packet = parse_usb_packet(format, &raw).unwrap();
        assert!(!packet.is_interrupt_in());
    }
}
