//! Packet Capture Writer
//!
//! Writes NF exchanges to a libpcap file so they can be inspected with
//! standard tools. Each exchange is wrapped in a synthesized
//! Ethernet/IPv4/UDP frame. Checksums are left at zero and every multi-byte
//! field is big-endian, including the global and record headers.

use bytes::{BufMut, BytesMut};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// libpcap magic number
pub const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
pub const PCAP_VERSION_MAJOR: u16 = 2;
pub const PCAP_VERSION_MINOR: u16 = 4;
pub const PCAP_SNAPLEN: u32 = 65535;
/// LINKTYPE_ETHERNET
pub const PCAP_LINKTYPE_ETHERNET: u32 = 1;

/// Global header length
pub const GLOBAL_HEADER_LEN: usize = 24;
/// Per-record header length
pub const RECORD_HEADER_LEN: usize = 16;

const ETHERNET_HEADER_LEN: usize = 14;
const IPV4_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;
/// Bytes added in front of the payload in every frame
pub const FRAME_OVERHEAD: usize = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + UDP_HEADER_LEN;

const ETHERTYPE_IPV4: u16 = 0x0800;
const IPPROTO_UDP: u8 = 0x11;
const BROADCAST_MAC: [u8; 6] = [0xff; 6];
const SOURCE_MAC: [u8; 6] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x01];

/// Largest payload whose IPv4 total length still fits in 16 bits
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - IPV4_HEADER_LEN - UDP_HEADER_LEN;

/// First UDP port used for NF endpoints
const NF_PORT_BASE: u16 = 5000;

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open capture file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Capture write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("Payload too large: {0} bytes (max 65507)")]
    PayloadTooLarge(usize),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Hash a label with `h = h * 31 + byte`
pub fn label_hash(label: &str) -> u32 {
    label
        .bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
}

/// Last octet of the synthesized 192.168.1.x address for a label
pub fn label_octet(label: &str) -> u8 {
    // Result is in 1..=255
    (label_hash(label) % 255 + 1) as u8
}

/// UDP port for an NF id
pub fn nf_port(id: u32) -> u16 {
    NF_PORT_BASE + (id % 1000) as u16
}

/// libpcap writer
pub struct PcapWriter<W: Write> {
    out: W,
    ip_id: u16,
    packets: u64,
}

impl PcapWriter<BufWriter<File>> {
    /// Create (truncate) a capture file and write the global header
    pub fn create(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| CaptureError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let writer = Self::new(BufWriter::new(file))?;
        log::info!("Packet capture opened: {}", path.display());
        Ok(writer)
    }
}

impl<W: Write> PcapWriter<W> {
    /// Wrap a sink and write the global header to it
    pub fn new(mut out: W) -> CaptureResult<Self> {
        let mut buf = BytesMut::with_capacity(GLOBAL_HEADER_LEN);
        buf.put_u32(PCAP_MAGIC);
        buf.put_u16(PCAP_VERSION_MAJOR);
        buf.put_u16(PCAP_VERSION_MINOR);
        buf.put_i32(0); // thiszone
        buf.put_u32(0); // sigfigs
        buf.put_u32(PCAP_SNAPLEN);
        buf.put_u32(PCAP_LINKTYPE_ETHERNET);
        out.write_all(&buf)?;
        out.flush()?;

        Ok(Self {
            out,
            ip_id: 0,
            packets: 0,
        })
    }

    /// Number of records written so far
    pub fn packet_count(&self) -> u64 {
        self.packets
    }

    /// Write one UDP datagram between two labelled endpoints
    pub fn capture_packet(
        &mut self,
        src_label: &str,
        dst_label: &str,
        src_port: u16,
        dst_port: u16,
        payload: &[u8],
    ) -> CaptureResult<()> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(CaptureError::PayloadTooLarge(payload.len()));
        }

        let frame = self.build_frame(src_label, dst_label, src_port, dst_port, payload);
        self.write_record(&frame)
    }

    /// Write an NF-to-NF message record
    pub fn capture_message(
        &mut self,
        src_id: u32,
        dst_id: u32,
        msg_type: u16,
        data: &str,
    ) -> CaptureResult<()> {
        let payload = format!(
            "SRC:{:x}|DST:{:x}|TYPE:{:x}|DATA:{}",
            src_id, dst_id, msg_type, data
        );
        self.capture_packet(
            &format!("NF-{}", src_id),
            &format!("NF-{}", dst_id),
            nf_port(src_id),
            nf_port(dst_id),
            payload.as_bytes(),
        )
    }

    /// Record a named exchange between two components, e.g. `("AMF", "UDM",
    /// "AUTHENTICATION_REQUEST", "...")`
    pub fn log_exchange(
        &mut self,
        src_label: &str,
        dst_label: &str,
        msg_type: &str,
        details: &str,
    ) -> CaptureResult<()> {
        let src_id = label_hash(src_label);
        let dst_id = label_hash(dst_label);
        let type_code = (label_hash(msg_type) % 65536) as u16;
        self.capture_message(
            src_id,
            dst_id,
            type_code,
            &format!("[{}] {}", msg_type, details),
        )
    }

    /// Flush and give back the sink
    pub fn into_inner(mut self) -> CaptureResult<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn build_frame(
        &mut self,
        src_label: &str,
        dst_label: &str,
        src_port: u16,
        dst_port: u16,
        payload: &[u8],
    ) -> BytesMut {
        let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + payload.len());

        // Ethernet
        buf.put_slice(&BROADCAST_MAC);
        buf.put_slice(&SOURCE_MAC);
        buf.put_u16(ETHERTYPE_IPV4);

        // IPv4
        let ip_id = self.ip_id;
        self.ip_id = self.ip_id.wrapping_add(1);
        buf.put_u8(0x45); // version 4, IHL 5
        buf.put_u8(0x00);
        buf.put_u16((IPV4_HEADER_LEN + UDP_HEADER_LEN + payload.len()) as u16);
        buf.put_u16(ip_id);
        buf.put_u8(0x40); // DF
        buf.put_u8(0x00);
        buf.put_u8(0x40); // TTL
        buf.put_u8(IPPROTO_UDP);
        buf.put_u16(0);
        buf.put_slice(&[192, 168, 1, label_octet(src_label)]);
        buf.put_slice(&[192, 168, 1, label_octet(dst_label)]);

        // UDP
        buf.put_u16(src_port);
        buf.put_u16(dst_port);
        buf.put_u16((UDP_HEADER_LEN + payload.len()) as u16);
        buf.put_u16(0);

        buf.put_slice(payload);
        buf
    }

    fn write_record(&mut self, frame: &[u8]) -> CaptureResult<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        let mut header = BytesMut::with_capacity(RECORD_HEADER_LEN);
        header.put_u32(now.as_secs() as u32);
        header.put_u32(now.subsec_micros());
        header.put_u32(frame.len() as u32);
        header.put_u32(frame.len() as u32);

        self.out.write_all(&header)?;
        self.out.write_all(frame)?;
        self.out.flush()?;
        self.packets += 1;
        Ok(())
    }
}
