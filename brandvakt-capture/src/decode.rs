//! IPv4 header decoding into `PacketInfo`.
//!
//! Only the fields the pipeline reads are decoded: addresses, protocol and, for TCP
//! and UDP, the two port words. Checksums are the kernel's concern.

use std::net::Ipv4Addr;

use brandvakt_core::{PacketInfo, Protocol};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::{CaptureError, RawPacket};

const MIN_HEADER_LEN: usize = 20;
const FRAGMENT_OFFSET_MASK: u16 = 0x1fff;

pub fn decode_ipv4(raw: &RawPacket) -> Result<PacketInfo, CaptureError> {
    let data = raw.data.as_ref();
    if data.len() < MIN_HEADER_LEN {
        return Err(CaptureError::Truncated);
    }

    let version = data[0] >> 4;
    if version != 4 {
        return Err(CaptureError::UnsupportedVersion(version));
    }
    let ihl_words = data[0] & 0x0f;
    let header_len = usize::from(ihl_words) * 4;
    if header_len < MIN_HEADER_LEN {
        return Err(CaptureError::BadHeaderLength(ihl_words));
    }
    if data.len() < header_len {
        return Err(CaptureError::Truncated);
    }

    let protocol = Protocol::from_number(data[9]);
    let source = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
    let dest = Ipv4Addr::new(data[16], data[17], data[18], data[19]);

    let mut info = PacketInfo::new(source.to_string(), dest.to_string(), protocol)
        .with_timestamp(raw.captured_at);

    // Only the first fragment starts with the transport header
    let fragment_offset = u16::from_be_bytes([data[6], data[7]]) & FRAGMENT_OFFSET_MASK;
    if fragment_offset != 0 {
        debug!(fragment_offset, packet = %info, "Non-first fragment, no transport ports");
        return Ok(info);
    }

    let mut transport = &data[header_len..];
    if protocol.has_ports() && transport.len() >= 4 {
        let source_port = transport.get_u16();
        let dest_port = transport.get_u16();
        info = info.with_ports(source_port, dest_port);
    }
    Ok(info)
}

/// Builds a minimal IPv4 datagram with an empty payload.
///
/// TCP segments carry a bare SYN header, UDP an 8-byte header, ICMP an echo request.
/// `ports` is ignored for protocols without ports.
pub fn encode_ipv4(
    source: Ipv4Addr,
    dest: Ipv4Addr,
    protocol: Protocol,
    ports: Option<(u16, u16)>,
) -> Bytes {
    let (source_port, dest_port) = ports.unwrap_or((0, 0));
    let transport_len: u16 = match protocol {
        Protocol::Tcp => 20,
        Protocol::Udp | Protocol::Icmp => 8,
        Protocol::Other(_) => 0,
    };
    let total_len = MIN_HEADER_LEN as u16 + transport_len;

    let mut header = BytesMut::with_capacity(usize::from(total_len));
    header.put_u8(0x45);
    header.put_u8(0);
    header.put_u16(total_len);
    header.put_u16(0); // identification
    header.put_u16(0x4000); // don't fragment
    header.put_u8(64);
    header.put_u8(protocol.number());
    header.put_u16(0); // checksum placeholder
    header.put_slice(&source.octets());
    header.put_slice(&dest.octets());

    let checksum = header_checksum(&header);
    header[10..12].copy_from_slice(&checksum.to_be_bytes());

    match protocol {
        Protocol::Tcp => {
            header.put_u16(source_port);
            header.put_u16(dest_port);
            header.put_u32(0); // sequence
            header.put_u32(0); // acknowledgement
            header.put_u8(5 << 4);
            header.put_u8(0x02); // SYN
            header.put_u16(64_240);
            header.put_u16(0);
            header.put_u16(0);
        }
        Protocol::Udp => {
            header.put_u16(source_port);
            header.put_u16(dest_port);
            header.put_u16(transport_len);
            header.put_u16(0);
        }
        Protocol::Icmp => {
            header.put_u8(8); // echo request
            header.put_u8(0);
            header.put_u16(0);
            header.put_u32(0);
        }
        Protocol::Other(_) => {}
    }
    header.freeze()
}

fn header_checksum(header: &[u8]) -> u16 {
    let mut sum: u32 = header
        .chunks(2)
        .map(|pair| u32::from(u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)])))
        .sum();
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
