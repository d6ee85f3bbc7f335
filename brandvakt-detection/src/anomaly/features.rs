//! Feature extraction.
//!
//! Layout: four source address octets, protocol number, hour, minute.

use std::net::Ipv4Addr;

use brandvakt_core::PacketInfo;
use chrono::Timelike;

use super::DetectionError;

pub const FEATURE_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.0[index]
    }
}

/// Pure mapping from a packet to its feature vector.
///
/// Fails with `MalformedAddress` unless the source is a dotted-quad IPv4 address.
pub fn extract_features(packet: &PacketInfo) -> Result<FeatureVector, DetectionError> {
    let source: Ipv4Addr = packet
        .source_ip
        .trim()
        .parse()
        .map_err(|_| DetectionError::MalformedAddress(packet.source_ip.clone()))?;
    let [a, b, c, d] = source.octets();

    Ok(FeatureVector([
        f64::from(a),
        f64::from(b),
        f64::from(c),
        f64::from(d),
        f64::from(packet.protocol.number()),
        f64::from(packet.timestamp.hour()),
        f64::from(packet.timestamp.minute()),
    ]))
}
