//! Packet descriptors.
//!
//! Addressing and protocol metadata of one observed connection or datagram.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use super::types::Protocol;

/// Descriptor of a single observed packet.
///
/// A `source_port` of 0 means "not applicable".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketDescriptor {
    pub source_port: u16,
    pub destination_port: u16,
    pub protocol: Protocol,
    pub source_ip: IpAddr,
    pub destination_ip: IpAddr,
}

impl PacketDescriptor {
    /// Create a descriptor from explicit addresses.
    pub fn new(
        protocol: Protocol,
        source_ip: IpAddr,
        source_port: u16,
        destination_ip: IpAddr,
        destination_port: u16,
    ) -> Self {
        Self {
            source_port,
            destination_port,
            protocol,
            source_ip,
            destination_ip,
        }
    }

    /// Create a descriptor from socket endpoints.
    ///
    /// IPv4-mapped IPv6 addresses are reduced to plain IPv4.
    pub fn from_endpoints(protocol: Protocol, source: SocketAddr, destination: SocketAddr) -> Self {
        Self::new(
            protocol,
            source.ip().to_canonical(),
            source.port(),
            destination.ip().to_canonical(),
            destination.port(),
        )
    }

    /// Source port, if applicable.
    pub fn source_port(&self) -> Option<u16> {
        (self.source_port > 0).then_some(self.source_port)
    }
}

impl fmt::Display for PacketDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} ({})",
            self.source_ip, self.source_port, self.destination_ip, self.destination_port, self.protocol
        )
    }
}
