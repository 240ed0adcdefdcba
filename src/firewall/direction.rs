//! Packet direction classification.
//!
//! A packet is inbound when its destination is one of the host's
//! non-loopback IPv4 addresses, outbound when its source is, and unknown
//! otherwise. The destination check wins when both match.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::packet::PacketDescriptor;
use super::types::Direction;

/// Source of the host's local IPv4 addresses.
pub trait LocalAddresses: Send + Sync {
    /// Non-loopback IPv4 addresses currently assigned to the host.
    fn local_ipv4(&self) -> Vec<Ipv4Addr>;
}

/// Reads addresses from the host's network interfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl LocalAddresses for SystemInterfaces {
    #[cfg(unix)]
    fn local_ipv4(&self) -> Vec<Ipv4Addr> {
        let addrs = match nix::ifaddrs::getifaddrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!(error = %e, "failed to enumerate network interfaces");
                return Vec::new();
            }
        };

        addrs
            .filter_map(|ifaddr| {
                let sin = ifaddr.address.as_ref()?.as_sockaddr_in()?;
                let ip = Ipv4Addr::from(sin.ip());
                (!ip.is_loopback()).then_some(ip)
            })
            .collect()
    }

    #[cfg(not(unix))]
    fn local_ipv4(&self) -> Vec<Ipv4Addr> {
        Vec::new()
    }
}

/// Fixed address set.
#[derive(Debug, Default, Clone)]
pub struct StaticAddresses(pub Vec<Ipv4Addr>);

impl LocalAddresses for StaticAddresses {
    fn local_ipv4(&self) -> Vec<Ipv4Addr> {
        self.0.clone()
    }
}

/// Classifies packets relative to the local host.
pub struct DirectionClassifier {
    source: Box<dyn LocalAddresses>,
    /// How long a lookup is reused. Zero disables caching.
    refresh: Duration,
    cache: Mutex<Option<(Instant, Arc<Vec<Ipv4Addr>>)>>,
}

impl DirectionClassifier {
    pub fn new(source: impl LocalAddresses + 'static, refresh: Duration) -> Self {
        Self {
            source: Box::new(source),
            refresh,
            cache: Mutex::new(None),
        }
    }

    /// Classifier backed by the host's interfaces.
    pub fn system(refresh: Duration) -> Self {
        Self::new(SystemInterfaces, refresh)
    }

    /// Classify a packet.
    pub fn classify(&self, packet: &PacketDescriptor) -> Direction {
        let local = self.local_addresses();
        let is_local = |ip: &IpAddr| match ip {
            IpAddr::V4(v4) => local.contains(v4),
            IpAddr::V6(_) => false,
        };

        if is_local(&packet.destination_ip) {
            Direction::Inbound
        } else if is_local(&packet.source_ip) {
            Direction::Outbound
        } else {
            Direction::Unknown
        }
    }

    fn local_addresses(&self) -> Arc<Vec<Ipv4Addr>> {
        if self.refresh.is_zero() {
            return Arc::new(self.source.local_ipv4());
        }

        let mut cache = self.cache.lock();
        if let Some((fetched_at, addrs)) = cache.as_ref() {
            if fetched_at.elapsed() < self.refresh {
                return addrs.clone();
            }
        }

        let addrs = Arc::new(self.source.local_ipv4());
        debug!(count = addrs.len(), "refreshed local interface addresses");
        *cache = Some((Instant::now(), addrs.clone()));
        addrs
    }
}
