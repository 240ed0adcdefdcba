//! Verdict enforcement.
//!
//! The decision loop hands every verdict to an [`Enforcer`]. The shipped
//! [`LoggingEnforcer`] only records the decision; a deployment that actually
//! drops traffic plugs in its own backend here.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::packet::PacketDescriptor;
use super::types::Verdict;

/// Enforcement backend.
#[async_trait]
pub trait Enforcer: Send + Sync {
    /// Called for every allowed packet.
    async fn on_allow(&self, packet: &PacketDescriptor);

    /// Called for every denied packet.
    async fn on_deny(&self, packet: &PacketDescriptor);

    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Dispatch a verdict to the matching hook.
    async fn enforce(&self, packet: &PacketDescriptor, verdict: Verdict) {
        match verdict {
            Verdict::Allow => self.on_allow(packet).await,
            Verdict::Deny => self.on_deny(packet).await,
        }
    }
}

/// Shared enforcer handle.
pub type SharedEnforcer = Arc<dyn Enforcer>;

/// Enforcer that logs verdicts without touching traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEnforcer;

#[async_trait]
impl Enforcer for LoggingEnforcer {
    async fn on_allow(&self, packet: &PacketDescriptor) {
        info!(
            source = %packet.source_ip,
            source_port = packet.source_port,
            destination = %packet.destination_ip,
            destination_port = packet.destination_port,
            protocol = %packet.protocol,
            "allowing packet"
        );
    }

    async fn on_deny(&self, packet: &PacketDescriptor) {
        info!(
            source = %packet.source_ip,
            source_port = packet.source_port,
            destination = %packet.destination_ip,
            destination_port = packet.destination_port,
            protocol = %packet.protocol,
            "blocking packet"
        );
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
