//! Packet admission firewall.
//!
//! Port/protocol/direction rules evaluated first-match-wins with a
//! default-permit policy:
//! - Rules are selected by the packet's destination port, then source port
//! - Protocol and direction must match (`both` matches anything)
//! - No matching rule means the packet is allowed
//!
//! # Example Rule
//!
//! ```json
//! {
//!   "id": "block-telnet",
//!   "port": 23,
//!   "protocol": "tcp",
//!   "action": "deny",
//!   "direction": "inbound",
//!   "created_at": "2024-05-01T12:00:00Z"
//! }
//! ```

pub mod direction;
mod enforcement;
mod engine;
mod packet;
mod stats;
mod types;

pub use direction::{DirectionClassifier, LocalAddresses, StaticAddresses, SystemInterfaces};
pub use enforcement::{Enforcer, LoggingEnforcer, SharedEnforcer};
pub use engine::DecisionEngine;
pub use packet::PacketDescriptor;
pub use stats::{FirewallStats, Statistics};
pub use types::*;

#[cfg(test)]
pub(crate) use enforcement::testing;
