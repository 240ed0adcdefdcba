//! Packet ingestion.
//!
//! A TCP listener and a UDP socket bound to the same address feed one
//! bounded queue:
//! - each accepted TCP connection yields one descriptor, then is closed
//! - each received datagram yields one descriptor and is echoed back
//! - when the queue is full, new descriptors are dropped and counted

mod acceptor;
mod datagram;
mod queue;

pub use acceptor::PacketListener;
pub use queue::{PacketQueue, PacketReceiver};
