//! Bounded packet queue between the listeners and the decision loop.
//!
//! Pushing never waits: when the queue is full the descriptor is dropped and
//! counted. Pushes after the decision loop has gone away are discarded
//! without counting, since they are not overflow.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::firewall::{PacketDescriptor, Statistics};
use crate::telemetry::counters;

/// Receiving end handed to the decision loop.
pub type PacketReceiver = mpsc::Receiver<PacketDescriptor>;

/// Sending end shared by the listener tasks.
#[derive(Clone)]
pub struct PacketQueue {
    tx: mpsc::Sender<PacketDescriptor>,
    stats: Arc<Statistics>,
}

impl PacketQueue {
    /// Create a queue holding at most `capacity` descriptors.
    pub fn new(capacity: usize, stats: Arc<Statistics>) -> (Self, PacketReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, stats }, rx)
    }

    /// Enqueue a descriptor. Returns `false` if it was dropped.
    pub fn push(&self, packet: PacketDescriptor) -> bool {
        let protocol = packet.protocol;

        match self.tx.try_send(packet) {
            Ok(()) => {
                counters::packet_enqueued(protocol);
                true
            }
            Err(mpsc::error::TrySendError::Full(packet)) => {
                warn!(packet = %packet, "packet queue full, dropping packet");
                self.stats.record_dropped();
                counters::packet_dropped(protocol);
                false
            }
            Err(mpsc::error::TrySendError::Closed(packet)) => {
                debug!(packet = %packet, "packet queue closed, discarding packet");
                false
            }
        }
    }

    /// Free slots left in the queue.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firewall::Protocol;

    fn packet(port: u16) -> PacketDescriptor {
        PacketDescriptor::new(
            Protocol::Udp,
            "1.2.3.4".parse().unwrap(),
            port,
            "10.0.0.1".parse().unwrap(),
            53,
        )
    }

    #[test]
    fn test_overflow_keeps_capacity_and_drops_rest() {
        let stats = Arc::new(Statistics::new());
        let (queue, mut rx) = PacketQueue::new(5, stats.clone());

        let accepted = (1..=8).filter(|&port| queue.push(packet(port))).count();
        assert_eq!(accepted, 5);
        assert_eq!(queue.available(), 0);
        assert_eq!(stats.snapshot().packets_dropped, 3);

        let mut retained = Vec::new();
        while let Ok(p) = rx.try_recv() {
            retained.push(p.source_port);
        }
        // FIFO, oldest kept
        assert_eq!(retained, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_push_after_receiver_dropped() {
        let stats = Arc::new(Statistics::new());
        let (queue, rx) = PacketQueue::new(5, stats.clone());
        drop(rx);

        assert!(!queue.push(packet(1)));
        assert_eq!(stats.snapshot().packets_dropped, 0);
    }

    #[test]
    fn test_drops_do_not_touch_verdict_counters() {
        let stats = Arc::new(Statistics::new());
        let (queue, _rx) = PacketQueue::new(1, stats.clone());
        queue.push(packet(1));
        queue.push(packet(2));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.packets_processed, 0);
        assert_eq!(snapshot.packets_dropped, 1);
    }
}
