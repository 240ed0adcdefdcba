//! UDP receive loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use crate::bootstrap::ShutdownSignal;
use crate::firewall::{PacketDescriptor, Protocol};
use crate::telemetry::counters;

use super::queue::PacketQueue;

const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Receive datagrams until shutdown, enqueue one descriptor per datagram
/// and echo the payload back to the sender.
///
/// The destination address is the socket's bound address, so a wildcard bind
/// reports `0.0.0.0` as destination IP.
pub(super) async fn run_udp(
    socket: UdpSocket,
    buffer_size: usize,
    queue: PacketQueue,
    mut shutdown: ShutdownSignal,
) {
    let socket = Arc::new(socket);
    let local = match socket.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            warn!(error = %e, "udp socket has no local address");
            counters::listener_error(Protocol::Udp);
            return;
        }
    };

    let mut buf = vec![0u8; buffer_size.max(1)];
    debug!("udp receive loop started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                break;
            }

            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, peer)) => {
                        trace!(peer = %peer, len, "datagram received");
                        queue.push(PacketDescriptor::from_endpoints(Protocol::Udp, peer, local));

                        if let Err(e) = socket.send_to(&buf[..len], peer).await {
                            debug!(peer = %peer, error = %e, "echo failed");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "udp receive error");
                        counters::listener_error(Protocol::Udp);
                        tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }

    debug!("udp receive loop stopped");
}
