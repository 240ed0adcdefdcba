//! Packet ingestion listener.
//!
//! Binds a TCP listener and a UDP socket to the same address. Every accepted
//! connection and every received datagram becomes one packet descriptor on
//! the packet queue.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, span, warn, Instrument, Level};

use crate::bootstrap::{Shutdown, ShutdownSignal};
use crate::config::ListenerConfig;
use crate::firewall::{FirewallError, PacketDescriptor, Protocol, Statistics};
use crate::telemetry::counters;

use super::datagram;
use super::queue::{PacketQueue, PacketReceiver};

/// Pause after a failed accept so a persistent error does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Packet ingestion pipeline.
pub struct PacketListener {
    /// Queue capacity and datagram buffer size
    config: ListenerConfig,

    /// Shared statistics (dropped packets)
    stats: Arc<Statistics>,

    /// Address both sockets are bound to
    local_addr: Option<SocketAddr>,

    /// Shutdown handle for the running loops
    shutdown: Option<Arc<Shutdown>>,

    /// Accept and receive loops
    tasks: Vec<JoinHandle<()>>,
}

impl PacketListener {
    pub fn new(config: ListenerConfig, stats: Arc<Statistics>) -> Self {
        Self {
            config,
            stats,
            local_addr: None,
            shutdown: None,
            tasks: Vec::new(),
        }
    }

    /// Bind both listeners on `address` and start the ingestion loops.
    ///
    /// Returns the bound address and the receiving end of the packet queue.
    /// Either both listeners are running when this returns `Ok`, or neither is.
    /// Port 0 binds one ephemeral port shared by TCP and UDP.
    pub async fn start(
        &mut self,
        address: SocketAddr,
        shutdown: Arc<Shutdown>,
    ) -> Result<(SocketAddr, PacketReceiver), FirewallError> {
        if !self.tasks.is_empty() {
            return Err(FirewallError::AlreadyRunning);
        }

        let tcp = TcpListener::bind(address)
            .await
            .map_err(|source| FirewallError::Bind {
                protocol: Protocol::Tcp,
                address,
                source,
            })?;

        let bound = tcp.local_addr().map_err(|source| FirewallError::Bind {
            protocol: Protocol::Tcp,
            address,
            source,
        })?;

        // Dropping `tcp` on the error path closes it again.
        let udp = UdpSocket::bind(bound)
            .await
            .map_err(|source| FirewallError::Bind {
                protocol: Protocol::Udp,
                address: bound,
                source,
            })?;

        let (queue, rx) = PacketQueue::new(self.config.queue_capacity, self.stats.clone());

        let tcp_task = tokio::spawn(
            run_tcp(tcp, queue.clone(), shutdown.subscribe())
                .instrument(span!(Level::INFO, "listener", protocol = "tcp", address = %bound)),
        );
        let udp_task = tokio::spawn(
            datagram::run_udp(udp, self.config.udp_buffer_size, queue, shutdown.subscribe())
                .instrument(span!(Level::INFO, "listener", protocol = "udp", address = %bound)),
        );

        self.tasks = vec![tcp_task, udp_task];
        self.local_addr = Some(bound);
        self.shutdown = Some(shutdown);

        info!(
            address = %bound,
            queue_capacity = self.config.queue_capacity,
            "started listening"
        );

        Ok((bound, rx))
    }

    /// Address the listeners are bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Stop both loops and close the sockets.
    ///
    /// Once the loops have exited the queue has no senders left apart from
    /// connection tasks still finishing, so the receiver closes shortly after.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.trigger();
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!(error = %e, "listener task failed");
            }
        }

        if let Some(address) = self.local_addr.take() {
            info!(address = %address, "stopped listening");
        }
    }
}

/// TCP accept loop.
async fn run_tcp(listener: TcpListener, queue: PacketQueue, mut shutdown: ShutdownSignal) {
    debug!("tcp accept loop started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                break;
            }

            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let queue = queue.clone();
                        tokio::spawn(
                            handle_connection(stream, peer, queue)
                                .instrument(span!(Level::DEBUG, "conn", peer = %peer)),
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        counters::listener_error(Protocol::Tcp);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }

    debug!("tcp accept loop stopped");
}

/// Turn an accepted connection into a descriptor and close it.
async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, queue: PacketQueue) {
    let local = match stream.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            debug!(error = %e, "connection closed before inspection");
            return;
        }
    };

    queue.push(PacketDescriptor::from_endpoints(Protocol::Tcp, peer, local));

    if let Err(e) = stream.shutdown().await {
        debug!(error = %e, "connection shutdown failed");
    }
}
