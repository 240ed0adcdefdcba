use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::bootstrap::ShutdownSignal;
use crate::firewall::{DecisionEngine, PacketDescriptor, SharedEnforcer};
use crate::listener::PacketReceiver;

/// Consumes the packet queue, evaluates each descriptor and enforces the verdict.
pub struct DecisionProcessor {
    engine: Arc<DecisionEngine>,
    enforcer: SharedEnforcer,
}

impl DecisionProcessor {
    pub fn new(engine: Arc<DecisionEngine>, enforcer: SharedEnforcer) -> Self {
        Self { engine, enforcer }
    }

    /// Run until shutdown or until the queue closes.
    pub async fn run(self, mut packets: PacketReceiver, mut shutdown: ShutdownSignal) {
        info!(enforcer = self.enforcer.name(), "decision loop started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    debug!(pending = packets.len(), "shutdown, discarding queued packets");
                    break;
                }

                packet = packets.recv() => {
                    match packet {
                        Some(packet) => self.process(packet).await,
                        None => {
                            debug!("packet queue closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("decision loop stopped");
    }

    #[instrument(skip(self), fields(packet = %packet))]
    async fn process(&self, packet: PacketDescriptor) {
        let verdict = self.engine.evaluate(&packet);
        self.enforcer.enforce(&packet, verdict).await;
    }
}
