//! Runtime state of the firewall service.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::listener::PacketListener;

use super::Shutdown;

/// Lifecycle state, changed only by `start` and `stop`.
pub(crate) enum RunState {
    Stopped,
    Running(Running),
}

/// Everything owned by one run of the service.
pub(crate) struct Running {
    /// Cancellation for every task of this run
    pub shutdown: Arc<Shutdown>,
    /// TCP and UDP ingestion
    pub listener: PacketListener,
    /// Decision loop task
    pub decision: JoinHandle<()>,
    /// Address the listeners are bound to
    pub local_addr: SocketAddr,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running(_))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            RunState::Running(running) => Some(running.local_addr),
            RunState::Stopped => None,
        }
    }

    /// Move to `Stopped`, returning the previous run if there was one.
    pub fn take(&mut self) -> Option<Running> {
        match std::mem::replace(self, RunState::Stopped) {
            RunState::Running(running) => Some(running),
            RunState::Stopped => None,
        }
    }
}
