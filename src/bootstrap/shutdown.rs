use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

/// Shutdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Stopping,
}

/// Cancellation signal broadcast to every task of one firewall run.
///
/// Tasks hold a [`ShutdownSignal`] and check it at the top of each loop
/// iteration. Triggering is idempotent.
#[derive(Debug)]
pub struct Shutdown {
    state: watch::Sender<ShutdownState>,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        let (state, _) = watch::channel(ShutdownState::Running);
        Arc::new(Self { state })
    }

    /// Get current state
    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    pub fn is_triggered(&self) -> bool {
        self.state() != ShutdownState::Running
    }

    /// Subscribe to the signal
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.state.subscribe(),
        }
    }

    /// Signal every subscriber to stop
    pub fn trigger(&self) {
        if self.is_triggered() {
            return;
        }

        info!(subscribers = self.state.receiver_count(), "shutdown triggered");
        self.state.send_replace(ShutdownState::Stopping);
    }
}

/// Receiving half of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<ShutdownState>,
}

impl ShutdownSignal {
    /// Wait until shutdown is triggered.
    ///
    /// Returns immediately if it already was, or if the [`Shutdown`] was dropped.
    pub async fn recv(&mut self) {
        if self
            .rx
            .wait_for(|state| *state != ShutdownState::Running)
            .await
            .is_err()
        {
            debug!("shutdown sender dropped");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() != ShutdownState::Running
    }
}
