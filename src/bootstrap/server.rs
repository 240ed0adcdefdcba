use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, span, Instrument, Level};

use crate::config::Config;

use super::FirewallService;

/// Process-level runner.
///
/// Builds the service from configuration, loads the seed rules, starts it and
/// keeps it running until SIGINT or SIGTERM.
pub struct Server {
    config: Config,
    service: Arc<FirewallService>,
}

impl Server {
    pub fn new(config: Config) -> Result<Self> {
        let service = Arc::new(FirewallService::new(&config));
        service.seed_rules(&config.rules)?;

        Ok(Self { config, service })
    }

    /// Shared handle to the running service.
    pub fn service(&self) -> Arc<FirewallService> {
        self.service.clone()
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let span = span!(Level::INFO, "portgate", version = env!("CARGO_PKG_VERSION"));

        async move {
            info!(
                address = %self.config.listener.address,
                queue_capacity = self.config.listener.queue_capacity,
                classifier_refresh = ?self.config.classifier.refresh,
                max_rules = self.config.store.max_rules,
                "starting portgate"
            );

            self.service.start().await?;

            wait_for_shutdown().await?;
            info!("shutdown signal received");

            self.service.stop().await;

            let stats = self.service.stats();
            info!(
                processed = stats.packets_processed,
                allowed = stats.packets_allowed,
                blocked = stats.packets_blocked,
                dropped = stats.packets_dropped,
                "portgate stopped"
            );

            Ok::<(), anyhow::Error>(())
        }
        .instrument(span)
        .await
    }
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("received SIGINT (Ctrl+C)");
            }
            _ = terminate.recv() => {
                info!("received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("received Ctrl+C");
    }

    Ok(())
}
