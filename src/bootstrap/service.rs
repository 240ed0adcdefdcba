//! Firewall service: lifecycle controller and control-plane facade.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, span, warn, Instrument, Level};

use crate::config::{Config, ListenerConfig};
use crate::firewall::{
    DecisionEngine, DirectionClassifier, FirewallError, FirewallStats, LoggingEnforcer,
    PacketDescriptor, Rule, RuleRequest, SharedEnforcer, Statistics, Verdict,
};
use crate::listener::PacketListener;
use crate::pipeline::DecisionProcessor;
use crate::store::{InMemoryRuleStore, SharedRuleStore};
use crate::telemetry::counters;

use super::state::{RunState, Running};
use super::Shutdown;

/// Packet-admission firewall.
///
/// Owns the rule store, the decision engine and, while running, the ingestion
/// listeners and the decision loop. All methods take `&self`; the service is
/// meant to be shared behind an `Arc`.
pub struct FirewallService {
    listener: ListenerConfig,
    store: SharedRuleStore,
    engine: Arc<DecisionEngine>,
    enforcer: SharedEnforcer,
    state: Mutex<RunState>,
}

impl FirewallService {
    /// Build a service from configuration, using the host's interfaces for
    /// direction classification and logging-only enforcement.
    ///
    /// Seed rules are not added; see [`seed_rules`](Self::seed_rules).
    pub fn new(config: &Config) -> Self {
        let store: SharedRuleStore = Arc::new(InMemoryRuleStore::with_config(&config.store));
        let classifier = Arc::new(DirectionClassifier::system(config.classifier.refresh));

        Self::with_components(
            config.listener.clone(),
            store,
            classifier,
            Arc::new(LoggingEnforcer),
        )
    }

    /// Build a service from explicit components.
    pub fn with_components(
        listener: ListenerConfig,
        store: SharedRuleStore,
        classifier: Arc<DirectionClassifier>,
        enforcer: SharedEnforcer,
    ) -> Self {
        let stats = Arc::new(Statistics::new());
        let engine = Arc::new(DecisionEngine::new(store.clone(), classifier, stats));

        Self {
            listener,
            store,
            engine,
            enforcer,
            state: Mutex::new(RunState::Stopped),
        }
    }

    /// Add every seed rule through the validating path.
    ///
    /// Stops at the first invalid rule.
    pub fn seed_rules(&self, requests: &[RuleRequest]) -> Result<usize, FirewallError> {
        for request in requests {
            self.add_rule(request.clone())?;
        }

        if !requests.is_empty() {
            info!(count = requests.len(), "seed rules loaded");
        }
        Ok(requests.len())
    }

    /// Bind the listeners and start the decision loop.
    ///
    /// Fails with [`FirewallError::AlreadyRunning`] if already running, or with
    /// [`FirewallError::Bind`] if either listener cannot bind. The service is
    /// left stopped on error.
    pub async fn start(&self) -> Result<SocketAddr, FirewallError> {
        let mut state = self.state.lock().await;
        if state.is_running() {
            return Err(FirewallError::AlreadyRunning);
        }

        let shutdown = Shutdown::new();
        let mut listener = PacketListener::new(self.listener.clone(), self.engine.statistics());
        let (local_addr, packets) = listener
            .start(self.listener.address, shutdown.clone())
            .await?;

        self.engine.statistics().mark_started();

        let processor = DecisionProcessor::new(self.engine.clone(), self.enforcer.clone());
        let decision = tokio::spawn(
            processor
                .run(packets, shutdown.subscribe())
                .instrument(span!(Level::INFO, "decision")),
        );

        *state = RunState::Running(Running {
            shutdown,
            listener,
            decision,
            local_addr,
        });

        counters::firewall_started();
        info!(
            address = %local_addr,
            rules = self.store.len(),
            enforcer = self.enforcer.name(),
            "firewall started"
        );

        Ok(local_addr)
    }

    /// Stop the listeners and the decision loop.
    ///
    /// Does nothing when already stopped. Once this returns, no queued packet
    /// is evaluated any more.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let Some(mut running) = state.take() else {
            return;
        };

        running.shutdown.trigger();
        running.listener.stop().await;

        if let Err(e) = running.decision.await {
            error!(error = %e, "decision loop failed");
        }

        counters::firewall_stopped();
        info!(address = %running.local_addr, "firewall stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_running()
    }

    /// Address the listeners are bound to, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.state.lock().await.local_addr()
    }

    /// Validate and store a rule.
    ///
    /// A rule with an existing ID replaces the stored one.
    pub fn add_rule(&self, request: RuleRequest) -> Result<Rule, FirewallError> {
        let rule = match request.validate() {
            Ok(rule) => rule,
            Err(e) => {
                warn!(error = %e, "rejected rule");
                return Err(e);
            }
        };

        self.store.add(rule.clone())?;
        counters::rule_added();

        info!(
            id = %rule.id,
            port = rule.port,
            protocol = ?rule.protocol,
            action = ?rule.action,
            direction = ?rule.direction,
            "rule added"
        );

        Ok(rule)
    }

    /// Remove a rule by ID.
    pub fn remove_rule(&self, id: &str) -> Result<Rule, FirewallError> {
        let rule = self
            .store
            .remove(id)?
            .ok_or_else(|| FirewallError::RuleNotFound(id.to_string()))?;

        counters::rule_removed();
        info!(id = %rule.id, port = rule.port, "rule removed");

        Ok(rule)
    }

    pub fn rule(&self, id: &str) -> Option<Rule> {
        self.store.get(id)
    }

    /// All rules in evaluation order.
    pub fn rules(&self) -> Vec<Rule> {
        self.store.list()
    }

    pub fn clear_rules(&self) -> Result<(), FirewallError> {
        let count = self.store.len();
        self.store.clear()?;
        info!(count, "rules cleared");
        Ok(())
    }

    /// Evaluate a packet without enforcing the verdict.
    ///
    /// Counts toward the statistics like a packet from the listeners.
    pub fn check_packet(&self, packet: &PacketDescriptor) -> Verdict {
        self.engine.evaluate(packet)
    }

    pub fn stats(&self) -> FirewallStats {
        self.engine.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::firewall::testing::RecordingEnforcer;
    use crate::firewall::{Protocol, StaticAddresses};

    fn service_with(enforcer: SharedEnforcer) -> FirewallService {
        let listener = ListenerConfig {
            address: "127.0.0.1:0".parse().unwrap(),
            queue_capacity: 16,
            udp_buffer_size: 1024,
        };
        let classifier = Arc::new(DirectionClassifier::new(
            StaticAddresses(vec!["10.0.0.1".parse().unwrap()]),
            Duration::ZERO,
        ));
        FirewallService::with_components(
            listener,
            Arc::new(InMemoryRuleStore::new()),
            classifier,
            enforcer,
        )
    }

    fn service() -> FirewallService {
        service_with(Arc::new(LoggingEnforcer))
    }

    fn tcp_to(port: u16) -> PacketDescriptor {
        PacketDescriptor::new(
            Protocol::Tcp,
            "203.0.113.9".parse().unwrap(),
            40000,
            "10.0.0.1".parse().unwrap(),
            port,
        )
    }

    #[test]
    fn test_add_rule_generates_id() {
        let service = service();
        let rule = service
            .add_rule(RuleRequest::new(80, "tcp", "deny", "both"))
            .unwrap();

        assert!(!rule.id.is_empty());
        assert_eq!(service.rule(&rule.id), Some(rule.clone()));
        assert_eq!(service.rules(), vec![rule]);
    }

    #[test]
    fn test_invalid_rule_is_not_stored() {
        let service = service();

        let err = service
            .add_rule(RuleRequest::new(70000, "tcp", "deny", "both"))
            .unwrap_err();
        assert!(matches!(err, FirewallError::InvalidPort(70000)));

        let err = service
            .add_rule(RuleRequest::new(80, "icmp", "deny", "both"))
            .unwrap_err();
        assert!(err.is_validation());

        assert!(service.rules().is_empty());
    }

    #[test]
    fn test_remove_rule() {
        let service = service();
        let rule = service
            .add_rule(RuleRequest::new(80, "tcp", "deny", "both").with_id("web"))
            .unwrap();

        assert_eq!(service.check_packet(&tcp_to(80)), Verdict::Deny);

        let removed = service.remove_rule("web").unwrap();
        assert_eq!(removed, rule);
        assert_eq!(service.check_packet(&tcp_to(80)), Verdict::Allow);

        let err = service.remove_rule("web").unwrap_err();
        assert!(matches!(err, FirewallError::RuleNotFound(id) if id == "web"));
    }

    #[test]
    fn test_clear_rules() {
        let service = service();
        service
            .add_rule(RuleRequest::new(22, "tcp", "deny", "both"))
            .unwrap();
        service
            .add_rule(RuleRequest::new(23, "tcp", "deny", "both"))
            .unwrap();

        service.clear_rules().unwrap();
        assert!(service.rules().is_empty());
        assert_eq!(service.check_packet(&tcp_to(22)), Verdict::Allow);
    }

    #[test]
    fn test_seed_rules_stop_at_first_invalid() {
        let service = service();
        let seeds = vec![
            RuleRequest::new(22, "tcp", "deny", "inbound"),
            RuleRequest::new(-1, "tcp", "deny", "inbound"),
            RuleRequest::new(23, "tcp", "deny", "inbound"),
        ];

        assert!(service.seed_rules(&seeds).is_err());
        assert_eq!(service.rules().len(), 1);
    }

    #[test]
    fn test_check_packet_counts_but_does_not_enforce() {
        let enforcer = Arc::new(RecordingEnforcer::default());
        let service = service_with(enforcer.clone());
        service
            .add_rule(RuleRequest::new(80, "tcp", "deny", "both"))
            .unwrap();

        assert_eq!(service.check_packet(&tcp_to(80)), Verdict::Deny);
        assert_eq!(service.check_packet(&tcp_to(443)), Verdict::Allow);

        let stats = service.stats();
        assert_eq!(stats.packets_processed, 2);
        assert_eq!(stats.packets_blocked, 1);
        assert_eq!(stats.packets_allowed, 1);
        assert!(enforcer.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let service = service();
        assert!(!service.is_running().await);
        assert_eq!(service.local_addr().await, None);

        // Stop while stopped is a no-op
        service.stop().await;

        let addr = service.start().await.unwrap();
        assert!(service.is_running().await);
        assert_eq!(service.local_addr().await, Some(addr));

        let err = service.start().await.unwrap_err();
        assert!(matches!(err, FirewallError::AlreadyRunning));
        assert!(service.is_running().await);

        service.stop().await;
        assert!(!service.is_running().await);
        service.stop().await;

        // Restart after stop
        service.start().await.unwrap();
        assert!(service.is_running().await);
        service.stop().await;
    }

    #[tokio::test]
    async fn test_rules_survive_restart() {
        let service = service();
        service
            .add_rule(RuleRequest::new(22, "tcp", "deny", "both").with_id("ssh"))
            .unwrap();

        service.start().await.unwrap();
        service.stop().await;
        service.start().await.unwrap();

        assert!(service.rule("ssh").is_some());
        service.stop().await;
    }
}
