/// Metric counters, recorded through the `metrics` facade.
///
/// Nothing is exported unless the embedding process installs a recorder.
pub mod counters {
    use crate::firewall::{Protocol, Verdict};

    // ============================================================================
    // DECISION METRICS
    // ============================================================================

    pub fn packet_evaluated(protocol: Protocol, verdict: Verdict) {
        let verdict = match verdict {
            Verdict::Allow => "allow",
            Verdict::Deny => "deny",
        };
        metrics::counter!(
            "portgate.packets.evaluated",
            "protocol" => protocol.as_str(),
            "verdict" => verdict
        )
        .increment(1);
    }

    // ============================================================================
    // INGESTION METRICS
    // ============================================================================

    pub fn packet_enqueued(protocol: Protocol) {
        metrics::counter!("portgate.packets.enqueued", "protocol" => protocol.as_str()).increment(1);
    }

    pub fn packet_dropped(protocol: Protocol) {
        metrics::counter!("portgate.packets.dropped", "protocol" => protocol.as_str()).increment(1);
    }

    pub fn listener_error(protocol: Protocol) {
        metrics::counter!("portgate.listener.errors", "protocol" => protocol.as_str()).increment(1);
    }

    // ============================================================================
    // CONTROL METRICS
    // ============================================================================

    pub fn rule_added() {
        metrics::counter!("portgate.rules.added").increment(1);
    }

    pub fn rule_removed() {
        metrics::counter!("portgate.rules.removed").increment(1);
    }

    pub fn firewall_started() {
        metrics::counter!("portgate.firewall.starts").increment(1);
    }

    pub fn firewall_stopped() {
        metrics::counter!("portgate.firewall.stops").increment(1);
    }
}
