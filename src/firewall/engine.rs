//! Rule evaluation engine.
//!
//! First-match-wins over the rules bound to a packet's ports, with a
//! default-permit policy when nothing applies.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::store::SharedRuleStore;
use crate::telemetry::counters;

use super::direction::DirectionClassifier;
use super::packet::PacketDescriptor;
use super::stats::{FirewallStats, Statistics};
use super::types::{Direction, Rule, RuleDirection, Verdict};

/// Decision engine.
///
/// Reads rules from the store on every evaluation, so rule changes take
/// effect for the next packet.
pub struct DecisionEngine {
    store: SharedRuleStore,
    classifier: Arc<DirectionClassifier>,
    stats: Arc<Statistics>,
}

impl DecisionEngine {
    pub fn new(
        store: SharedRuleStore,
        classifier: Arc<DirectionClassifier>,
        stats: Arc<Statistics>,
    ) -> Self {
        Self {
            store,
            classifier,
            stats,
        }
    }

    /// Evaluate a packet and count the verdict.
    ///
    /// Every call counts exactly one processed packet, either allowed or
    /// blocked.
    pub fn evaluate(&self, packet: &PacketDescriptor) -> Verdict {
        trace!(packet = %packet, "evaluating packet");

        let verdict = match self.first_match(packet) {
            Some(rule) => {
                let verdict = Verdict::from(rule.action);
                if verdict == Verdict::Deny {
                    debug!(rule = %rule.id, packet = %packet, "packet blocked by rule");
                } else {
                    trace!(rule = %rule.id, "packet allowed by rule");
                }
                verdict
            }
            None => Verdict::Allow,
        };

        self.stats.record(verdict);
        counters::packet_evaluated(packet.protocol, verdict);
        verdict
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> FirewallStats {
        self.stats.snapshot()
    }

    /// Shared statistics register.
    pub fn statistics(&self) -> Arc<Statistics> {
        self.stats.clone()
    }

    /// Rules bound to the destination port, then to the source port.
    fn candidates(&self, packet: &PacketDescriptor) -> Vec<Rule> {
        let mut rules = self.store.list_by_port(packet.destination_port);

        if let Some(source_port) = packet.source_port() {
            if source_port != packet.destination_port {
                let mut seen: HashSet<String> = rules.iter().map(|r| r.id.clone()).collect();
                rules.extend(
                    self.store
                        .list_by_port(source_port)
                        .into_iter()
                        .filter(|r| seen.insert(r.id.clone())),
                );
            }
        }

        rules
    }

    fn first_match(&self, packet: &PacketDescriptor) -> Option<Rule> {
        let candidates = self.candidates(packet);
        if candidates.is_empty() {
            return None;
        }

        // Interface lookup only happens if some candidate needs a direction.
        let mut direction: Option<Direction> = None;

        candidates.into_iter().find(|rule| {
            if !rule.protocol.matches(packet.protocol) {
                return false;
            }

            if rule.direction != RuleDirection::Both {
                let packet_direction =
                    *direction.get_or_insert_with(|| self.classifier.classify(packet));
                if !rule.direction.matches(packet_direction) {
                    return false;
                }
            }

            rule.covers_port(packet.source_port, packet.destination_port)
        })
    }
}
