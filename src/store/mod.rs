//! Rule storage.
//!
//! Rules are held behind the [`RuleStore`] trait:
//!
//! ```text
//!   FirewallService ──add/remove/clear──┐
//!                                       ▼
//!                               ┌──────────────┐
//!   DecisionEngine ──list_by_port──▶│  RuleStore   │
//!                               └──────┬───────┘
//!                                      │
//!                               ┌──────┴───────┐
//!                               │    Memory    │
//!                               └──────────────┘
//! ```
//!
//! Every listing returns rules in insertion order, which is the order the
//! decision engine evaluates them in.

mod memory;

pub use memory::InMemoryRuleStore;

use std::sync::Arc;

use crate::firewall::Rule;

/// Rule store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("rule store is full ({capacity} rules)")]
    Full { capacity: usize },
}

/// Keyed rule collection.
///
/// Implementations must allow concurrent readers and serialize writers.
/// Rules handed to [`add`](RuleStore::add) are already validated.
pub trait RuleStore: Send + Sync {
    /// Insert a rule, replacing any rule with the same ID.
    fn add(&self, rule: Rule) -> Result<(), StoreError>;

    /// Remove a rule by ID, returning it if present.
    fn remove(&self, id: &str) -> Result<Option<Rule>, StoreError>;

    /// Get a rule by ID.
    fn get(&self, id: &str) -> Option<Rule>;

    /// All rules, in insertion order.
    fn list(&self) -> Vec<Rule>;

    /// Rules for a port, in insertion order.
    fn list_by_port(&self, port: u16) -> Vec<Rule>;

    /// Remove every rule.
    fn clear(&self) -> Result<(), StoreError>;

    /// Number of stored rules.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared rule store handle.
pub type SharedRuleStore = Arc<dyn RuleStore>;
