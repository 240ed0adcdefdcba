//! In-memory rule store.
//!
//! Volatile storage. All rules are lost on restart.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::debug;

use crate::config::StoreConfig;
use crate::firewall::Rule;

use super::{RuleStore, StoreError};

/// In-memory rule store.
///
/// Rules live in a map ordered by insertion sequence, with an ID index on the
/// side so lookups by ID and ordered scans are both cheap.
pub struct InMemoryRuleStore {
    inner: RwLock<Inner>,
    max_rules: usize,
}

#[derive(Default)]
struct Inner {
    by_seq: BTreeMap<u64, Rule>,
    index: HashMap<String, u64>,
    next_seq: u64,
}

impl InMemoryRuleStore {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: &StoreConfig) -> Self {
        debug!(max_rules = config.max_rules, "creating in-memory rule store");

        Self {
            inner: RwLock::new(Inner::default()),
            max_rules: config.max_rules,
        }
    }
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleStore for InMemoryRuleStore {
    fn add(&self, rule: Rule) -> Result<(), StoreError> {
        let mut inner = self.inner.write();

        let existing = inner.index.get(&rule.id).copied();
        match existing {
            Some(old_seq) => {
                inner.by_seq.remove(&old_seq);
            }
            None if inner.index.len() >= self.max_rules => {
                return Err(StoreError::Full {
                    capacity: self.max_rules,
                });
            }
            None => {}
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.index.insert(rule.id.clone(), seq);
        inner.by_seq.insert(seq, rule);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<Option<Rule>, StoreError> {
        let mut inner = self.inner.write();
        let Some(seq) = inner.index.remove(id) else {
            return Ok(None);
        };
        Ok(inner.by_seq.remove(&seq))
    }

    fn get(&self, id: &str) -> Option<Rule> {
        let inner = self.inner.read();
        inner
            .index
            .get(id)
            .and_then(|seq| inner.by_seq.get(seq))
            .cloned()
    }

    fn list(&self) -> Vec<Rule> {
        self.inner.read().by_seq.values().cloned().collect()
    }

    fn list_by_port(&self, port: u16) -> Vec<Rule> {
        self.inner
            .read()
            .by_seq
            .values()
            .filter(|rule| rule.port == port)
            .cloned()
            .collect()
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.by_seq.clear();
        inner.index.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.read().index.len()
    }
}
