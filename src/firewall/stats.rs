//! Statistics register.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use super::types::Verdict;

/// Packet counters shared by the decision engine and the ingestion pipeline.
///
/// `processed` is not stored: it is always `allowed + blocked`.
#[derive(Debug)]
pub struct Statistics {
    allowed: AtomicU64,
    blocked: AtomicU64,
    dropped: AtomicU64,
    start_time: RwLock<DateTime<Utc>>,
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            allowed: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            start_time: RwLock::new(Utc::now()),
        }
    }

    /// Count one evaluated packet.
    pub fn record(&self, verdict: Verdict) {
        match verdict {
            Verdict::Allow => self.allowed.fetch_add(1, Ordering::Relaxed),
            Verdict::Deny => self.blocked.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Count one descriptor dropped on queue overflow.
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset the start timestamp.
    pub fn mark_started(&self) {
        *self.start_time.write() = Utc::now();
    }

    pub fn snapshot(&self) -> FirewallStats {
        let allowed = self.allowed.load(Ordering::Relaxed);
        let blocked = self.blocked.load(Ordering::Relaxed);
        let start_time = *self.start_time.read();
        let uptime = (Utc::now() - start_time).num_seconds().max(0) as u64;

        FirewallStats {
            packets_processed: allowed + blocked,
            packets_allowed: allowed,
            packets_blocked: blocked,
            packets_dropped: self.dropped.load(Ordering::Relaxed),
            start_time,
            uptime_seconds: uptime,
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the statistics register.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirewallStats {
    pub packets_processed: u64,
    pub packets_allowed: u64,
    pub packets_blocked: u64,
    pub packets_dropped: u64,
    pub start_time: DateTime<Utc>,
    pub uptime_seconds: u64,
}
