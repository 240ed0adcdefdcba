use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::firewall::RuleRequest;

/// Root configuration for portgate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Packet ingestion listener
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Direction classifier settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Rule store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Rules added on startup
    #[serde(default)]
    pub rules: Vec<RuleRequest>,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    /// Bind address shared by the TCP and UDP listeners
    #[serde(default = "default_address")]
    pub address: SocketAddr,

    /// Packet queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Receive buffer for datagrams
    #[serde(default = "default_udp_buffer_size")]
    pub udp_buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            queue_capacity: default_queue_capacity(),
            udp_buffer_size: default_udp_buffer_size(),
        }
    }
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9000))
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_udp_buffer_size() -> usize {
    1024
}

/// Direction classifier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// How long interface addresses are cached (0s = look up per packet)
    #[serde(default = "default_refresh", with = "humantime_serde")]
    pub refresh: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            refresh: default_refresh(),
        }
    }
}

fn default_refresh() -> Duration {
    Duration::from_secs(5)
}

/// Rule store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of stored rules
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_rules: default_max_rules(),
        }
    }
}

fn default_max_rules() -> usize {
    10_000
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable structured JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Humantime serde support module
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
