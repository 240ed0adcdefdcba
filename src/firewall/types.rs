//! Firewall types.
//!
//! Defines the core data structures for the admission engine:
//! - Rules and the unvalidated rule requests they are built from
//! - Protocol, action and direction enums
//! - Verdicts and errors

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Sequence appended to generated rule IDs so that two rules created within
/// the same clock tick still get distinct identifiers.
static RULE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Transport protocol of an observed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol selector on a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleProtocol {
    Tcp,
    Udp,
    Both,
}

impl RuleProtocol {
    /// Check whether a packet of the given protocol is covered.
    pub fn matches(&self, protocol: Protocol) -> bool {
        match self {
            RuleProtocol::Both => true,
            RuleProtocol::Tcp => protocol == Protocol::Tcp,
            RuleProtocol::Udp => protocol == Protocol::Udp,
        }
    }
}

impl FromStr for RuleProtocol {
    type Err = FirewallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(RuleProtocol::Tcp),
            "udp" => Ok(RuleProtocol::Udp),
            "both" => Ok(RuleProtocol::Both),
            other => Err(FirewallError::InvalidProtocol(other.to_string())),
        }
    }
}

/// Action taken when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Deny,
}

impl FromStr for Action {
    type Err = FirewallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Action::Allow),
            "deny" => Ok(Action::Deny),
            other => Err(FirewallError::InvalidAction(other.to_string())),
        }
    }
}

/// Direction selector on a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDirection {
    Inbound,
    Outbound,
    Both,
}

impl RuleDirection {
    /// Check whether a packet classified as `direction` is covered.
    ///
    /// A specific direction never covers an `Unknown` packet.
    pub fn matches(&self, direction: Direction) -> bool {
        match self {
            RuleDirection::Both => true,
            RuleDirection::Inbound => direction == Direction::Inbound,
            RuleDirection::Outbound => direction == Direction::Outbound,
        }
    }
}

impl FromStr for RuleDirection {
    type Err = FirewallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(RuleDirection::Inbound),
            "outbound" => Ok(RuleDirection::Outbound),
            "both" => Ok(RuleDirection::Both),
            other => Err(FirewallError::InvalidDirection(other.to_string())),
        }
    }
}

/// Direction of a packet relative to the local host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
    Unknown,
}

/// Outcome of evaluating a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

impl From<Action> for Verdict {
    fn from(action: Action) -> Self {
        match action {
            Action::Allow => Verdict::Allow,
            Action::Deny => Verdict::Deny,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow => f.write_str("allow"),
            Verdict::Deny => f.write_str("deny"),
        }
    }
}

/// A validated, persisted firewall rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub port: u16,
    pub protocol: RuleProtocol,
    pub action: Action,
    pub direction: RuleDirection,
    pub created_at: DateTime<Utc>,
}

impl Rule {
    /// Check whether the rule's port is one of the packet's ports.
    pub fn covers_port(&self, source_port: u16, destination_port: u16) -> bool {
        self.port == destination_port || self.port == source_port
    }
}

/// Caller-supplied rule, not yet validated.
///
/// Enum fields are kept as strings and the port as a wide signed integer so
/// that out-of-range values reach validation instead of failing to decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub port: i64,
    pub protocol: String,
    pub action: String,
    pub direction: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RuleRequest {
    pub fn new(port: i64, protocol: &str, action: &str, direction: &str) -> Self {
        Self {
            id: None,
            port,
            protocol: protocol.to_string(),
            action: action.to_string(),
            direction: direction.to_string(),
            created_at: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Validate the request and build a rule, assigning an ID and creation
    /// time when the caller omitted them.
    pub fn validate(self) -> Result<Rule, FirewallError> {
        let port = u16::try_from(self.port).map_err(|_| FirewallError::InvalidPort(self.port))?;
        let protocol = self.protocol.parse::<RuleProtocol>()?;
        let action = self.action.parse::<Action>()?;
        let direction = self.direction.parse::<RuleDirection>()?;

        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => generate_rule_id(),
        };

        Ok(Rule {
            id,
            port,
            protocol,
            action,
            direction,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

fn generate_rule_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = RULE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("rule_{}_{}", nanos, seq)
}

/// Firewall error.
#[derive(Debug, thiserror::Error)]
pub enum FirewallError {
    #[error("invalid port number: {0}")]
    InvalidPort(i64),

    #[error("invalid protocol: {0}")]
    InvalidProtocol(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invalid direction: {0}")]
    InvalidDirection(String),

    #[error("firewall is already running")]
    AlreadyRunning,

    #[error("failed to bind {protocol} listener on {address}: {source}")]
    Bind {
        protocol: Protocol,
        address: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("rule not found: {0}")]
    RuleNotFound(String),

    #[error("rule store error: {0}")]
    Store(#[from] StoreError),
}

impl FirewallError {
    /// Check if this error came from rule validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FirewallError::InvalidPort(_)
                | FirewallError::InvalidProtocol(_)
                | FirewallError::InvalidAction(_)
                | FirewallError::InvalidDirection(_)
        )
    }
}
