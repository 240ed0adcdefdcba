//! portgate - port-based packet admission firewall.
//!
//! Accepts TCP connections and UDP datagrams on one address, turns each into a
//! packet descriptor and decides allow or deny from a runtime-editable rule
//! set. Verdicts go to a pluggable enforcement backend.

pub mod bootstrap;
pub mod config;
pub mod firewall;
pub mod listener;
pub mod pipeline;
pub mod store;
pub mod telemetry;
