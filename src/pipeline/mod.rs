//! Decision loop.
//!
//! ```text
//! Listeners            Queue              Decision loop            Enforcer
//! ─────────            ─────              ─────────────            ────────
//!    │  descriptor       │                      │                      │
//!    ├──────────────────>│        recv          │                      │
//!    │                   ├─────────────────────>│                      │
//!    │                   │               ┌──────┴──────┐               │
//!    │                   │               │  Decision   │               │
//!    │                   │               │   Engine    │               │
//!    │                   │               └──────┬──────┘               │
//!    │                   │                      │  on_allow / on_deny  │
//!    │                   │                      ├─────────────────────>│
//! ```
//!
//! The loop exits on shutdown or when every sender is gone. Descriptors still
//! queued at shutdown are discarded without evaluation.

mod decision;

pub use decision::DecisionProcessor;
