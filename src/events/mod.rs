//! Event log module.
//!
//! Typed delta events emitted by reconciliation, live updates and ticks,
//! and the append-only log downstream consumers read them from.

pub mod event_log;
pub mod types;

pub use event_log::*;
pub use types::*;
