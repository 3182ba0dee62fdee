//! Structured logging with pass context.
//!
//! Provides logging macros and utilities that include the pass id and the
//! operation name in every log message for easy correlation.

pub mod structured;

pub use structured::*;
