//! Pass context management.
//!
//! Provides the pass id and receive time shared by every event and log line
//! produced during one reconciliation, ingestion or tick call.

use chrono::Utc;
use uuid::Uuid;

use crate::logging::structured::LogContext;

/// Context for one pass over the directory.
#[derive(Debug, Clone)]
pub struct PassContext {
    pub pass_id: String,
    /// Unix time stamped on every event emitted during the pass.
    pub time_received: i64,
}

impl PassContext {
    pub fn new() -> Self {
        Self::at(Utc::now().timestamp())
    }

    /// Context with a fixed receive time.
    pub fn at(time_received: i64) -> Self {
        let pass_id = format!("pass-{}", &Uuid::new_v4().to_string()[..8]);
        Self {
            pass_id,
            time_received,
        }
    }

    pub fn log_context(&self, op: &str) -> LogContext {
        LogContext::new(&self.pass_id).with_op(op)
    }
}

impl Default for PassContext {
    fn default() -> Self {
        Self::new()
    }
}
