//! In-memory storage backend.
//!
//! Records every flushed document. Can be switched into a failing mode to
//! exercise the retry path of the tick.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::bail;
use parking_lot::Mutex;

use super::{ServerInfoStore, ServerInformation};

#[derive(Debug, Default)]
pub struct MemoryStore {
    flushes: Mutex<Vec<ServerInformation>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent flushes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.lock().len()
    }

    pub fn last(&self) -> Option<ServerInformation> {
        self.flushes.lock().last().cloned()
    }
}

impl ServerInfoStore for MemoryStore {
    fn update_server_information(&self, info: &ServerInformation) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("memory store is in failing mode");
        }
        self.flushes.lock().push(info.clone());
        Ok(())
    }
}
