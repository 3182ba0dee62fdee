//! JSON file storage backend.
//!
//! Writes the whole document to a sibling temp file and renames it over the
//! target, so readers only ever see a complete flush.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{ServerInfoStore, ServerInformation};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the last flushed document, if any.
    pub fn load(&self) -> anyhow::Result<Option<ServerInformation>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let info = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to decode {}", self.path.display()))?;
        Ok(Some(info))
    }
}

impl ServerInfoStore for JsonFileStore {
    fn update_server_information(&self, info: &ServerInformation) -> anyhow::Result<()> {
        let encoded = serde_json::to_vec_pretty(info).context("Failed to encode server information")?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, encoded).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move {} into place", tmp.display()))?;
        Ok(())
    }
}
