//! Mirror configuration.
//!
//! Loaded from a JSON document; every field has a default so partial
//! documents are accepted.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Days sensor alerts are retained. 0 drops the buffer at every tick.
    pub sensor_alert_life_span: u32,
    /// Days events are retained. 0 disables live-update and version events.
    pub events_life_span: u32,
    /// Client connection timeout in seconds.
    pub connection_timeout: i64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            sensor_alert_life_span: 30,
            events_life_span: 30,
            connection_timeout: 30,
        }
    }
}

impl MirrorConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse mirror configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.connection_timeout >= 0,
            "connection_timeout must not be negative, got {}",
            self.connection_timeout
        );
        Ok(())
    }

    /// Load the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn events_enabled(&self) -> bool {
        self.events_life_span != 0
    }

    pub fn retains_sensor_alerts(&self) -> bool {
        self.sensor_alert_life_span != 0
    }

    /// Oldest event time still retained at `now`, if retention is bounded.
    pub fn event_cutoff(&self, now: i64) -> Option<i64> {
        if self.events_life_span == 0 {
            return None;
        }
        Some(now.saturating_sub(i64::from(self.events_life_span) * SECONDS_PER_DAY))
    }
}
