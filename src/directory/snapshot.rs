//! Full-state snapshot received from the server.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::entities::{Alert, AlertLevel, Manager, Node, Sensor, ServerOption};

/// Ordered sequences of every mirrored collection, as the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub options: Vec<ServerOption>,
    pub nodes: Vec<Node>,
    pub sensors: Vec<Sensor>,
    pub managers: Vec<Manager>,
    pub alerts: Vec<Alert>,
    pub alert_levels: Vec<AlertLevel>,
}

impl Snapshot {
    /// Decode a snapshot from its JSON document form.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to decode snapshot JSON")
    }

    pub fn entity_count(&self) -> usize {
        self.options.len()
            + self.nodes.len()
            + self.sensors.len()
            + self.managers.len()
            + self.alerts.len()
            + self.alert_levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_partial_snapshot() {
        let snapshot = Snapshot::from_json_str(
            r#"{
                "options": [{"kind": "alertSystemActive", "value": "1"}],
                "nodes": [{"node_id": 1, "hostname": "h1", "node_type": "manager",
                           "instance": "managerClientDatabase", "connected": true,
                           "version": 0.4, "revision": 0}]
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.options.len(), 1);
        assert_eq!(snapshot.nodes[0].hostname, "h1");
        assert!(snapshot.sensors.is_empty());
        assert_eq!(snapshot.entity_count(), 2);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = Snapshot::from_json_str("not json{").unwrap_err();
        assert!(err.to_string().contains("snapshot"));
    }
}
