//! Storage document for a directory flush.
//!
//! Mirrors the directory collections verbatim so a backend can persist them
//! without knowing anything about reconciliation.

use serde::{Deserialize, Serialize};

use crate::directory::{Alert, AlertLevel, Directory, Manager, Node, Sensor, SensorAlert, ServerOption};

/// Everything the storage backend receives on one flush.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInformation {
    pub options: Vec<ServerOption>,
    pub nodes: Vec<Node>,
    pub sensors: Vec<Sensor>,
    pub managers: Vec<Manager>,
    pub alerts: Vec<Alert>,
    pub alert_levels: Vec<AlertLevel>,
    pub sensor_alerts: Vec<SensorAlert>,
}

impl ServerInformation {
    /// Copy the directory into a storage document.
    pub fn from_directory(directory: &Directory) -> Self {
        Self {
            options: directory.options.clone(),
            nodes: directory.nodes.clone(),
            sensors: directory.sensors.clone(),
            managers: directory.managers.clone(),
            alerts: directory.alerts.clone(),
            alert_levels: directory.alert_levels.clone(),
            sensor_alerts: directory.sensor_alerts.clone(),
        }
    }
}
