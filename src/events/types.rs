//! Typed delta events.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::directory::NodeType;

/// One detected change, stamped with the unix time it was emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time_occurred: i64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(time_occurred: i64, kind: EventKind) -> Self {
        Self {
            time_occurred,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    NewOption {
        option_kind: String,
        value: String,
    },
    ChangeOption {
        option_kind: String,
        old_value: String,
        new_value: String,
    },
    NewNode {
        hostname: String,
        node_type: NodeType,
        instance: String,
    },
    /// Carries old and new values of every descriptive node field.
    ChangeNode {
        old_hostname: String,
        new_hostname: String,
        old_node_type: NodeType,
        new_node_type: NodeType,
        old_instance: String,
        new_instance: String,
        old_version: f64,
        new_version: f64,
        old_revision: i64,
        new_revision: i64,
    },
    DeleteNode {
        hostname: String,
        node_type: NodeType,
        instance: String,
    },
    NewSensor {
        hostname: String,
        description: String,
        state: i32,
    },
    ChangeSensor {
        old_alert_delay: i64,
        new_alert_delay: i64,
        old_description: String,
        new_description: String,
    },
    DeleteSensor {
        description: String,
    },
    NewManager {
        hostname: String,
        description: String,
    },
    ChangeManager {
        old_description: String,
        new_description: String,
    },
    DeleteManager {
        description: String,
    },
    NewAlert {
        hostname: String,
        description: String,
    },
    ChangeAlert {
        old_description: String,
        new_description: String,
    },
    DeleteAlert {
        description: String,
    },
    ConnectedChange {
        hostname: String,
        node_type: NodeType,
        instance: String,
        connected: bool,
    },
    SensorTimeOut {
        hostname: String,
        description: String,
        state: i32,
    },
    SensorAlert {
        description: String,
        state: i32,
        alert_levels: BTreeSet<i32>,
    },
    StateChange {
        hostname: String,
        description: String,
        state: i32,
    },
    NewVersion {
        used_version: f64,
        used_revision: i64,
        new_version: f64,
        new_revision: i64,
        instance: String,
        hostname: String,
    },
}

impl EventKind {
    /// Stable event name, as used in log lines and the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::NewOption { .. } => "new_option",
            EventKind::ChangeOption { .. } => "change_option",
            EventKind::NewNode { .. } => "new_node",
            EventKind::ChangeNode { .. } => "change_node",
            EventKind::DeleteNode { .. } => "delete_node",
            EventKind::NewSensor { .. } => "new_sensor",
            EventKind::ChangeSensor { .. } => "change_sensor",
            EventKind::DeleteSensor { .. } => "delete_sensor",
            EventKind::NewManager { .. } => "new_manager",
            EventKind::ChangeManager { .. } => "change_manager",
            EventKind::DeleteManager { .. } => "delete_manager",
            EventKind::NewAlert { .. } => "new_alert",
            EventKind::ChangeAlert { .. } => "change_alert",
            EventKind::DeleteAlert { .. } => "delete_alert",
            EventKind::ConnectedChange { .. } => "connected_change",
            EventKind::SensorTimeOut { .. } => "sensor_time_out",
            EventKind::SensorAlert { .. } => "sensor_alert",
            EventKind::StateChange { .. } => "state_change",
            EventKind::NewVersion { .. } => "new_version",
        }
    }
}
