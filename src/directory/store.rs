//! Directory collections.
//!
//! Records live in ordered vectors, one per entity kind. Lookups are linear
//! scans by key; uniqueness is maintained by the reconciler, not here.

use serde::Serialize;

use super::entities::{Alert, AlertLevel, Manager, Node, Sensor, SensorAlert, ServerOption};

/// The replicated mirror of server-authoritative state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Directory {
    pub options: Vec<ServerOption>,
    pub nodes: Vec<Node>,
    pub sensors: Vec<Sensor>,
    pub managers: Vec<Manager>,
    pub alerts: Vec<Alert>,
    pub alert_levels: Vec<AlertLevel>,
    /// Transient buffer of recent sensor alerts, flushed to storage each tick.
    pub sensor_alerts: Vec<SensorAlert>,
}

/// Which lookup failed while tracing a sensor to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginMiss {
    UnknownSensor,
    UnknownNode { node_id: i64 },
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_option(&self, kind: &str) -> Option<&ServerOption> {
        self.options.iter().find(|o| o.kind == kind)
    }

    pub fn find_node(&self, node_id: i64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    pub fn find_sensor(&self, sensor_id: i64) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.sensor_id == sensor_id)
    }

    pub fn find_sensor_mut(&mut self, sensor_id: i64) -> Option<&mut Sensor> {
        self.sensors.iter_mut().find(|s| s.sensor_id == sensor_id)
    }

    pub fn find_manager(&self, manager_id: i64) -> Option<&Manager> {
        self.managers.iter().find(|m| m.manager_id == manager_id)
    }

    pub fn find_alert(&self, alert_id: i64) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.alert_id == alert_id)
    }

    pub fn find_alert_level(&self, level: i32) -> Option<&AlertLevel> {
        self.alert_levels.iter().find(|l| l.level == level)
    }

    /// The sensor `sensor_id` together with the node that owns it.
    pub fn sensor_origin(&self, sensor_id: i64) -> Result<(&Sensor, &Node), OriginMiss> {
        let sensor = self.find_sensor(sensor_id).ok_or(OriginMiss::UnknownSensor)?;
        let node = self.find_node(sensor.node_id).ok_or(OriginMiss::UnknownNode {
            node_id: sensor.node_id,
        })?;
        Ok((sensor, node))
    }

    /// Reset the per-pass `checked` marker on every mirrored record.
    pub fn unmark_all(&mut self) {
        self.options.iter_mut().for_each(|o| o.checked = false);
        self.nodes.iter_mut().for_each(|n| n.checked = false);
        self.sensors.iter_mut().for_each(|s| s.checked = false);
        self.managers.iter_mut().for_each(|m| m.checked = false);
        self.alerts.iter_mut().for_each(|a| a.checked = false);
        self.alert_levels.iter_mut().for_each(|l| l.checked = false);
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
            && self.nodes.is_empty()
            && self.sensors.is_empty()
            && self.managers.is_empty()
            && self.alerts.is_empty()
            && self.alert_levels.is_empty()
    }
}
