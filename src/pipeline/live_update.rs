//! Live updates.
//!
//! Sensor alerts and state changes pushed by the server between full
//! snapshots. They write straight into the directory; no mark-and-sweep.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::MirrorConfig;
use crate::directory::{Directory, OriginMiss, SensorAlert};
use crate::error::IngestError;
use crate::events::{EventKind, EventLog};
use crate::logging::structured::LogContext;
use crate::{log_debug, log_error};

use super::context::PassContext;

/// A sensor alert as announced by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorAlertNotification {
    pub server_time: i64,
    /// True when the rule engine combined several sensors into this alert.
    pub rules_activated: bool,
    pub sensor_id: i64,
    pub state: i32,
    pub description: String,
    pub alert_levels: BTreeSet<i32>,
    pub data_transfer: bool,
    pub payload: Option<Vec<u8>>,
}

/// A plain sensor state change as announced by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeNotification {
    pub server_time: i64,
    pub sensor_id: i64,
    pub state: i32,
}

pub struct LiveUpdateIngestor<'a> {
    directory: &'a mut Directory,
    events: &'a mut EventLog,
    events_enabled: bool,
    now: i64,
    log_ctx: LogContext,
}

impl<'a> LiveUpdateIngestor<'a> {
    pub fn new(
        directory: &'a mut Directory,
        events: &'a mut EventLog,
        config: &MirrorConfig,
        ctx: &PassContext,
    ) -> Self {
        Self {
            directory,
            events,
            events_enabled: config.events_enabled(),
            now: ctx.time_received,
            log_ctx: ctx.log_context("live_update"),
        }
    }

    /// Record a sensor alert. Never fails; an unknown sensor only costs the
    /// state change event.
    pub fn sensor_alert(&mut self, alert: SensorAlertNotification) {
        log_debug!(
            self.log_ctx,
            "SENSOR_ALERT_RECEIVED",
            sensor_id = alert.sensor_id,
            state = alert.state,
            rules_activated = alert.rules_activated,
        );

        if self.events_enabled {
            self.events.push(
                self.now,
                EventKind::SensorAlert {
                    description: alert.description.clone(),
                    state: alert.state,
                    alert_levels: alert.alert_levels.clone(),
                },
            );
            if !alert.rules_activated {
                self.emit_state_change(alert.sensor_id, alert.state);
            }
        }

        self.directory.sensor_alerts.push(SensorAlert {
            sensor_id: alert.sensor_id,
            state: alert.state,
            rules_activated: alert.rules_activated,
            description: alert.description,
            alert_levels: alert.alert_levels,
            data_transfer: alert.data_transfer,
            payload: alert.payload,
            time_received: self.now,
        });

        // A single sensor crossed its threshold: trust the reported state.
        if !alert.rules_activated {
            if let Some(sensor) = self.directory.find_sensor_mut(alert.sensor_id) {
                sensor.state = alert.state;
                sensor.last_state_updated = alert.server_time;
                sensor.server_time = alert.server_time;
            }
        }
    }

    /// Apply a state change to a known sensor.
    pub fn state_change(&mut self, change: StateChangeNotification) -> Result<(), IngestError> {
        if self.events_enabled {
            self.emit_state_change(change.sensor_id, change.state);
        }

        let Some(sensor) = self.directory.find_sensor_mut(change.sensor_id) else {
            log_error!(self.log_ctx, "STATE_CHANGE_SENSOR_UNKNOWN", sensor_id = change.sensor_id);
            return Err(IngestError::UnknownSensor {
                sensor_id: change.sensor_id,
            });
        };
        sensor.state = change.state;
        sensor.last_state_updated = change.server_time;
        sensor.server_time = change.server_time;
        Ok(())
    }

    fn emit_state_change(&mut self, sensor_id: i64, state: i32) {
        let (sensor, node) = match self.directory.sensor_origin(sensor_id) {
            Ok(origin) => origin,
            Err(OriginMiss::UnknownSensor) => {
                log_error!(self.log_ctx, "STATE_CHANGE_EVENT_DROPPED", sensor_id = sensor_id, reason = "sensor_unknown");
                return;
            }
            Err(OriginMiss::UnknownNode { node_id }) => {
                log_error!(
                    self.log_ctx,
                    "STATE_CHANGE_EVENT_DROPPED",
                    sensor_id = sensor_id,
                    node_id = node_id,
                    reason = "node_unknown",
                );
                return;
            }
        };
        self.events.push(
            self.now,
            EventKind::StateChange {
                hostname: node.hostname.clone(),
                description: sensor.description.clone(),
                state,
            },
        );
    }
}
