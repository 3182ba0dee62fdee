//! Snapshot reconciliation.
//!
//! Diffs a full snapshot against the directory in one mark-and-sweep pass:
//! 1. Unmark every record
//! 2. Options (never swept; an option missing from the snapshot aborts)
//! 3. Nodes, reporting connectivity flips separately from field changes
//! 4. Sensors, stamping the heartbeat and merging state monotonically
//! 5. Managers and alerts
//! 6. Alert levels (mirrored silently)
//! 7. Sweep every record left unchecked
//!
//! Dependents must reference a node present in the same snapshot. A failed
//! pass is not rolled back here; see `Mirror::reconcile` for that.

use crate::directory::{
    Alert, AlertLevel, Directory, EntityKind, Manager, Mirrored, Node, Sensor, ServerOption, Snapshot,
};
use crate::error::ReconcileError;
use crate::events::{EventKind, EventLog};
use crate::logging::structured::LogContext;
use crate::{log_debug, log_error, log_info};

use super::context::PassContext;

/// Find the unchecked record with `key` and mark it checked.
///
/// `visit` runs on every unchecked record scanned up to and including the
/// match. Meeting an already checked record with `key` means the snapshot
/// carries the key twice.
fn locate<T: Mirrored>(
    records: &mut [T],
    key: &T::Key,
    mut visit: impl FnMut(&mut T),
) -> Result<Option<usize>, ReconcileError> {
    for (idx, record) in records.iter_mut().enumerate() {
        if record.is_checked() {
            if record.key() == key {
                return Err(ReconcileError::DuplicateKey {
                    kind: T::KIND,
                    key: key.to_string(),
                });
            }
            continue;
        }

        visit(record);

        if record.key() == key {
            record.set_checked(true);
            return Ok(Some(idx));
        }
    }
    Ok(None)
}

/// Remove every unchecked record, handing each to `on_remove` first.
fn sweep<T: Mirrored>(records: &mut Vec<T>, mut on_remove: impl FnMut(&T)) {
    records.retain(|record| {
        if record.is_checked() {
            return true;
        }
        on_remove(record);
        false
    });
}

/// One reconciliation pass over a directory and its event log.
pub struct Reconciler<'a> {
    directory: &'a mut Directory,
    events: &'a mut EventLog,
    now: i64,
    log_ctx: LogContext,
}

impl<'a> Reconciler<'a> {
    pub fn new(directory: &'a mut Directory, events: &'a mut EventLog, ctx: &PassContext) -> Self {
        Self {
            directory,
            events,
            now: ctx.time_received,
            log_ctx: ctx.log_context("reconcile"),
        }
    }

    /// Apply `snapshot` to the directory, appending one event per change.
    ///
    /// On error the directory keeps whatever the pass changed before the
    /// failure was detected.
    pub fn reconcile(mut self, snapshot: Snapshot) -> Result<(), ReconcileError> {
        let first_event = self.events.len();
        log_debug!(
            self.log_ctx,
            "RECONCILE_START",
            entities = snapshot.entity_count()
        );

        let result = self.run(snapshot);

        match &result {
            Ok(()) => log_info!(
                self.log_ctx,
                "RECONCILE_COMPLETE",
                events = self.events.len() - first_event,
                nodes = self.directory.nodes.len(),
                sensors = self.directory.sensors.len(),
                managers = self.directory.managers.len(),
                alerts = self.directory.alerts.len(),
            ),
            Err(e) => log_error!(self.log_ctx, "RECONCILE_ABORTED", reason = e.to_string()),
        }
        result
    }

    fn run(&mut self, snapshot: Snapshot) -> Result<(), ReconcileError> {
        let Snapshot {
            options,
            nodes,
            sensors,
            managers,
            alerts,
            alert_levels,
        } = snapshot;

        self.directory.unmark_all();

        self.reconcile_options(options)?;
        self.reconcile_nodes(nodes)?;
        self.reconcile_sensors(sensors)?;
        self.reconcile_managers(managers)?;
        self.reconcile_alerts(alerts)?;
        self.reconcile_alert_levels(alert_levels)?;

        self.sweep_unchecked();
        Ok(())
    }

    /// Node `node_id` as carried by the snapshot being applied.
    fn owning_node(&self, kind: EntityKind, id: i64, node_id: i64) -> Result<&Node, ReconcileError> {
        self.directory
            .nodes
            .iter()
            .find(|n| n.checked && n.node_id == node_id)
            .ok_or(ReconcileError::UnknownNode { kind, id, node_id })
    }

    fn reconcile_options(&mut self, options: Vec<ServerOption>) -> Result<(), ReconcileError> {
        for mut incoming in options {
            match locate(&mut self.directory.options, incoming.kind.as_str(), |_| {})? {
                Some(idx) => {
                    let option = &mut self.directory.options[idx];
                    if option.value != incoming.value {
                        log_debug!(
                            self.log_ctx,
                            "OPTION_CHANGED",
                            option_kind = option.kind,
                            value = incoming.value,
                        );
                        let old_value = std::mem::replace(&mut option.value, incoming.value.clone());
                        self.events.push(
                            self.now,
                            EventKind::ChangeOption {
                                option_kind: option.kind.clone(),
                                old_value,
                                new_value: incoming.value,
                            },
                        );
                    }
                }
                None => {
                    incoming.checked = true;
                    self.events.push(
                        self.now,
                        EventKind::NewOption {
                            option_kind: incoming.kind.clone(),
                            value: incoming.value.clone(),
                        },
                    );
                    self.directory.options.push(incoming);
                }
            }
        }

        if let Some(missing) = self.directory.options.iter().find(|o| !o.checked) {
            return Err(ReconcileError::OptionRemoved {
                option_kind: missing.kind.clone(),
            });
        }
        Ok(())
    }

    fn reconcile_nodes(&mut self, nodes: Vec<Node>) -> Result<(), ReconcileError> {
        for mut incoming in nodes {
            match locate(&mut self.directory.nodes, &incoming.node_id, |_| {})? {
                Some(idx) => {
                    let node = &mut self.directory.nodes[idx];

                    let changed = node.hostname != incoming.hostname
                        || node.node_type != incoming.node_type
                        || node.instance != incoming.instance
                        || node.version != incoming.version
                        || node.revision != incoming.revision;
                    if changed {
                        self.events.push(
                            self.now,
                            EventKind::ChangeNode {
                                old_hostname: node.hostname.clone(),
                                new_hostname: incoming.hostname.clone(),
                                old_node_type: node.node_type,
                                new_node_type: incoming.node_type,
                                old_instance: node.instance.clone(),
                                new_instance: incoming.instance.clone(),
                                old_version: node.version,
                                new_version: incoming.version,
                                old_revision: node.revision,
                                new_revision: incoming.revision,
                            },
                        );
                        node.hostname = incoming.hostname;
                        node.node_type = incoming.node_type;
                        node.instance = incoming.instance;
                        node.version = incoming.version;
                        node.revision = incoming.revision;
                    }

                    if node.connected != incoming.connected {
                        log_debug!(
                            self.log_ctx,
                            "NODE_CONNECTIVITY_CHANGED",
                            node_id = node.node_id,
                            connected = incoming.connected,
                        );
                        self.events.push(
                            self.now,
                            EventKind::ConnectedChange {
                                hostname: node.hostname.clone(),
                                node_type: node.node_type,
                                instance: node.instance.clone(),
                                connected: incoming.connected,
                            },
                        );
                        node.connected = incoming.connected;
                    }
                }
                None => {
                    incoming.checked = true;
                    self.events.push(
                        self.now,
                        EventKind::NewNode {
                            hostname: incoming.hostname.clone(),
                            node_type: incoming.node_type,
                            instance: incoming.instance.clone(),
                        },
                    );
                    self.directory.nodes.push(incoming);
                }
            }
        }
        Ok(())
    }

    fn reconcile_sensors(&mut self, sensors: Vec<Sensor>) -> Result<(), ReconcileError> {
        for mut incoming in sensors {
            // Every unchecked sensor scanned takes the snapshot's server time,
            // matched or not.
            let server_time = incoming.server_time;
            let found = locate(&mut self.directory.sensors, &incoming.sensor_id, |sensor| {
                sensor.server_time = server_time
            })?;

            match found {
                Some(idx) => {
                    self.owning_node(EntityKind::Sensor, incoming.sensor_id, incoming.node_id)?;
                    let sensor = &mut self.directory.sensors[idx];

                    sensor.node_id = incoming.node_id;
                    sensor.alert_levels = incoming.alert_levels;

                    if sensor.alert_delay != incoming.alert_delay
                        || sensor.description != incoming.description
                    {
                        self.events.push(
                            self.now,
                            EventKind::ChangeSensor {
                                old_alert_delay: sensor.alert_delay,
                                new_alert_delay: incoming.alert_delay,
                                old_description: sensor.description.clone(),
                                new_description: incoming.description.clone(),
                            },
                        );
                        sensor.alert_delay = incoming.alert_delay;
                        sensor.description = incoming.description;
                    }

                    if incoming.last_state_updated > sensor.last_state_updated {
                        sensor.last_state_updated = incoming.last_state_updated;
                        sensor.state = incoming.state;
                    } else if incoming.state != sensor.state {
                        log_debug!(
                            self.log_ctx,
                            "SENSOR_STALE_STATE_IGNORED",
                            sensor_id = sensor.sensor_id,
                            last_state_updated = sensor.last_state_updated,
                            received = incoming.last_state_updated,
                        );
                    }
                }
                None => {
                    let hostname = self
                        .owning_node(EntityKind::Sensor, incoming.sensor_id, incoming.node_id)?
                        .hostname
                        .clone();
                    incoming.checked = true;
                    self.events.push(
                        self.now,
                        EventKind::NewSensor {
                            hostname,
                            description: incoming.description.clone(),
                            state: incoming.state,
                        },
                    );
                    self.directory.sensors.push(incoming);
                }
            }
        }
        Ok(())
    }

    fn reconcile_managers(&mut self, managers: Vec<Manager>) -> Result<(), ReconcileError> {
        for mut incoming in managers {
            match locate(&mut self.directory.managers, &incoming.manager_id, |_| {})? {
                Some(idx) => {
                    self.owning_node(EntityKind::Manager, incoming.manager_id, incoming.node_id)?;
                    let manager = &mut self.directory.managers[idx];

                    manager.node_id = incoming.node_id;
                    if manager.description != incoming.description {
                        let old_description =
                            std::mem::replace(&mut manager.description, incoming.description.clone());
                        self.events.push(
                            self.now,
                            EventKind::ChangeManager {
                                old_description,
                                new_description: incoming.description,
                            },
                        );
                    }
                }
                None => {
                    let hostname = self
                        .owning_node(EntityKind::Manager, incoming.manager_id, incoming.node_id)?
                        .hostname
                        .clone();
                    incoming.checked = true;
                    self.events.push(
                        self.now,
                        EventKind::NewManager {
                            hostname,
                            description: incoming.description.clone(),
                        },
                    );
                    self.directory.managers.push(incoming);
                }
            }
        }
        Ok(())
    }

    fn reconcile_alerts(&mut self, alerts: Vec<Alert>) -> Result<(), ReconcileError> {
        for mut incoming in alerts {
            match locate(&mut self.directory.alerts, &incoming.alert_id, |_| {})? {
                Some(idx) => {
                    self.owning_node(EntityKind::Alert, incoming.alert_id, incoming.node_id)?;
                    let alert = &mut self.directory.alerts[idx];

                    alert.node_id = incoming.node_id;
                    alert.alert_levels = incoming.alert_levels;
                    if alert.description != incoming.description {
                        let old_description =
                            std::mem::replace(&mut alert.description, incoming.description.clone());
                        self.events.push(
                            self.now,
                            EventKind::ChangeAlert {
                                old_description,
                                new_description: incoming.description,
                            },
                        );
                    }
                }
                None => {
                    let hostname = self
                        .owning_node(EntityKind::Alert, incoming.alert_id, incoming.node_id)?
                        .hostname
                        .clone();
                    incoming.checked = true;
                    self.events.push(
                        self.now,
                        EventKind::NewAlert {
                            hostname,
                            description: incoming.description.clone(),
                        },
                    );
                    self.directory.alerts.push(incoming);
                }
            }
        }
        Ok(())
    }

    fn reconcile_alert_levels(&mut self, alert_levels: Vec<AlertLevel>) -> Result<(), ReconcileError> {
        for mut incoming in alert_levels {
            match locate(&mut self.directory.alert_levels, &incoming.level, |_| {})? {
                Some(idx) => {
                    let level = &mut self.directory.alert_levels[idx];
                    level.name = incoming.name;
                    level.smtp_enabled = incoming.smtp_enabled;
                    level.to_addr = incoming.to_addr;
                    level.trigger_always = incoming.trigger_always;
                    level.rules_enabled = incoming.rules_enabled;
                }
                None => {
                    incoming.checked = true;
                    self.directory.alert_levels.push(incoming);
                }
            }
        }
        Ok(())
    }

    fn sweep_unchecked(&mut self) {
        let now = self.now;
        let events = &mut *self.events;
        let log_ctx = &self.log_ctx;

        sweep(&mut self.directory.nodes, |node| {
            log_debug!(log_ctx, "NODE_REMOVED", node_id = node.node_id);
            events.push(
                now,
                EventKind::DeleteNode {
                    hostname: node.hostname.clone(),
                    node_type: node.node_type,
                    instance: node.instance.clone(),
                },
            );
        });
        sweep(&mut self.directory.sensors, |sensor| {
            log_debug!(log_ctx, "SENSOR_REMOVED", sensor_id = sensor.sensor_id);
            events.push(
                now,
                EventKind::DeleteSensor {
                    description: sensor.description.clone(),
                },
            );
        });
        sweep(&mut self.directory.managers, |manager| {
            log_debug!(log_ctx, "MANAGER_REMOVED", manager_id = manager.manager_id);
            events.push(
                now,
                EventKind::DeleteManager {
                    description: manager.description.clone(),
                },
            );
        });
        sweep(&mut self.directory.alerts, |alert| {
            log_debug!(log_ctx, "ALERT_REMOVED", alert_id = alert.alert_id);
            events.push(
                now,
                EventKind::DeleteAlert {
                    description: alert.description.clone(),
                },
            );
        });
        sweep(&mut self.directory.alert_levels, |level| {
            log_debug!(log_ctx, "ALERT_LEVEL_REMOVED", level = level.level);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::directory::NodeType;

    const NOW: i64 = 1_700_000_000;

    fn option(kind: &str, value: &str) -> ServerOption {
        ServerOption {
            kind: kind.to_string(),
            value: value.to_string(),
            checked: false,
        }
    }

    fn node(node_id: i64, hostname: &str) -> Node {
        Node {
            node_id,
            hostname: hostname.to_string(),
            node_type: NodeType::Sensor,
            instance: "sensorClientPing".to_string(),
            connected: true,
            version: 0.5,
            revision: 1,
            ..Default::default()
        }
    }

    fn sensor(sensor_id: i64, node_id: i64, state: i32, last_state_updated: i64) -> Sensor {
        Sensor {
            sensor_id,
            node_id,
            alert_delay: 0,
            alert_levels: BTreeSet::from([1]),
            description: format!("sensor {}", sensor_id),
            state,
            last_state_updated,
            server_time: last_state_updated,
            checked: false,
        }
    }

    fn manager(manager_id: i64, node_id: i64) -> Manager {
        Manager {
            manager_id,
            node_id,
            description: format!("manager {}", manager_id),
            checked: false,
        }
    }

    fn alert(alert_id: i64, node_id: i64) -> Alert {
        Alert {
            alert_id,
            node_id,
            alert_levels: BTreeSet::from([1]),
            description: format!("alert {}", alert_id),
            checked: false,
        }
    }

    fn level(level: i32) -> AlertLevel {
        AlertLevel {
            level,
            name: format!("level {}", level),
            ..Default::default()
        }
    }

    fn apply(dir: &mut Directory, log: &mut EventLog, snapshot: Snapshot) -> Result<(), ReconcileError> {
        let ctx = PassContext::at(NOW);
        Reconciler::new(dir, log, &ctx).reconcile(snapshot)
    }

    fn names(log: &EventLog, since: usize) -> Vec<&'static str> {
        log.since(since).iter().map(|e| e.kind.name()).collect()
    }

    #[test]
    fn test_new_node_and_sensor_into_empty_directory() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let snapshot = Snapshot {
            nodes: vec![node(1, "h1")],
            sensors: vec![sensor(10, 1, 0, 100)],
            ..Default::default()
        };

        apply(&mut dir, &mut log, snapshot).unwrap();

        assert_eq!(names(&log, 0), vec!["new_node", "new_sensor"]);
        assert_eq!(
            log.events()[1].kind,
            EventKind::NewSensor {
                hostname: "h1".to_string(),
                description: "sensor 10".to_string(),
                state: 0,
            }
        );
        assert!(dir.find_node(1).is_some());
        assert!(dir.find_sensor(10).is_some());
        assert!(log.events().iter().all(|e| e.time_occurred == NOW));
    }

    #[test]
    fn test_same_snapshot_twice_emits_nothing() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let snapshot = Snapshot {
            options: vec![option("alertSystemActive", "1")],
            nodes: vec![node(1, "h1")],
            sensors: vec![sensor(10, 1, 0, 100)],
            managers: vec![manager(5, 1)],
            alerts: vec![alert(7, 1)],
            alert_levels: vec![level(1)],
        };

        apply(&mut dir, &mut log, snapshot.clone()).unwrap();
        let mark = log.len();
        apply(&mut dir, &mut log, snapshot).unwrap();

        assert!(log.since(mark).is_empty());
    }

    #[test]
    fn test_option_value_change() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                options: vec![option("alertSystemActive", "1")],
                ..Default::default()
            },
        )
        .unwrap();
        let mark = log.len();

        apply(
            &mut dir,
            &mut log,
            Snapshot {
                options: vec![option("alertSystemActive", "0")],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            log.since(mark)[0].kind,
            EventKind::ChangeOption {
                option_kind: "alertSystemActive".to_string(),
                old_value: "1".to_string(),
                new_value: "0".to_string(),
            }
        );
        assert_eq!(dir.find_option("alertSystemActive").unwrap().value, "0");
    }

    #[test]
    fn test_duplicate_option_kind_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                options: vec![option("X", "1"), option("X", "2"), option("Y", "3")],
                ..Default::default()
            },
        )
        .unwrap_err();

        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                kind: EntityKind::Option,
                key: "X".to_string(),
            }
        );
        // Options after the duplicate were never applied.
        assert!(dir.find_option("Y").is_none());
        assert_eq!(dir.find_option("X").unwrap().value, "1");
    }

    #[test]
    fn test_missing_option_fails_and_is_kept() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                options: vec![option("A", "1"), option("B", "1")],
                ..Default::default()
            },
        )
        .unwrap();

        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                options: vec![option("A", "1")],
                ..Default::default()
            },
        )
        .unwrap_err();

        assert_eq!(
            err,
            ReconcileError::OptionRemoved {
                option_kind: "B".to_string(),
            }
        );
        assert!(dir.find_option("B").is_some());
    }

    #[test]
    fn test_node_change_and_connectivity_are_separate_events() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                ..Default::default()
            },
        )
        .unwrap();
        let mark = log.len();

        let mut changed = node(1, "h1-renamed");
        changed.connected = false;
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![changed],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(names(&log, mark), vec!["change_node", "connected_change"]);
        match &log.since(mark)[1].kind {
            EventKind::ConnectedChange {
                hostname, connected, ..
            } => {
                assert_eq!(hostname, "h1-renamed");
                assert!(!connected);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!dir.find_node(1).unwrap().connected);
    }

    #[test]
    fn test_connectivity_flip_alone() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                ..Default::default()
            },
        )
        .unwrap();
        let mark = log.len();

        let mut offline = node(1, "h1");
        offline.connected = false;
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![offline],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(names(&log, mark), vec!["connected_change"]);
    }

    #[test]
    fn test_stale_sensor_state_is_rejected() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let base = Snapshot {
            nodes: vec![node(1, "h1")],
            sensors: vec![sensor(10, 1, 0, 100)],
            ..Default::default()
        };
        apply(&mut dir, &mut log, base).unwrap();
        let mark = log.len();

        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![sensor(10, 1, 1, 90)],
                ..Default::default()
            },
        )
        .unwrap();

        let stored = dir.find_sensor(10).unwrap();
        assert_eq!(stored.state, 0);
        assert_eq!(stored.last_state_updated, 100);
        assert!(log.since(mark).is_empty());
    }

    #[test]
    fn test_newer_sensor_state_is_applied() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![sensor(10, 1, 0, 100)],
                ..Default::default()
            },
        )
        .unwrap();

        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![sensor(10, 1, 1, 110)],
                ..Default::default()
            },
        )
        .unwrap();

        let stored = dir.find_sensor(10).unwrap();
        assert_eq!(stored.state, 1);
        assert_eq!(stored.last_state_updated, 110);
    }

    #[test]
    fn test_sensor_change_event_and_unconditional_fields() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![sensor(10, 1, 0, 100)],
                ..Default::default()
            },
        )
        .unwrap();
        let mark = log.len();

        let mut changed = sensor(10, 1, 0, 100);
        changed.alert_levels = BTreeSet::from([1, 2]);
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![changed.clone()],
                ..Default::default()
            },
        )
        .unwrap();
        // Alert levels alone never produce an event.
        assert!(log.since(mark).is_empty());
        assert_eq!(dir.find_sensor(10).unwrap().alert_levels, BTreeSet::from([1, 2]));

        changed.alert_delay = 30;
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![changed],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(names(&log, mark), vec!["change_sensor"]);
    }

    #[test]
    fn test_heartbeat_stamps_every_scanned_sensor() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![sensor(10, 1, 0, 100), sensor(11, 1, 0, 100)],
                ..Default::default()
            },
        )
        .unwrap();

        let mut first = sensor(10, 1, 0, 100);
        first.server_time = 500;
        let mut second = sensor(11, 1, 0, 100);
        second.server_time = 500;
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![second, first],
                ..Default::default()
            },
        )
        .unwrap();

        assert!(dir.sensors.iter().all(|s| s.server_time == 500));
        assert!(dir.sensors.iter().all(|s| s.last_state_updated == 100));
    }

    #[test]
    fn test_sensor_with_unknown_node_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![sensor(10, 2, 0, 100)],
                ..Default::default()
            },
        )
        .unwrap_err();

        assert_eq!(
            err,
            ReconcileError::UnknownNode {
                kind: EntityKind::Sensor,
                id: 10,
                node_id: 2,
            }
        );
        assert!(dir.find_sensor(10).is_none());
    }

    #[test]
    fn test_dependent_of_dropped_node_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1"), node(2, "h2")],
                managers: vec![manager(5, 2)],
                ..Default::default()
            },
        )
        .unwrap();

        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                managers: vec![manager(5, 2)],
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::UnknownNode {
                kind: EntityKind::Manager,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_sensor_id_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                sensors: vec![sensor(10, 1, 0, 100), sensor(10, 1, 1, 200)],
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                kind: EntityKind::Sensor,
                key: "10".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_node_id_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1"), node(1, "h1-again")],
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                kind: EntityKind::Node,
                key: "1".to_string(),
            }
        );
        assert_eq!(dir.nodes.len(), 1);
    }

    #[test]
    fn test_duplicate_manager_id_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                managers: vec![manager(5, 1), manager(5, 1)],
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                kind: EntityKind::Manager,
                key: "5".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_alert_id_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                alerts: vec![alert(7, 1), alert(7, 1)],
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                kind: EntityKind::Alert,
                key: "7".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_alert_level_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                alert_levels: vec![level(1), level(2), level(1)],
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                kind: EntityKind::AlertLevel,
                key: "1".to_string(),
            }
        );
    }

    #[test]
    fn test_new_alert_with_unknown_node_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                alerts: vec![alert(7, 9)],
                ..Default::default()
            },
        )
        .unwrap_err();

        assert_eq!(
            err,
            ReconcileError::UnknownNode {
                kind: EntityKind::Alert,
                id: 7,
                node_id: 9,
            }
        );
        assert!(dir.find_alert(7).is_none());
    }

    #[test]
    fn test_known_alert_moved_to_unknown_node_fails() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1"), node(9, "h9")],
                alerts: vec![alert(7, 9)],
                ..Default::default()
            },
        )
        .unwrap();

        let err = apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                alerts: vec![alert(7, 9)],
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::UnknownNode {
                kind: EntityKind::Alert,
                id: 7,
                node_id: 9,
            }
        );
    }

    #[test]
    fn test_sweep_removes_absent_records() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1"), node(2, "h2"), node(3, "h3")],
                sensors: vec![sensor(10, 2, 0, 100), sensor(11, 3, 0, 100)],
                managers: vec![manager(5, 1)],
                alerts: vec![alert(7, 1)],
                alert_levels: vec![level(1), level(2)],
                ..Default::default()
            },
        )
        .unwrap();
        let mark = log.len();

        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                alert_levels: vec![level(1)],
                ..Default::default()
            },
        )
        .unwrap();

        let mut emitted = names(&log, mark);
        emitted.sort_unstable();
        assert_eq!(
            emitted,
            vec![
                "delete_alert",
                "delete_manager",
                "delete_node",
                "delete_node",
                "delete_sensor",
                "delete_sensor",
            ]
        );
        assert_eq!(dir.nodes.len(), 1);
        assert!(dir.sensors.is_empty());
        assert!(dir.managers.is_empty());
        assert!(dir.alerts.is_empty());
        assert!(dir.find_alert_level(2).is_none());
    }

    #[test]
    fn test_alert_levels_mirror_silently() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                alert_levels: vec![level(1)],
                ..Default::default()
            },
        )
        .unwrap();

        let mut updated = level(1);
        updated.smtp_enabled = true;
        updated.to_addr = "ops@example.org".to_string();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                alert_levels: vec![updated],
                ..Default::default()
            },
        )
        .unwrap();

        assert!(log.is_empty());
        let stored = dir.find_alert_level(1).unwrap();
        assert!(stored.smtp_enabled);
        assert_eq!(stored.to_addr, "ops@example.org");
    }

    #[test]
    fn test_manager_and_alert_description_changes() {
        let mut dir = Directory::new();
        let mut log = EventLog::new();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                managers: vec![manager(5, 1)],
                alerts: vec![alert(7, 1)],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(names(&log, 0), vec!["new_node", "new_manager", "new_alert"]);
        let mark = log.len();

        let mut renamed_manager = manager(5, 1);
        renamed_manager.description = "keypad".to_string();
        let mut renamed_alert = alert(7, 1);
        renamed_alert.description = "siren".to_string();
        apply(
            &mut dir,
            &mut log,
            Snapshot {
                nodes: vec![node(1, "h1")],
                managers: vec![renamed_manager],
                alerts: vec![renamed_alert],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(names(&log, mark), vec!["change_manager", "change_alert"]);
        assert_eq!(dir.find_manager(5).unwrap().description, "keypad");
        assert_eq!(dir.find_alert(7).unwrap().description, "siren");
    }
}
