//! Periodic maintenance pass.
//!
//! Runs once per maintenance interval:
//! 1. Drop the sensor alert buffer when alerts are not retained
//! 2. Prune events past their life span
//! 3. Version drift against the version informer
//! 4. Sensor timeouts
//! 5. Flush the directory and alert buffer to storage

use crate::config::MirrorConfig;
use crate::directory::{Directory, UNKNOWN_REVISION, UNKNOWN_VERSION};
use crate::events::{EventKind, EventLog};
use crate::logging::structured::LogContext;
use crate::storage::{ServerInfoStore, ServerInformation};
use crate::version::VersionInformer;
use crate::{log_debug, log_error, log_info};

use super::context::PassContext;

/// Result of handing the directory to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Stored; this many buffered sensor alerts went with it.
    Stored { sensor_alerts: usize },
    /// Storage refused the update; the alert buffer is kept for the next tick.
    Failed,
}

/// Hand `info` to storage as one update.
pub fn flush(store: &dyn ServerInfoStore, info: &ServerInformation, ctx: &LogContext) -> FlushOutcome {
    match store.update_server_information(info) {
        Ok(()) => {
            log_debug!(ctx, "FLUSH_STORED", sensor_alerts = info.sensor_alerts.len());
            FlushOutcome::Stored {
                sensor_alerts: info.sensor_alerts.len(),
            }
        }
        Err(e) => {
            log_error!(
                ctx,
                "FLUSH_FAILED",
                error = format!("{:#}", e),
                retained_sensor_alerts = info.sensor_alerts.len(),
            );
            FlushOutcome::Failed
        }
    }
}

/// Drop the `count` oldest buffered sensor alerts after they were stored.
pub fn discard_flushed_alerts(directory: &mut Directory, count: usize) {
    let count = count.min(directory.sensor_alerts.len());
    directory.sensor_alerts.drain(..count);
}

pub struct TickProcessor<'a> {
    directory: &'a mut Directory,
    events: &'a mut EventLog,
    config: &'a MirrorConfig,
    version_informer: Option<&'a dyn VersionInformer>,
    now: i64,
    log_ctx: LogContext,
}

impl<'a> TickProcessor<'a> {
    pub fn new(
        directory: &'a mut Directory,
        events: &'a mut EventLog,
        config: &'a MirrorConfig,
        version_informer: Option<&'a dyn VersionInformer>,
        ctx: &PassContext,
    ) -> Self {
        Self {
            directory,
            events,
            config,
            version_informer,
            now: ctx.time_received,
            log_ctx: ctx.log_context("tick"),
        }
    }

    /// Full tick: maintenance, then the flush, holding the directory throughout.
    pub fn run(mut self, store: &dyn ServerInfoStore) -> FlushOutcome {
        self.maintain();

        let info = ServerInformation::from_directory(self.directory);
        let outcome = flush(store, &info, &self.log_ctx);
        if let FlushOutcome::Stored { sensor_alerts } = outcome {
            discard_flushed_alerts(self.directory, sensor_alerts);
        }
        outcome
    }

    /// Every step of the tick except the flush.
    pub fn maintain(&mut self) {
        let first_event = self.events.len();

        if !self.config.retains_sensor_alerts() {
            self.directory.sensor_alerts.clear();
        }

        if let Some(cutoff) = self.config.event_cutoff(self.now) {
            let pruned = self.events.prune_older_than(cutoff);
            if pruned > 0 {
                log_debug!(self.log_ctx, "EVENTS_PRUNED", count = pruned, cutoff = cutoff);
            }
        }

        self.check_versions();
        self.check_timeouts();

        log_info!(
            self.log_ctx,
            "TICK_MAINTENANCE_COMPLETE",
            events = self.events.len().saturating_sub(first_event),
            sensor_alerts = self.directory.sensor_alerts.len(),
        );
    }

    fn check_versions(&mut self) {
        let Some(informer) = self.version_informer else {
            return;
        };

        for node in self.directory.nodes.iter_mut() {
            let Some(newest) = informer.newest_version(&node.instance) else {
                node.newest_version = UNKNOWN_VERSION;
                node.newest_revision = UNKNOWN_REVISION;
                continue;
            };

            // Only report drift not announced before.
            let newer_version = node.version < newest.newest_version
                && node.newest_version < newest.newest_version;
            let newer_revision = node.version == newest.newest_version
                && node.revision < newest.newest_revision
                && node.newest_revision < newest.newest_revision;

            if (newer_version || newer_revision) && self.config.events_enabled() {
                log_debug!(
                    self.log_ctx,
                    "NEW_VERSION_AVAILABLE",
                    node_id = node.node_id,
                    instance = node.instance,
                    version = newest.newest_version,
                    revision = newest.newest_revision,
                );
                self.events.push(
                    self.now,
                    EventKind::NewVersion {
                        used_version: node.version,
                        used_revision: node.revision,
                        new_version: newest.newest_version,
                        new_revision: newest.newest_revision,
                        instance: node.instance.clone(),
                        hostname: node.hostname.clone(),
                    },
                );
            }

            node.newest_version = newest.newest_version;
            node.newest_revision = newest.newest_revision;
        }
    }

    fn check_timeouts(&mut self) {
        let grace = self.config.connection_timeout.saturating_mul(2);

        for sensor in &self.directory.sensors {
            // Timestamps come off the wire; never overflow on them.
            if sensor.server_time.saturating_sub(sensor.last_state_updated) <= grace {
                continue;
            }

            let Some(node) = self.directory.find_node(sensor.node_id) else {
                log_error!(
                    self.log_ctx,
                    "TIMEOUT_CHECK_NODE_UNKNOWN",
                    sensor_id = sensor.sensor_id,
                    node_id = sensor.node_id,
                );
                continue;
            };

            if node.connected {
                self.events.push(
                    self.now,
                    EventKind::SensorTimeOut {
                        hostname: node.hostname.clone(),
                        description: sensor.description.clone(),
                        state: sensor.state,
                    },
                );
            }
        }
    }
}
