//! Error types for the directory mirror.
//!
//! Reconciliation and live-update failures are strongly typed with
//! thiserror so callers can tell a protocol inconsistency from a broken
//! foreign key. Collaborator boundaries (storage, config files) use anyhow.

use thiserror::Error;

use crate::directory::EntityKind;

/// Reasons a reconciliation pass aborts.
///
/// Every variant leaves the mirror needing a fresh full snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("Received {kind} key '{key}' is not unique")]
    DuplicateKey { kind: EntityKind, key: String },

    #[error("Options are inconsistent: option '{option_kind}' missing from snapshot")]
    OptionRemoved { option_kind: String },

    #[error("Could not find node with id {node_id} for {kind} with id {id}")]
    UnknownNode {
        kind: EntityKind,
        id: i64,
        node_id: i64,
    },
}

/// Failures of the live-update entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("Sensor {sensor_id} for state change not known")]
    UnknownSensor { sensor_id: i64 },
}
