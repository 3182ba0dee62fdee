//! Directory entity records.
//!
//! Every mirrored record carries a transient `checked` marker that is only
//! meaningful inside a reconciliation pass. It is never serialized.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel for "no newer version known" on a node.
pub const UNKNOWN_VERSION: f64 = -1.0;
/// Sentinel for "no newer revision known" on a node.
pub const UNKNOWN_REVISION: i64 = -1;

/// The collection a mirrored record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Option,
    Node,
    Sensor,
    Manager,
    Alert,
    AlertLevel,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Option => "option",
            EntityKind::Node => "node",
            EntityKind::Sensor => "sensor",
            EntityKind::Manager => "manager",
            EntityKind::Alert => "alert",
            EntityKind::AlertLevel => "alert_level",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record kept in one of the six mirrored collections.
///
/// Gives reconciliation uniform access to the identity key and the
/// per-pass `checked` marker.
pub trait Mirrored {
    const KIND: EntityKind;
    type Key: PartialEq + fmt::Display + ?Sized;

    fn key(&self) -> &Self::Key;
    fn is_checked(&self) -> bool;
    fn set_checked(&mut self, checked: bool);
}

macro_rules! impl_mirrored {
    ($ty:ty, $kind:expr, $key_ty:ty, $field:ident) => {
        impl Mirrored for $ty {
            const KIND: EntityKind = $kind;
            type Key = $key_ty;

            fn key(&self) -> &$key_ty {
                &self.$field
            }

            fn is_checked(&self) -> bool {
                self.checked
            }

            fn set_checked(&mut self, checked: bool) {
                self.checked = checked;
            }
        }
    };
}

impl_mirrored!(ServerOption, EntityKind::Option, str, kind);
impl_mirrored!(Node, EntityKind::Node, i64, node_id);
impl_mirrored!(Sensor, EntityKind::Sensor, i64, sensor_id);
impl_mirrored!(Manager, EntityKind::Manager, i64, manager_id);
impl_mirrored!(Alert, EntityKind::Alert, i64, alert_id);
impl_mirrored!(AlertLevel, EntityKind::AlertLevel, i32, level);

/// Server option, identified by its kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerOption {
    pub kind: String,
    pub value: String,
    #[serde(skip)]
    pub checked: bool,
}

/// Role a client node plays in the alerting network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Sensor,
    Alert,
    Manager,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Sensor => "sensor",
            NodeType::Alert => "alert",
            NodeType::Manager => "manager",
        }
    }
}

/// A client connected (or once connected) to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: i64,
    pub hostname: String,
    pub node_type: NodeType,
    pub instance: String,
    pub connected: bool,
    pub version: f64,
    pub revision: i64,
    /// Newest version announced by the version informer.
    #[serde(default = "unknown_version")]
    pub newest_version: f64,
    #[serde(default = "unknown_revision")]
    pub newest_revision: i64,
    #[serde(skip)]
    pub checked: bool,
}

fn unknown_version() -> f64 {
    UNKNOWN_VERSION
}

fn unknown_revision() -> i64 {
    UNKNOWN_REVISION
}

impl Default for Node {
    fn default() -> Self {
        Self {
            node_id: 0,
            hostname: String::new(),
            node_type: NodeType::default(),
            instance: String::new(),
            connected: false,
            version: 0.0,
            revision: 0,
            newest_version: UNKNOWN_VERSION,
            newest_revision: UNKNOWN_REVISION,
            checked: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub sensor_id: i64,
    pub node_id: i64,
    pub alert_delay: i64,
    pub alert_levels: BTreeSet<i32>,
    pub description: String,
    pub state: i32,
    pub last_state_updated: i64,
    /// Heartbeat stamp: server time of the last snapshot that scanned this sensor.
    pub server_time: i64,
    #[serde(skip)]
    pub checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manager {
    pub manager_id: i64,
    pub node_id: i64,
    pub description: String,
    #[serde(skip)]
    pub checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: i64,
    pub node_id: i64,
    pub alert_levels: BTreeSet<i32>,
    pub description: String,
    #[serde(skip)]
    pub checked: bool,
}

/// Alert level configured on the server. Mirrored as configuration only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertLevel {
    pub level: i32,
    pub name: String,
    pub smtp_enabled: bool,
    pub to_addr: String,
    pub trigger_always: bool,
    pub rules_enabled: bool,
    #[serde(skip)]
    pub checked: bool,
}

/// A sensor alert occurrence. Append-only, never deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorAlert {
    pub sensor_id: i64,
    pub state: i32,
    pub rules_activated: bool,
    pub description: String,
    pub alert_levels: BTreeSet<i32>,
    pub data_transfer: bool,
    #[serde(with = "payload_base64", default)]
    pub payload: Option<Vec<u8>>,
    pub time_received: i64,
}

/// Serde adapter storing optional payload bytes as a base64 string.
mod payload_base64 {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(payload: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match payload {
            Some(bytes) => serializer.serialize_some(&general_purpose::STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| {
                general_purpose::STANDARD
                    .decode(s)
                    .map_err(|e| serde::de::Error::custom(format!("Failed to decode base64: {}", e)))
            })
            .transpose()
    }
}
