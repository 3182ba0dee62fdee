//! Entity directory.
//!
//! The in-memory mirror of server-authoritative state:
//! - `entities` - Option, Node, Sensor, Manager, Alert, AlertLevel records
//!   and the transient SensorAlert record
//! - `snapshot` - a full-state snapshot as received from the server
//! - `store` - the six collections plus the transient alert buffer

pub mod entities;
pub mod snapshot;
pub mod store;

pub use entities::*;
pub use snapshot::*;
pub use store::*;
