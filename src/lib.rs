//! alertR Core - Directory mirror and event engine for the alerting server
//!
//! Sensor, alert and manager clients report to a central server, which keeps
//! an authoritative directory of every known entity. This crate keeps a local
//! mirror of that directory consistent with repeated full snapshots and
//! out-of-band notifications, and emits a typed change log for downstream
//! consumers (notification dispatch, persistence, management views).
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `directory` - Entity records, snapshots and the mirrored collections
//! - `events` - Typed delta events and the append-only event log
//! - `pipeline` - Reconciliation, live updates and the maintenance tick
//! - `mirror` - Lock-protected handle tying the pipeline together
//! - `storage` - Flush contract and storage backends
//! - `version` - Newest-release lookups for version drift
//! - `config` - Retention and timeout settings
//! - `logging` - Structured logging with pass context

pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod logging;
pub mod mirror;
pub mod pipeline;
pub mod storage;
pub mod version;

pub use config::MirrorConfig;
pub use directory::{Directory, Snapshot};
pub use error::{IngestError, ReconcileError};
pub use events::{Event, EventKind, EventLog};
pub use logging::init_logger;
pub use mirror::{Mirror, MirrorState};
pub use pipeline::{FlushOutcome, PassContext, SensorAlertNotification, StateChangeNotification};
