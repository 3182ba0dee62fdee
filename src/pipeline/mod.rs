//! Pipeline module.
//!
//! The three writers of the directory:
//! - `reconcile` - mark-and-sweep of a full snapshot
//! - `live_update` - out-of-band sensor alerts and state changes
//! - `tick` - version drift, timeouts and the storage flush

pub mod context;
pub mod live_update;
pub mod reconcile;
pub mod tick;

pub use context::*;
pub use live_update::*;
pub use reconcile::*;
pub use tick::*;
