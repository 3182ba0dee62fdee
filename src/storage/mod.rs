//! Storage module.
//!
//! The durable storage backend is an external collaborator. This module
//! defines the flush contract and the document handed to it, plus two
//! backends: an in-memory recorder and a JSON file writer.

pub mod json_file;
pub mod memory;
pub mod models;

pub use json_file::*;
pub use memory::*;
pub use models::*;

/// Receives the full directory plus the transient sensor alert buffer.
///
/// One call is one atomic update; an error means nothing was persisted.
pub trait ServerInfoStore: Send + Sync {
    fn update_server_information(&self, info: &ServerInformation) -> anyhow::Result<()>;
}
