//! Version information collaborator.
//!
//! The update-check service that knows the newest released version of each
//! client instance lives outside this crate; the tick only needs lookups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Newest known release of one client instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepoVersion {
    pub newest_version: f64,
    pub newest_revision: i64,
}

/// Looks up the newest release of a client instance by name.
///
/// Instance names match case-insensitively.
pub trait VersionInformer: Send + Sync {
    fn newest_version(&self, instance: &str) -> Option<RepoVersion>;
}

/// Version informer backed by a fixed table, refreshed by replacing entries.
#[derive(Debug, Clone, Default)]
pub struct StaticVersionInformer {
    repo_versions: HashMap<String, RepoVersion>,
}

impl StaticVersionInformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, instance: &str, newest_version: f64, newest_revision: i64) -> Self {
        self.set_version(instance, newest_version, newest_revision);
        self
    }

    pub fn set_version(&mut self, instance: &str, newest_version: f64, newest_revision: i64) {
        self.repo_versions.insert(
            instance.to_lowercase(),
            RepoVersion {
                newest_version,
                newest_revision,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.repo_versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repo_versions.is_empty()
    }
}

impl VersionInformer for StaticVersionInformer {
    fn newest_version(&self, instance: &str) -> Option<RepoVersion> {
        self.repo_versions.get(&instance.to_lowercase()).copied()
    }
}
