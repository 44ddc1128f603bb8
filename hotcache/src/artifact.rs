//! Cached artifacts and their serializable view

use crate::key::{Key, Timestamp};
use crate::provider::Provider;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Payload of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<P> {
    /// Successfully built value
    Built(P),
    /// Tombstone: the key resolved to nothing buildable
    NotFound,
}

impl<P> Payload<P> {
    /// The built value, if any
    #[must_use]
    pub fn built(&self) -> Option<&P> {
        match self {
            Self::Built(payload) => Some(payload),
            Self::NotFound => None,
        }
    }

    /// Whether this is a tombstone
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// One live cache entry. Edges live in the cache's dependency graph.
pub(crate) struct Artifact<P> {
    pub(crate) key: Key,
    pub(crate) payload: Payload<P>,
    pub(crate) built_at: Timestamp,
    /// Name of the resource the entry was built from
    pub(crate) resource: String,
    /// `None` for tombstones no provider vouched for
    pub(crate) provider: Option<Arc<dyn Provider<P>>>,
    /// Entries built by the same `Resource::build` call share a generation
    pub(crate) generation: u64,
}

impl<P> fmt::Debug for Artifact<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("key", &self.key)
            .field("found", &!self.payload.is_not_found())
            .field("built_at", &self.built_at)
            .field("resource", &self.resource)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Snapshot of a cache entry and its edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    /// Entry key
    pub key: Key,
    /// False for tombstones
    pub found: bool,
    /// When the entry was built
    pub built_at: Timestamp,
    /// Resource the entry was built from
    pub resource: String,
    /// Build generation shared with siblings
    pub generation: u64,
    /// Keys this entry depends on, in discovery order
    pub dependencies: Vec<Key>,
    /// Keys depending on this entry, in discovery order
    pub dependents: Vec<Key>,
}
