//! Error types for cache operations

use crate::key::Key;

/// Boxed error returned by build functions.
///
/// Nested [`CacheError`]s convert into it with `?`, so a failure deep in a
/// chain of nested builds stays reachable through `source()`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No resolver, provider or live entry yields the key
    #[error("Artifact not found: {0}")]
    NotFound(Key),

    /// A resource failed to build
    #[error("Failed to build {key}: {source}")]
    Build {
        /// Key whose build failed
        key: Key,
        /// Error raised by the build function
        source: BoxError,
    },

    /// A stale entry failed to rebuild; the entry has been evicted
    #[error("Failed to reload {key}: {source}")]
    Reload {
        /// Key whose rebuild failed
        key: Key,
        /// Error raised while rebuilding
        source: BoxError,
    },

    /// A key was requested while it was already under construction
    #[error("Dependency cycle detected while building {key}: {}", format_chain(chain))]
    Cycle {
        /// Key requested again
        key: Key,
        /// Keys under construction, outermost first
        chain: Vec<Key>,
    },

    /// Nested builds went deeper than the configured limit
    #[error("Build nesting exceeded {limit} levels at {key}")]
    DepthExceeded {
        /// Key that would have exceeded the limit
        key: Key,
        /// Configured `max_build_depth`
        limit: usize,
    },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

fn format_chain(chain: &[Key]) -> String {
    chain
        .iter()
        .map(Key::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl CacheError {
    /// Key the error refers to.
    #[must_use]
    pub fn key(&self) -> &Key {
        match self {
            Self::NotFound(key)
            | Self::Build { key, .. }
            | Self::Reload { key, .. }
            | Self::Cycle { key, .. }
            | Self::DepthExceeded { key, .. } => key,
        }
    }

    /// Whether the error is a plain not-found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
