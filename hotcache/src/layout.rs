//! Mapping between keys and resource paths, and the build-function seam

use crate::context::BuildContext;
use crate::error::BoxError;
use crate::key::Key;
use std::str::Utf8Error;

/// Build function plugged into the reference providers.
///
/// Receives the source unit being built and the build context through
/// which nested artifacts are requested.
pub type BuildFn<P> =
    dyn Fn(&SourceUnit<'_>, &mut BuildContext<'_, P>) -> Result<Vec<(Key, P)>, BoxError> + Send + Sync;

/// The unit handed to a [`BuildFn`].
#[derive(Debug, Clone, Copy)]
pub struct SourceUnit<'a> {
    /// Primary key of the unit, derived from its path
    pub key: &'a Key,
    /// Resource name, relative to the provider root
    pub name: &'a str,
    /// Raw contents
    pub bytes: &'a [u8],
}

impl SourceUnit<'_> {
    /// Contents as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns the decoding error for non-UTF-8 contents.
    pub fn text(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(self.bytes)
    }
}

/// Key ↔ path translation: `pkg.sub.Name` lives at `pkg/sub/Name.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    extension: String,
}

impl KeyLayout {
    /// Layout for files carrying `extension` (with or without the dot)
    #[must_use]
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// File extension, without the dot
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of the unit defining `key`
    #[must_use]
    pub fn path_for(&self, key: &Key) -> String {
        format!("{}.{}", key.as_str().replace('.', "/"), self.extension)
    }

    /// Key defined by the unit at `path`, if the path has this layout's extension
    #[must_use]
    pub fn key_for(&self, path: &str) -> Option<Key> {
        let stem = path
            .trim_start_matches('/')
            .strip_suffix(&self.extension)?
            .strip_suffix('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(Key::new(stem.replace('/', ".")))
    }

    /// Whether a path names a buildable unit
    #[must_use]
    pub fn is_buildable_path(&self, path: &str) -> bool {
        self.key_for(path).is_some()
    }
}
