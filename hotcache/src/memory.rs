//! In-memory provider
//!
//! Files live in a shared map with explicit modification times, which makes
//! the provider handy for embedding generated sources and for driving the
//! cache deterministically together with a [`ManualClock`](crate::ManualClock).

use crate::context::BuildContext;
use crate::error::BoxError;
use crate::key::{Key, Timestamp};
use crate::layout::{BuildFn, KeyLayout, SourceUnit};
use crate::provider::Provider;
use crate::resource::Resource;
use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone)]
struct MemoryFile {
    bytes: Arc<[u8]>,
    modified: Timestamp,
}

type FileMap = Arc<RwLock<HashMap<String, MemoryFile>>>;

/// Provider over an in-memory file map.
pub struct MemoryProvider<P> {
    layout: KeyLayout,
    files: FileMap,
    builder: Arc<BuildFn<P>>,
}

impl<P> MemoryProvider<P> {
    /// Create an empty provider whose units carry `extension` and are
    /// built by `builder`.
    pub fn new<F>(extension: &str, builder: F) -> Self
    where
        F: Fn(&SourceUnit<'_>, &mut BuildContext<'_, P>) -> Result<Vec<(Key, P)>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            layout: KeyLayout::new(extension),
            files: Arc::default(),
            builder: Arc::new(builder),
        }
    }

    /// Key ↔ path layout
    #[must_use]
    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Create or replace a file
    pub fn write(&self, path: &str, contents: impl AsRef<[u8]>, modified: Timestamp) {
        let file = MemoryFile {
            bytes: Arc::from(contents.as_ref()),
            modified,
        };
        let _ = self
            .files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize(path).to_string(), file);
    }

    /// Bump a file's modification time; returns false if it doesn't exist
    pub fn touch(&self, path: &str, modified: Timestamp) -> bool {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        match files.get_mut(normalize(path)) {
            Some(file) => {
                file.modified = modified;
                true
            }
            None => false,
        }
    }

    /// Delete a file; returns false if it didn't exist
    pub fn remove(&self, path: &str) -> bool {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(normalize(path))
            .is_some()
    }

    /// Every buildable key, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<Key> = files
            .keys()
            .filter_map(|path| self.layout.key_for(path))
            .collect();
        keys.sort();
        keys
    }

    fn resource(&self, path: &str) -> MemoryResource<P> {
        MemoryResource {
            path: normalize(path).to_string(),
            layout: self.layout.clone(),
            files: Arc::clone(&self.files),
            builder: Arc::clone(&self.builder),
        }
    }
}

impl<P: 'static> Provider<P> for MemoryProvider<P> {
    fn resolve_for_key(&self, key: &Key) -> Box<dyn Resource<P>> {
        Box::new(self.resource(&self.layout.path_for(key)))
    }

    fn resolve(&self, path: &str) -> Box<dyn Resource<P>> {
        Box::new(self.resource(path))
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Handle to one in-memory file; reads the live map on every query.
struct MemoryResource<P> {
    path: String,
    layout: KeyLayout,
    files: FileMap,
    builder: Arc<BuildFn<P>>,
}

impl<P> MemoryResource<P> {
    fn file(&self) -> Option<MemoryFile> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.path)
            .cloned()
    }
}

impl<P> Resource<P> for MemoryResource<P> {
    fn name(&self) -> &str {
        &self.path
    }

    fn exists(&self) -> bool {
        self.file().is_some()
    }

    fn is_buildable(&self) -> bool {
        self.layout.is_buildable_path(&self.path) && self.exists()
    }

    fn is_newer_than(&self, timestamp: Timestamp) -> bool {
        self.file().is_some_and(|file| file.modified > timestamp)
    }

    fn read_bytes(&self) -> io::Result<Box<dyn Read + '_>> {
        let file = self.file().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", self.path))
        })?;
        Ok(Box::new(io::Cursor::new(file.bytes)))
    }

    fn build(&self, cx: &mut BuildContext<'_, P>) -> Result<Vec<(Key, P)>, BoxError> {
        // Snapshot first: the build may request other files of this provider
        let file = self
            .file()
            .ok_or_else(|| format!("{} was removed before it could be built", self.path))?;
        let key = self
            .layout
            .key_for(&self.path)
            .unwrap_or_else(|| Key::from(self.path.as_str()));

        let unit = SourceUnit {
            key: &key,
            name: &self.path,
            bytes: &file.bytes,
        };
        (self.builder)(&unit, cx)
    }
}
