//! File-system provider
//!
//! Serves units from a directory tree: key `pkg.sub.Name` maps to
//! `<root>/pkg/sub/Name.<ext>` and staleness follows the file's mtime.

use crate::context::BuildContext;
use crate::error::BoxError;
use crate::key::{Key, Timestamp};
use crate::layout::{BuildFn, KeyLayout, SourceUnit};
use crate::provider::Provider;
use crate::resource::Resource;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Provider over a directory tree.
pub struct FsProvider<P> {
    root: PathBuf,
    layout: KeyLayout,
    builder: Arc<BuildFn<P>>,
}

impl<P> FsProvider<P> {
    /// Serve files with `extension` below `root`, built by `builder`.
    pub fn new<F>(root: impl Into<PathBuf>, extension: &str, builder: F) -> Self
    where
        F: Fn(&SourceUnit<'_>, &mut BuildContext<'_, P>) -> Result<Vec<(Key, P)>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            root: root.into(),
            layout: KeyLayout::new(extension),
            builder: Arc::new(builder),
        }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key ↔ path layout
    #[must_use]
    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Every buildable key under the root, sorted.
    ///
    /// Unreadable directory entries are skipped.
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.root).ok()?;
                self.layout.key_for(&slash_path(relative))
            })
            .collect();
        keys.sort();
        keys
    }

    fn resource(&self, name: &str) -> FsResource<P> {
        let name = name.trim_start_matches('/').to_string();
        FsResource {
            path: self.root.join(&name),
            name,
            layout: self.layout.clone(),
            builder: Arc::clone(&self.builder),
        }
    }
}

impl<P: 'static> Provider<P> for FsProvider<P> {
    fn resolve_for_key(&self, key: &Key) -> Box<dyn Resource<P>> {
        Box::new(self.resource(&self.layout.path_for(key)))
    }

    fn resolve(&self, path: &str) -> Box<dyn Resource<P>> {
        Box::new(self.resource(path))
    }
}

/// Relative path with `/` separators, whatever the platform
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

struct FsResource<P> {
    path: PathBuf,
    name: String,
    layout: KeyLayout,
    builder: Arc<BuildFn<P>>,
}

impl<P> FsResource<P> {
    fn modified(&self) -> Option<Timestamp> {
        let metadata = fs::metadata(&self.path).ok()?;
        metadata.modified().ok().map(Timestamp::from)
    }
}

impl<P> Resource<P> for FsResource<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn is_buildable(&self) -> bool {
        self.layout.is_buildable_path(&self.name) && self.exists()
    }

    fn is_newer_than(&self, timestamp: Timestamp) -> bool {
        self.modified().is_some_and(|modified| modified > timestamp)
    }

    fn read_bytes(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(fs::File::open(&self.path)?))
    }

    fn build(&self, cx: &mut BuildContext<'_, P>) -> Result<Vec<(Key, P)>, BoxError> {
        let bytes = fs::read(&self.path)?;
        let key = self
            .layout
            .key_for(&self.name)
            .unwrap_or_else(|| Key::from(self.name.as_str()));

        let unit = SourceUnit {
            key: &key,
            name: &self.name,
            bytes: &bytes,
        };
        (self.builder)(&unit, cx)
    }
}
