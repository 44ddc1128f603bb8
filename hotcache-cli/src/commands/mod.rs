//! Subcommand implementations
//!
//! Every command works on a [`Session`]: a file-system provider over the
//! workspace root and a cache on top of it. Output goes to the writer the
//! caller passes in so commands can be exercised from tests.

pub mod get;
pub mod graph;
pub mod list;
pub mod watch;

use crate::template::{Text, build_template};
use hotcache::{ArtifactCache, CacheConfig, FsProvider, Provider};
use std::path::Path;
use std::sync::Arc;

/// Result type shared by all commands
pub type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Provider and cache for one workspace.
pub struct Session {
    /// Templates under the workspace root
    pub provider: Arc<FsProvider<Text>>,
    /// Cache over `provider`
    pub cache: ArtifactCache<Text>,
}

impl Session {
    /// Open `root`, treating files with `extension` as templates.
    pub fn open(root: &Path, extension: &str, config: CacheConfig) -> Self {
        let provider = Arc::new(FsProvider::new(root, extension, build_template));
        let cache = ArtifactCache::builder()
            .provider(Arc::clone(&provider) as Arc<dyn Provider<Text>>)
            .config(config)
            .build();
        tracing::debug!("Opened {} ({} files)", root.display(), extension);

        Self { provider, cache }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Workspace in a temporary directory
    pub(crate) fn workspace(files: &[(&str, &str)]) -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        for (path, contents) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        let session = Session::open(dir.path(), "txt", CacheConfig::default());
        (dir, session)
    }

    pub(crate) fn output(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }
}
