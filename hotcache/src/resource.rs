//! Resources: handles to the source units artifacts are built from

use crate::context::BuildContext;
use crate::error::{BoxError, CacheError};
use crate::key::{Key, Timestamp};
use std::io::{self, Read};
use std::ops::{Deref, DerefMut};

/// Scheme used for the names of sentinel resources bound to a key
pub const NOT_FOUND_SCHEME: &str = "artifacts://";

/// One source unit, as handed out by a [`Provider`](crate::Provider).
///
/// Resources are ephemeral: the cache asks its providers for a fresh handle
/// every time it needs one and never keeps them past a single call.
pub trait Resource<P> {
    /// Display name; resolving it through the owning provider's
    /// [`resolve`](crate::Provider::resolve) yields this resource again.
    fn name(&self) -> &str;

    /// Whether the underlying unit exists
    fn exists(&self) -> bool;

    /// Whether this resource can build artifacts.
    ///
    /// Defaults to [`exists`](Resource::exists); providers narrow it, e.g.
    /// to files with the right extension.
    fn is_buildable(&self) -> bool {
        self.exists()
    }

    /// Whether the unit changed after `timestamp`
    fn is_newer_than(&self, timestamp: Timestamp) -> bool;

    /// Open the raw bytes of the unit.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the backing store.
    fn read_bytes(&self) -> io::Result<Box<dyn Read + '_>>;

    /// Build every artifact this unit defines.
    ///
    /// The first entry is normally the artifact for the key that was asked
    /// for; further entries are siblings defined by the same unit. Nested
    /// requests made through `cx` are recorded as dependencies of the
    /// artifact being built.
    ///
    /// # Errors
    ///
    /// Any error aborts the build; it surfaces as `CacheError::Build`.
    fn build(&self, cx: &mut BuildContext<'_, P>) -> Result<Vec<(Key, P)>, BoxError>;

    /// Release whatever the handle holds open.
    ///
    /// Called exactly once by [`ResourceGuard`], on every exit path.
    ///
    /// # Errors
    ///
    /// Release failures are logged and otherwise ignored.
    fn release(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sentinel returned when no provider has a usable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundResource {
    name: String,
}

impl NotFoundResource {
    /// Sentinel bound to a key; named `artifacts://<key>`
    #[must_use]
    pub fn for_key(key: &Key) -> Self {
        Self {
            name: format!("{NOT_FOUND_SCHEME}{key}"),
        }
    }

    /// Sentinel for a path
    #[must_use]
    pub fn at(path: &str) -> Self {
        Self {
            name: path.to_string(),
        }
    }
}

impl<P> Resource<P> for NotFoundResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self) -> bool {
        false
    }

    fn is_newer_than(&self, _timestamp: Timestamp) -> bool {
        false
    }

    fn read_bytes(&self) -> io::Result<Box<dyn Read + '_>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", self.name),
        ))
    }

    fn build(&self, _cx: &mut BuildContext<'_, P>) -> Result<Vec<(Key, P)>, BoxError> {
        let key = self.name.strip_prefix(NOT_FOUND_SCHEME).unwrap_or(&self.name);
        Err(Box::new(CacheError::NotFound(Key::from(key))))
    }
}

/// Scope guard that releases a resource when dropped.
pub struct ResourceGuard<P> {
    resource: Box<dyn Resource<P>>,
}

impl<P> ResourceGuard<P> {
    /// Take ownership of a resource until the guard goes out of scope
    #[must_use]
    pub fn new(resource: Box<dyn Resource<P>>) -> Self {
        Self { resource }
    }
}

impl<P> Deref for ResourceGuard<P> {
    type Target = dyn Resource<P>;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref()
    }
}

impl<P> DerefMut for ResourceGuard<P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut()
    }
}

impl<P> Drop for ResourceGuard<P> {
    fn drop(&mut self) {
        if let Err(e) = self.resource.release() {
            tracing::warn!("Could not release resource {}: {}", self.resource.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted {
        releases: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Resource<()> for Counted {
        fn name(&self) -> &str {
            "counted"
        }

        fn exists(&self) -> bool {
            true
        }

        fn is_newer_than(&self, _timestamp: Timestamp) -> bool {
            false
        }

        fn read_bytes(&self) -> io::Result<Box<dyn Read + '_>> {
            Ok(Box::new(io::empty()))
        }

        fn build(&self, _cx: &mut BuildContext<'_, ()>) -> Result<Vec<(Key, ())>, BoxError> {
            Ok(Vec::new())
        }

        fn release(&mut self) -> io::Result<()> {
            let _ = self.releases.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(io::Error::other("handle already closed"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_not_found_resource() {
        let resource = NotFoundResource::for_key(&Key::from("pkg.A"));
        assert_eq!(Resource::<()>::name(&resource), "artifacts://pkg.A");
        assert!(!Resource::<()>::exists(&resource));
        assert!(!Resource::<()>::is_buildable(&resource));
        assert!(!Resource::<()>::is_newer_than(&resource, Timestamp::EPOCH));
        assert!(Resource::<()>::read_bytes(&resource).is_err());
    }

    #[test]
    fn test_guard_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let guard = ResourceGuard::new(Box::new(Counted {
                releases: Arc::clone(&releases),
                fail: false,
            }));
            assert!(guard.exists());
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_swallows_release_failure() {
        let releases = Arc::new(AtomicUsize::new(0));
        drop(ResourceGuard::new(Box::new(Counted {
            releases: Arc::clone(&releases),
            fail: true,
        })));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
