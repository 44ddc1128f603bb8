//! Authoritative resolvers
//!
//! Resolvers are consulted before the cache and the providers. Their
//! answers are final: never cached, never tracked as dependencies and
//! never invalidated.

use crate::key::Key;
use std::collections::HashMap;
use std::fmt;

/// Answers for keys that bypass the cache entirely.
pub trait AuthoritativeResolver<P>: Send + Sync {
    /// The artifact for `key`, or `None` to fall through to the cache
    fn try_resolve(&self, key: &Key) -> Option<P>;
}

/// Resolver backed by a fixed table.
#[derive(Debug, Clone)]
pub struct StaticResolver<P> {
    entries: HashMap<Key, P>,
}

impl<P> Default for StaticResolver<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> StaticResolver<P> {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Builder-style [`insert`](StaticResolver::insert)
    #[must_use]
    pub fn with(mut self, key: impl Into<Key>, artifact: P) -> Self {
        let _ = self.insert(key, artifact);
        self
    }

    /// Add or replace an entry, returning the previous one
    pub fn insert(&mut self, key: impl Into<Key>, artifact: P) -> Option<P> {
        self.entries.insert(key.into(), artifact)
    }
}

impl<P: Clone + Send + Sync> AuthoritativeResolver<P> for StaticResolver<P> {
    fn try_resolve(&self, key: &Key) -> Option<P> {
        self.entries.get(key).cloned()
    }
}

/// Resolver backed by a closure.
pub struct FnResolver<F> {
    resolve: F,
}

impl<F> FnResolver<F> {
    /// Wrap a `Fn(&Key) -> Option<P>`
    pub fn new(resolve: F) -> Self {
        Self { resolve }
    }
}

impl<F> fmt::Debug for FnResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver").finish_non_exhaustive()
    }
}

impl<P, F> AuthoritativeResolver<P> for FnResolver<F>
where
    F: Fn(&Key) -> Option<P> + Send + Sync,
{
    fn try_resolve(&self, key: &Key) -> Option<P> {
        (self.resolve)(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver() {
        let mut resolver = StaticResolver::new().with("std.Object", 1);
        assert_eq!(resolver.insert("std.String", 2), None);
        assert_eq!(resolver.insert("std.String", 3), Some(2));

        assert_eq!(resolver.try_resolve(&Key::from("std.Object")), Some(1));
        assert_eq!(resolver.try_resolve(&Key::from("std.String")), Some(3));
        assert_eq!(resolver.try_resolve(&Key::from("app.Main")), None);
    }

    #[test]
    fn test_fn_resolver() {
        let resolver = FnResolver::new(|key: &Key| {
            key.as_str().strip_prefix("lit.").map(str::to_uppercase)
        });
        assert_eq!(
            resolver.try_resolve(&Key::from("lit.abc")),
            Some("ABC".to_string())
        );
        assert_eq!(resolver.try_resolve(&Key::from("pkg.A")), None);
    }
}
