//! Providers and the priority chain that resolves keys to resources

use crate::key::Key;
use crate::resource::{NotFoundResource, Resource, ResourceGuard};
use std::fmt;
use std::sync::Arc;

/// Resolves keys and paths to [`Resource`]s.
///
/// Misses are not errors: a provider that has nothing for a key returns a
/// resource that does not exist (or is not buildable) and the chain moves
/// on to the next provider.
pub trait Provider<P>: Send + Sync {
    /// Resource that would build the artifact for `key`
    fn resolve_for_key(&self, key: &Key) -> Box<dyn Resource<P>>;

    /// Resource at a provider-specific path, for raw byte access
    fn resolve(&self, path: &str) -> Box<dyn Resource<P>>;

    /// [`resolve_for_key`](Provider::resolve_for_key) paired with the
    /// provider that will own the resource. `this` is the handle the caller
    /// holds for `self`; chains hand out their inner provider instead.
    fn locate_for_key(&self, this: &Arc<dyn Provider<P>>, key: &Key) -> Located<P> {
        Located::new(self.resolve_for_key(key), Arc::clone(this))
    }

    /// [`resolve`](Provider::resolve) paired with its owning provider
    fn locate(&self, this: &Arc<dyn Provider<P>>, path: &str) -> Located<P> {
        Located::new(self.resolve(path), Arc::clone(this))
    }
}

/// A resource together with the provider that produced it.
pub struct Located<P> {
    resource: Box<dyn Resource<P>>,
    provider: Option<Arc<dyn Provider<P>>>,
}

impl<P> Located<P> {
    /// Pair a resource with its owning provider
    #[must_use]
    pub fn new(resource: Box<dyn Resource<P>>, provider: Arc<dyn Provider<P>>) -> Self {
        Self {
            resource,
            provider: Some(provider),
        }
    }

    /// A resource no provider owns, such as the not-found sentinel
    #[must_use]
    pub fn unowned(resource: Box<dyn Resource<P>>) -> Self {
        Self {
            resource,
            provider: None,
        }
    }

    /// The resource itself
    #[must_use]
    pub fn resource(&self) -> &dyn Resource<P> {
        self.resource.as_ref()
    }

    /// Provider that produced the resource; `None` for sentinels
    #[must_use]
    pub fn owning_provider(&self) -> Option<&Arc<dyn Provider<P>>> {
        self.provider.as_ref()
    }

    /// Split into resource and owning provider
    #[must_use]
    pub fn into_parts(self) -> (Box<dyn Resource<P>>, Option<Arc<dyn Provider<P>>>) {
        (self.resource, self.provider)
    }
}

impl<P> fmt::Debug for Located<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Located")
            .field("resource", &self.resource.name())
            .field("owned", &self.provider.is_some())
            .finish()
    }
}

/// Ordered list of providers; the first match wins.
pub struct ProviderChain<P> {
    providers: Vec<Arc<dyn Provider<P>>>,
}

impl<P> Default for ProviderChain<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for ProviderChain<P> {
    fn clone(&self) -> Self {
        Self {
            providers: self.providers.clone(),
        }
    }
}

impl<P> ProviderChain<P> {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Append a provider with the lowest priority so far
    pub fn push(&mut self, provider: Arc<dyn Provider<P>>) {
        self.providers.push(provider);
    }

    /// Builder-style [`push`](ProviderChain::push)
    #[must_use]
    pub fn with(mut self, provider: Arc<dyn Provider<P>>) -> Self {
        self.push(provider);
        self
    }

    /// Number of providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<P: 'static> ProviderChain<P> {
    /// First buildable resource for `key`, or a sentinel bound to the key.
    ///
    /// Candidates that miss are released before the next provider is asked.
    #[must_use]
    pub fn resolve_for_key(&self, key: &Key) -> Located<P> {
        for provider in &self.providers {
            let located = provider.locate_for_key(provider, key);
            if located.resource().is_buildable() {
                return located;
            }
            tracing::trace!(
                "No buildable resource for {} at {}",
                key,
                located.resource().name()
            );
            drop(ResourceGuard::new(located.into_parts().0));
        }
        Located::unowned(Box::new(NotFoundResource::for_key(key)))
    }

    /// First existing resource at `path`, or a sentinel for the path.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Located<P> {
        for provider in &self.providers {
            let located = provider.locate(provider, path);
            if located.resource().exists() {
                return located;
            }
            drop(ResourceGuard::new(located.into_parts().0));
        }
        Located::unowned(Box::new(NotFoundResource::at(path)))
    }
}

/// A chain is itself a provider, so chains nest. Resources found through a
/// nested chain are owned by the inner provider that produced them, so a
/// reload goes back to that provider rather than re-running the chain.
impl<P: 'static> Provider<P> for ProviderChain<P> {
    fn resolve_for_key(&self, key: &Key) -> Box<dyn Resource<P>> {
        ProviderChain::resolve_for_key(self, key).into_parts().0
    }

    fn resolve(&self, path: &str) -> Box<dyn Resource<P>> {
        ProviderChain::resolve(self, path).into_parts().0
    }

    fn locate_for_key(&self, _this: &Arc<dyn Provider<P>>, key: &Key) -> Located<P> {
        ProviderChain::resolve_for_key(self, key)
    }

    fn locate(&self, _this: &Arc<dyn Provider<P>>, path: &str) -> Located<P> {
        ProviderChain::resolve(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Timestamp;
    use crate::memory::MemoryProvider;

    fn text_provider(extension: &str) -> Arc<MemoryProvider<String>> {
        Arc::new(MemoryProvider::new(extension, |unit, _cx| {
            Ok(vec![(unit.key.clone(), unit.text()?.to_string())])
        }))
    }

    #[test]
    fn test_first_buildable_provider_wins() {
        let scripts = text_provider("script");
        let sources = text_provider("src");
        scripts.write("pkg/A.script", "from scripts", Timestamp::EPOCH);
        sources.write("pkg/A.src", "from sources", Timestamp::EPOCH);

        let chain = ProviderChain::new()
            .with(sources.clone() as Arc<dyn Provider<String>>)
            .with(scripts.clone() as Arc<dyn Provider<String>>);

        let located = chain.resolve_for_key(&Key::from("pkg.A"));
        assert_eq!(located.resource().name(), "pkg/A.src");
        assert!(located.owning_provider().is_some());
    }

    #[test]
    fn test_skips_providers_without_the_key() {
        let empty = text_provider("src");
        let scripts = text_provider("script");
        scripts.write("pkg/B.script", "b", Timestamp::EPOCH);

        let chain = ProviderChain::new()
            .with(empty as Arc<dyn Provider<String>>)
            .with(scripts as Arc<dyn Provider<String>>);

        let located = chain.resolve_for_key(&Key::from("pkg.B"));
        assert_eq!(located.resource().name(), "pkg/B.script");
    }

    #[test]
    fn test_miss_returns_sentinel() {
        let chain = ProviderChain::new().with(text_provider("src") as Arc<dyn Provider<String>>);

        let located = chain.resolve_for_key(&Key::from("pkg.Missing"));
        assert_eq!(located.resource().name(), "artifacts://pkg.Missing");
        assert!(!located.resource().exists());
        assert!(located.owning_provider().is_none());
    }

    #[test]
    fn test_resolve_matches_on_existence() {
        let sources = text_provider("src");
        sources.write("README.md", "docs", Timestamp::EPOCH);
        let chain = ProviderChain::new().with(sources as Arc<dyn Provider<String>>);

        // Not buildable, but present for raw byte access
        let located = chain.resolve("README.md");
        assert!(located.resource().exists());
        assert!(!located.resource().is_buildable());

        let missing = chain.resolve("missing.md");
        assert_eq!(missing.resource().name(), "missing.md");
        assert!(!missing.resource().exists());
    }

    #[test]
    fn test_chains_nest() {
        let sources = text_provider("src");
        sources.write("pkg/C.src", "c", Timestamp::EPOCH);
        let inner = ProviderChain::new().with(sources.clone() as Arc<dyn Provider<String>>);
        let outer = ProviderChain::new().with(Arc::new(inner) as Arc<dyn Provider<String>>);

        let located = outer.resolve_for_key(&Key::from("pkg.C"));
        assert_eq!(located.resource().name(), "pkg/C.src");

        // Owned by the leaf provider, not the inner chain
        let owner = located.owning_provider().unwrap();
        assert_eq!(
            Arc::as_ptr(owner).cast::<()>(),
            Arc::as_ptr(&sources).cast::<()>()
        );
        let raw = outer.resolve("pkg/C.src");
        assert_eq!(
            Arc::as_ptr(raw.owning_provider().unwrap()).cast::<()>(),
            Arc::as_ptr(&sources).cast::<()>()
        );
    }

    #[test]
    fn test_nested_miss_falls_through_to_next_provider() {
        let inner = ProviderChain::new().with(text_provider("src") as Arc<dyn Provider<String>>);
        let scripts = text_provider("script");
        scripts.write("pkg/D.script", "d", Timestamp::EPOCH);
        let outer = ProviderChain::new()
            .with(Arc::new(inner) as Arc<dyn Provider<String>>)
            .with(scripts as Arc<dyn Provider<String>>);

        assert_eq!(
            outer.resolve_for_key(&Key::from("pkg.D")).resource().name(),
            "pkg/D.script"
        );
    }
}
