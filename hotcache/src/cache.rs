//! The artifact cache

use crate::artifact::{Artifact, ArtifactInfo};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::context::BuildContext;
use crate::error::CacheResult;
use crate::key::Key;
use crate::provider::{Located, Provider, ProviderChain};
use crate::resolver::{AuthoritativeResolver, FnResolver};
use crate::resource::ResourceGuard;
use crate::state::CacheState;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Key → artifact cache with implicit dependency tracking and transitive
/// invalidation.
///
/// Requests first go to the authoritative resolvers; anything they don't
/// know is served from the cache, built through the provider chain on a
/// miss and checked for staleness on a hit. Builders request nested
/// artifacts through the [`BuildContext`] they are handed, which records
/// each nested request as a dependency edge.
///
/// One lock serializes lookup, build and reload.
pub struct ArtifactCache<P> {
    resolvers: Vec<Arc<dyn AuthoritativeResolver<P>>>,
    chain: ProviderChain<P>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState<P>>,
}

impl<P: Clone + Send + 'static> ArtifactCache<P> {
    /// Start configuring a cache
    #[must_use]
    pub fn builder() -> ArtifactCacheBuilder<P> {
        ArtifactCacheBuilder::new()
    }

    /// Cache over `chain` with default configuration and no resolvers
    #[must_use]
    pub fn new(chain: ProviderChain<P>) -> Self {
        Self {
            resolvers: Vec::new(),
            chain,
            config: CacheConfig::default(),
            clock: Arc::new(SystemClock),
            state: Mutex::new(CacheState::new()),
        }
    }

    /// Get the artifact for `key`, building or reloading it as needed.
    ///
    /// # Errors
    ///
    /// - `CacheError::NotFound` if nothing yields the key
    /// - `CacheError::Build` if a build step failed
    /// - `CacheError::Reload` if a stale entry failed to rebuild; the
    ///   affected entries are evicted
    pub fn get_artifact(&self, key: &str) -> CacheResult<P> {
        let key = Key::from(key);
        if let Some(payload) = self.resolve_authoritative(&key) {
            debug!("{} answered by an authoritative resolver", key);
            return Ok(payload);
        }

        let mut state = self.lock();
        let mut cx = BuildContext::new(self, &mut state);
        cx.request(key)
    }

    /// Current entry for `key`, without checking it for staleness
    #[must_use]
    pub fn artifact(&self, key: &str) -> Option<ArtifactInfo> {
        let state = self.lock();
        let id = state.lookup(&Key::from(key))?;
        state.info(id)
    }

    /// Every entry, dependencies before dependents
    #[must_use]
    pub fn snapshot(&self) -> Vec<ArtifactInfo> {
        self.lock().snapshot()
    }

    /// Keys of every entry, tombstones included, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.lock().keys()
    }

    /// Number of entries, tombstones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an entry exists for `key`
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().lookup(&Key::from(key)).is_some()
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut state = self.lock();
        info!("Clearing {} cached entries", state.len());
        state.clear();
    }

    /// Resolve a raw path through the provider chain
    #[must_use]
    pub fn resolve(&self, path: &str) -> Located<P> {
        self.chain.resolve(path)
    }

    /// Resource that would build `key`
    #[must_use]
    pub fn resolve_for_key(&self, key: &str) -> Located<P> {
        self.chain.resolve_for_key(&Key::from(key))
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The provider chain
    #[must_use]
    pub fn providers(&self) -> &ProviderChain<P> {
        &self.chain
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn resolve_authoritative(&self, key: &Key) -> Option<P> {
        self.resolvers
            .iter()
            .find_map(|resolver| resolver.try_resolve(key))
    }

    /// Whether an entry's source changed since it was built.
    ///
    /// Entries with an owning provider are stale once their resource is gone
    /// or newer than the build; tombstones nobody vouched for are stale once
    /// the chain can build their key.
    pub(crate) fn is_stale(&self, artifact: &Artifact<P>) -> bool {
        match &artifact.provider {
            Some(provider) => {
                let resource = ResourceGuard::new(provider.resolve(&artifact.resource));
                !resource.exists() || resource.is_newer_than(artifact.built_at)
            }
            None => {
                let (resource, _) = self.chain.resolve_for_key(&artifact.key).into_parts();
                ResourceGuard::new(resource).is_buildable()
            }
        }
    }

    // Builders only mutate state between builds, so a lock poisoned by a
    // panicking builder still guards a consistent state
    fn lock(&self) -> MutexGuard<'_, CacheState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> fmt::Debug for ArtifactCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("resolvers", &self.resolvers.len())
            .field("providers", &self.chain.len())
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ArtifactCache`].
pub struct ArtifactCacheBuilder<P> {
    resolvers: Vec<Arc<dyn AuthoritativeResolver<P>>>,
    chain: ProviderChain<P>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl<P> Default for ArtifactCacheBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ArtifactCacheBuilder<P> {
    /// Builder with no providers, no resolvers, default config and the
    /// system clock
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
            chain: ProviderChain::new(),
            config: CacheConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Append a provider; earlier providers take priority
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn Provider<P>>) -> Self {
        self.chain.push(provider);
        self
    }

    /// Append an authoritative resolver; earlier resolvers take priority
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn AuthoritativeResolver<P>>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Append a closure as an authoritative resolver
    #[must_use]
    pub fn resolver_fn<F>(self, resolve: F) -> Self
    where
        F: Fn(&Key) -> Option<P> + Send + Sync + 'static,
        P: 'static,
    {
        self.resolver(Arc::new(FnResolver::new(resolve)))
    }

    /// Replace the configuration
    #[must_use]
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the clock used to stamp builds
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create the cache
    #[must_use]
    pub fn build(self) -> ArtifactCache<P> {
        ArtifactCache {
            resolvers: self.resolvers,
            chain: self.chain,
            config: self.config,
            clock: self.clock,
            state: Mutex::new(CacheState::new()),
        }
    }
}
