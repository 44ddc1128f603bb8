//! Per-request build context
//!
//! A [`BuildContext`] is created for every top-level request and handed to
//! each builder that runs on its behalf. It owns the stack of keys under
//! construction and the buffer of dependency edges discovered on the way;
//! the buffer is flushed into the cache's graph when the outermost request
//! returns.

use crate::artifact::{Artifact, Payload};
use crate::cache::ArtifactCache;
use crate::error::{BoxError, CacheError, CacheResult};
use crate::key::{Key, Timestamp};
use crate::provider::{Located, Provider};
use crate::resource::ResourceGuard;
use crate::state::CacheState;
use hotcache_graph::NodeId;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// "`dependent` requested `dependency` while being built"
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEdge {
    dependent: Key,
    dependency: Key,
}

/// Handle through which builders request nested artifacts.
///
/// Every artifact obtained through [`get_artifact`](BuildContext::get_artifact)
/// becomes a dependency of the artifact currently being built. Builders must
/// not call [`ArtifactCache::get_artifact`] on the cache itself: the cache
/// lock is already held and the request would deadlock.
pub struct BuildContext<'a, P> {
    cache: &'a ArtifactCache<P>,
    state: &'a mut CacheState<P>,
    stack: Vec<Key>,
    pending: Vec<PendingEdge>,
}

impl<'a, P: Clone + Send + 'static> BuildContext<'a, P> {
    pub(crate) fn new(cache: &'a ArtifactCache<P>, state: &'a mut CacheState<P>) -> Self {
        Self {
            cache,
            state,
            stack: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Request an artifact on behalf of the one being built.
    ///
    /// # Errors
    ///
    /// Same as [`ArtifactCache::get_artifact`]; additionally `Cycle` if
    /// `key` is already under construction and `DepthExceeded` if the
    /// nesting limit is reached.
    pub fn get_artifact(&mut self, key: &str) -> CacheResult<P> {
        let key = Key::from(key);
        if let Some(payload) = self.cache.resolve_authoritative(&key) {
            return Ok(payload);
        }
        self.request(key)
    }

    /// Key currently being built, if any
    #[must_use]
    pub fn current_key(&self) -> Option<&Key> {
        self.stack.last()
    }

    /// Number of builds currently nested
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Resolve a raw path through the provider chain.
    ///
    /// Resources read this way are not tracked as dependencies.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Located<P> {
        self.cache.resolve(path)
    }

    /// Serve `key` from the cache, building or reloading as needed.
    pub(crate) fn request(&mut self, key: Key) -> CacheResult<P> {
        if self.stack.contains(&key) {
            return Err(CacheError::Cycle {
                chain: self.stack.clone(),
                key,
            });
        }
        let limit = self.cache.config().max_build_depth;
        if self.stack.len() >= limit {
            return Err(CacheError::DepthExceeded { key, limit });
        }

        let enclosing = self.stack.last().cloned();
        let outermost = enclosing.is_none();
        let mark = self.pending.len();

        self.stack.push(key.clone());
        let result = self.lookup_or_build(&key);
        let _ = self.stack.pop();

        match &result {
            Ok(_) => {
                if let Some(dependent) = enclosing {
                    self.pending.push(PendingEdge {
                        dependent,
                        dependency: key.clone(),
                    });
                }
            }
            Err(_) => self.discard_edges(mark, &key),
        }

        let payload = result.map(|id| self.state.get(id).map(|a| a.payload.clone()));
        if outermost {
            self.flush();
        }

        match payload? {
            Some(Payload::Built(payload)) => Ok(payload),
            Some(Payload::NotFound) | None => Err(CacheError::NotFound(key)),
        }
    }

    fn lookup_or_build(&mut self, key: &Key) -> CacheResult<NodeId> {
        let now = self.cache.clock().now();

        if let Some(id) = self.state.lookup(key) {
            if self.cache.config().hot_reload {
                let order = self.invalidation_order(id);
                if !order.is_empty() {
                    debug!("Request for {} reloads {} entries", key, order.len());
                    // Only frames that are building count toward cycles, and
                    // this one is a lookup: dependents reloaded here may
                    // request `key` again
                    let frame = self.stack.pop();
                    let reloaded = self.reload_all(&order, now);
                    self.stack.extend(frame);
                    reloaded?;
                }
            }
            // A reload may have dropped the entry, e.g. a sibling its
            // resource no longer defines
            if let Some(id) = self.state.lookup(key) {
                debug!("Cache hit for {}", key);
                return Ok(id);
            }
        }

        let located = self.cache.providers().resolve_for_key(key);
        self.build(key, located, None, now)
    }

    /// Stale entries reachable from `root`, minus those enclosing frames
    /// are already rebuilding.
    fn invalidation_order(&self, root: NodeId) -> Vec<NodeId> {
        let cache = self.cache;
        let state: &CacheState<P> = &*self.state;
        let enclosing = &self.stack[..self.stack.len().saturating_sub(1)];
        let mut order = state
            .graph()
            .invalidation_order(root, |_, artifact| cache.is_stale(artifact))
            .unwrap_or_default();
        order.retain(|&id| state.get(id).is_some_and(|a| !enclosing.contains(&a.key)));
        order
    }

    /// Reload entries in order; on failure evict the rest of the list.
    fn reload_all(&mut self, order: &[NodeId], now: Timestamp) -> CacheResult<()> {
        for (i, &id) in order.iter().enumerate() {
            if let Err(e) = self.reload(id, now) {
                let evicted = order[i..]
                    .iter()
                    .filter(|&&rest| self.state.evict(rest).is_some())
                    .count();
                warn!("{}; evicted {} scheduled entries", e, evicted);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Rebuild one entry in its own frame, so the edges it discovers are
    /// attributed to it.
    fn reload(&mut self, id: NodeId, now: Timestamp) -> CacheResult<()> {
        let Some(artifact) = self.state.get(id) else {
            // Replaced earlier in this pass along with a sibling
            return Ok(());
        };
        let key = artifact.key.clone();
        let located = match &artifact.provider {
            Some(provider) => {
                Located::new(provider.resolve(&artifact.resource), Arc::clone(provider))
            }
            None => self.cache.providers().resolve_for_key(&key),
        };

        info!("Reloading {} from {}", key, located.resource().name());
        let mark = self.pending.len();
        self.stack.push(key.clone());
        let result = self.build(&key, located, Some(id), now);
        let _ = self.stack.pop();

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.discard_edges(mark, &key);
                let source: BoxError = match e {
                    CacheError::Build { source, .. } => source,
                    other => Box::new(other),
                };
                Err(CacheError::Reload { key, source })
            }
        }
    }

    /// Build `key` from `located` and install every artifact it yields.
    ///
    /// On success the entries of `previous`'s build generation are evicted
    /// first, so siblings the resource no longer defines disappear.
    fn build(
        &mut self,
        key: &Key,
        located: Located<P>,
        previous: Option<NodeId>,
        now: Timestamp,
    ) -> CacheResult<NodeId> {
        let (resource, provider) = located.into_parts();
        let resource = ResourceGuard::new(resource);
        let name = resource.name().to_string();
        let previous_generation = previous
            .and_then(|id| self.state.get(id))
            .map(|a| a.generation);

        if !resource.is_buildable() {
            debug!("Nothing buildable for {}, caching not-found", key);
            self.evict_previous(previous_generation);
            let generation = self.state.allocate_generation();
            return Ok(self
                .state
                .install(tombstone(key.clone(), now, name, None, generation)));
        }

        info!("Building {} from {}", key, name);
        let outputs = resource.build(self).map_err(|source| CacheError::Build {
            key: key.clone(),
            source,
        })?;

        self.evict_previous(previous_generation);
        let generation = self.state.allocate_generation();
        let mut requested = None;
        for (output, payload) in outputs {
            let is_requested = output == *key;
            let id = self.state.install(Artifact {
                key: output,
                payload: Payload::Built(payload),
                built_at: now,
                resource: name.clone(),
                provider: provider.clone(),
                generation,
            });
            if is_requested {
                requested = Some(id);
            }
        }

        match requested {
            Some(id) => Ok(id),
            None => {
                warn!("{} did not produce an artifact for {}", name, key);
                Ok(self
                    .state
                    .install(tombstone(key.clone(), now, name, provider, generation)))
            }
        }
    }

    fn evict_previous(&mut self, generation: Option<u64>) {
        if let Some(generation) = generation {
            let evicted = self.state.evict_generation(generation);
            debug!("Evicted {} entries of generation {}", evicted, generation);
        }
    }

    /// Drop the edges `key` buffered since `mark`; nested frames keep theirs.
    fn discard_edges(&mut self, mark: usize, key: &Key) {
        let mark = mark.min(self.pending.len());
        let tail = self.pending.split_off(mark);
        self.pending
            .extend(tail.into_iter().filter(|edge| edge.dependent != *key));
    }

    /// Record every buffered edge in the graph.
    fn flush(&mut self) {
        for edge in std::mem::take(&mut self.pending) {
            let (Some(dependent), Some(dependency)) = (
                self.state.lookup(&edge.dependent),
                self.state.lookup(&edge.dependency),
            ) else {
                debug!(
                    "Dropping edge {} -> {}: endpoint no longer cached",
                    edge.dependent, edge.dependency
                );
                continue;
            };
            if dependent == dependency {
                continue;
            }

            match self.state.link(dependent, dependency) {
                Ok(true) => debug!("Recorded {} -> {}", edge.dependent, edge.dependency),
                Ok(false) => {}
                Err(e) => warn!(
                    "Rejected dependency {} -> {}: {}",
                    edge.dependent, edge.dependency, e
                ),
            }
        }
    }
}

fn tombstone<P>(
    key: Key,
    built_at: Timestamp,
    resource: String,
    provider: Option<Arc<dyn Provider<P>>>,
    generation: u64,
) -> Artifact<P> {
    Artifact {
        key,
        payload: Payload::NotFound,
        built_at,
        resource,
        provider,
        generation,
    }
}
