//! Live entries and the dependency graph between them

use crate::artifact::{Artifact, ArtifactInfo};
use crate::key::Key;
use hotcache_graph::{DependencyGraph, GraphResult, NodeId};
use std::collections::HashMap;

/// Everything the cache lock protects.
pub(crate) struct CacheState<P> {
    graph: DependencyGraph<Artifact<P>>,
    index: HashMap<Key, NodeId>,
    next_generation: u64,
}

impl<P> CacheState<P> {
    pub(crate) fn new() -> Self {
        Self {
            graph: DependencyGraph::new(),
            index: HashMap::new(),
            next_generation: 0,
        }
    }

    pub(crate) fn graph(&self) -> &DependencyGraph<Artifact<P>> {
        &self.graph
    }

    pub(crate) fn lookup(&self, key: &Key) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Artifact<P>> {
        self.graph.node(id).ok()
    }

    pub(crate) fn allocate_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    /// Insert an entry, evicting whatever was live under the same key.
    pub(crate) fn install(&mut self, artifact: Artifact<P>) -> NodeId {
        if let Some(old) = self.lookup(&artifact.key) {
            let _ = self.evict(old);
        }
        let key = artifact.key.clone();
        let id = self.graph.add_node(artifact);
        let _ = self.index.insert(key, id);
        id
    }

    /// Remove an entry and detach its edges.
    pub(crate) fn evict(&mut self, id: NodeId) -> Option<Artifact<P>> {
        let artifact = self.graph.remove_node(id).ok()?;
        if self.index.get(&artifact.key) == Some(&id) {
            let _ = self.index.remove(&artifact.key);
        }
        Some(artifact)
    }

    /// Evict every entry of a build generation; returns how many went.
    pub(crate) fn evict_generation(&mut self, generation: u64) -> usize {
        let doomed: Vec<NodeId> = self
            .graph
            .node_ids()
            .into_iter()
            .filter(|&id| self.get(id).is_some_and(|a| a.generation == generation))
            .collect();
        doomed
            .into_iter()
            .filter(|&id| self.evict(id).is_some())
            .count()
    }

    pub(crate) fn link(&mut self, dependent: NodeId, dependency: NodeId) -> GraphResult<bool> {
        self.graph.add_dependency(dependent, dependency)
    }

    pub(crate) fn info(&self, id: NodeId) -> Option<ArtifactInfo> {
        let artifact = self.get(id)?;
        let keys = |ids: &[NodeId]| -> Vec<Key> {
            ids.iter()
                .filter_map(|&other| self.get(other).map(|a| a.key.clone()))
                .collect()
        };

        Some(ArtifactInfo {
            key: artifact.key.clone(),
            found: !artifact.payload.is_not_found(),
            built_at: artifact.built_at,
            resource: artifact.resource.clone(),
            generation: artifact.generation,
            dependencies: keys(self.graph.dependencies(id).ok()?),
            dependents: keys(self.graph.dependents(id).ok()?),
        })
    }

    /// Every entry, dependencies before dependents.
    pub(crate) fn snapshot(&self) -> Vec<ArtifactInfo> {
        self.graph
            .topological_order()
            .into_iter()
            .filter_map(|id| self.info(id))
            .collect()
    }

    pub(crate) fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.index.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn clear(&mut self) {
        self.graph = DependencyGraph::new();
        self.index.clear();
    }
}
