//! Arena dependency graph for hot-reloading artifact caches.
//!
//! This crate provides the graph that backs `hotcache`:
//! - Nodes live in an arena owned by the graph and are addressed by [`NodeId`]
//! - Edges are stored on both endpoints (dependencies and dependents)
//! - Edge sets keep insertion order and never hold duplicates
//! - Edges that would close a cycle are rejected at insertion time
//! - Removing a node detaches every edge that touches it
//! - [`DependencyGraph::invalidation_order`] computes what must be rebuilt,
//!   producers first
//!
//! # Example
//!
//! ```
//! use hotcache_graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::<&str>::new();
//! let c = graph.add_node("c");
//! let b = graph.add_node("b");
//! let a = graph.add_node("a");
//!
//! // a depends on b, b depends on c
//! graph.add_dependency(a, b).unwrap();
//! graph.add_dependency(b, c).unwrap();
//!
//! // c changed: everything downstream is rebuilt after it
//! let order = graph.invalidation_order(a, |_, name| *name == "c").unwrap();
//! assert_eq!(order, vec![c, b, a]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Node identifier in the graph.
///
/// Identifiers are never reused, so an id that outlived its node simply
/// stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Adding an edge would make a node reach itself
    #[error("Cycle detected in graph: {0}")]
    CycleDetected(String),

    /// Node not found
    #[error("Node {0} not found in graph")]
    NodeNotFound(NodeId),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// A node in the graph: its data plus both edge directions.
#[derive(Debug, Clone)]
struct Node<N> {
    data: N,
    // Nodes this node requires, in discovery order
    dependencies: Vec<NodeId>,
    // Nodes that require this node, in discovery order
    dependents: Vec<NodeId>,
}

/// Directed acyclic dependency graph stored as an arena.
///
/// An edge `dependent -> dependency` is recorded on both endpoints, so the
/// two edge sets are always symmetric.
#[derive(Debug, Clone)]
pub struct DependencyGraph<N> {
    nodes: HashMap<NodeId, Node<N>>,
    next_id: usize,
    edge_count: usize,
}

impl<N> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> DependencyGraph<N> {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 0,
            edge_count: 0,
        }
    }

    /// Add a node to the graph and return its ID.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let node = Node {
            data,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        };

        let _ = self.nodes.insert(id, node);
        id
    }

    /// Remove a node, detaching all of its edges, and return its data.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<N> {
        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;

        for dependency in &node.dependencies {
            if let Some(other) = self.nodes.get_mut(dependency) {
                other.dependents.retain(|&d| d != id);
            }
        }
        for dependent in &node.dependents {
            if let Some(other) = self.nodes.get_mut(dependent) {
                other.dependencies.retain(|&d| d != id);
            }
        }
        self.edge_count -= node.dependencies.len() + node.dependents.len();

        Ok(node.data)
    }

    /// Record that `dependent` requires `dependency`.
    ///
    /// Returns `Ok(false)` if the edge already existed.
    ///
    /// # Errors
    ///
    /// - `GraphError::NodeNotFound` if either node doesn't exist
    /// - `GraphError::CycleDetected` if the edge would create a cycle
    pub fn add_dependency(&mut self, dependent: NodeId, dependency: NodeId) -> GraphResult<bool> {
        if !self.nodes.contains_key(&dependent) {
            return Err(GraphError::NodeNotFound(dependent));
        }
        if !self.nodes.contains_key(&dependency) {
            return Err(GraphError::NodeNotFound(dependency));
        }

        if self.depends_on(dependency, dependent) {
            return Err(GraphError::CycleDetected(format!(
                "Adding edge {dependent} -> {dependency} would create a cycle"
            )));
        }

        if let Some(node) = self.nodes.get_mut(&dependent) {
            if node.dependencies.contains(&dependency) {
                return Ok(false);
            }
            node.dependencies.push(dependency);
        }
        if let Some(node) = self.nodes.get_mut(&dependency) {
            node.dependents.push(dependent);
        }
        self.edge_count += 1;

        Ok(true)
    }

    /// Check whether `start` reaches `end` by following dependency edges.
    ///
    /// A node always reaches itself.
    #[must_use]
    pub fn depends_on(&self, start: NodeId, end: NodeId) -> bool {
        if start == end {
            return true;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if current == end {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }

            if let Some(node) = self.nodes.get(&current) {
                for &neighbor in &node.dependencies {
                    if !visited.contains(&neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        false
    }

    /// Check whether the node is still in the graph.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get a reference to a node's data.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn node(&self, id: NodeId) -> GraphResult<&N> {
        self.nodes
            .get(&id)
            .map(|node| &node.data)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get a mutable reference to a node's data.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut N> {
        self.nodes
            .get_mut(&id)
            .map(|node| &mut node.data)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get all node IDs in the graph, oldest first.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Get the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Get the direct dependencies of a node, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependencies(&self, id: NodeId) -> GraphResult<&[NodeId]> {
        self.nodes
            .get(&id)
            .map(|node| node.dependencies.as_slice())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get the direct dependents of a node, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependents(&self, id: NodeId) -> GraphResult<&[NodeId]> {
        self.nodes
            .get(&id)
            .map(|node| node.dependents.as_slice())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Order all nodes so that every dependency precedes its dependents.
    ///
    /// Uses Kahn's algorithm; ties are broken by node age, so the order is
    /// stable for a given graph history.
    #[must_use]
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut pending: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .map(|(&id, node)| (id, node.dependencies.len()))
            .collect();

        let mut queue: VecDeque<NodeId> = self
            .node_ids()
            .into_iter()
            .filter(|id| pending.get(id) == Some(&0))
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            result.push(id);

            if let Some(node) = self.nodes.get(&id) {
                for dependent in &node.dependents {
                    if let Some(count) = pending.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            queue.push_back(*dependent);
                        }
                    }
                }
            }
        }

        result
    }

    /// Compute every node that must be rebuilt when `root` is requested.
    ///
    /// Dependencies are visited before the node itself. A node is dirty when
    /// one of its dependencies is already scheduled or when `is_stale` says
    /// its own source changed; a dirty node is appended to the result and its
    /// dependents are visited in turn. The result is de-duplicated and lists
    /// producers before consumers. `is_stale` is called at most once per node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if `root` doesn't exist.
    pub fn invalidation_order<F>(&self, root: NodeId, is_stale: F) -> GraphResult<Vec<NodeId>>
    where
        F: FnMut(NodeId, &N) -> bool,
    {
        if !self.nodes.contains_key(&root) {
            return Err(GraphError::NodeNotFound(root));
        }

        let mut walk = InvalidationWalk {
            graph: self,
            is_stale,
            order: Vec::new(),
            scheduled: HashSet::new(),
            clean: HashSet::new(),
        };
        walk.visit(root);

        Ok(walk.order)
    }
}

/// State of one invalidation pass.
struct InvalidationWalk<'g, N, F> {
    graph: &'g DependencyGraph<N>,
    is_stale: F,
    order: Vec<NodeId>,
    scheduled: HashSet<NodeId>,
    // Nodes whose dependencies were all final and found clean
    clean: HashSet<NodeId>,
}

impl<N, F> InvalidationWalk<'_, N, F>
where
    F: FnMut(NodeId, &N) -> bool,
{
    fn visit(&mut self, id: NodeId) {
        let graph = self.graph;
        let Some(node) = graph.nodes.get(&id) else {
            return;
        };
        if self.clean.contains(&id) {
            return;
        }

        for &dependency in &node.dependencies {
            self.visit(dependency);
        }

        if self.scheduled.contains(&id) {
            return;
        }

        let dirty = node.dependencies.iter().any(|d| self.scheduled.contains(d))
            || (self.is_stale)(id, &node.data);

        if dirty {
            self.order.push(id);
            let _ = self.scheduled.insert(id);
            for &dependent in &node.dependents {
                self.visit(dependent);
            }
        } else {
            let _ = self.clean.insert(id);
        }
    }
}
