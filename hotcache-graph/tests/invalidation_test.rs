//! Incremental rebuild simulation on top of the dependency graph
//!
//! Drives the graph the way an artifact cache does:
//! 1. Sources carry a modification time, artifacts carry a build time
//! 2. A request computes the invalidation order from the requested node
//! 3. Every scheduled node is rebuilt and replaced by a fresh node
//! 4. Edges are rediscovered while rebuilding

use hotcache_graph::{DependencyGraph, NodeId};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Built {
    name: String,
    built_at: u64,
}

/// Minimal build session: a source table, the graph and a key index
struct Session {
    graph: DependencyGraph<Built>,
    index: HashMap<String, NodeId>,
    // name -> (modified, direct inputs)
    sources: HashMap<String, (u64, Vec<String>)>,
    clock: u64,
    rebuilt: Vec<String>,
}

impl Session {
    fn new(sources: &[(&str, &[&str])]) -> Self {
        Self {
            graph: DependencyGraph::new(),
            index: HashMap::new(),
            sources: sources
                .iter()
                .map(|(name, inputs)| {
                    (
                        (*name).to_string(),
                        (0, inputs.iter().map(|s| (*s).to_string()).collect()),
                    )
                })
                .collect(),
            clock: 1,
            rebuilt: Vec::new(),
        }
    }

    fn touch(&mut self, name: &str) {
        self.clock += 1;
        if let Some(source) = self.sources.get_mut(name) {
            source.0 = self.clock;
        }
    }

    fn build(&mut self, name: &str) -> NodeId {
        if let Some(old) = self.index.remove(name) {
            let _ = self.graph.remove_node(old).unwrap();
        }
        self.rebuilt.push(name.to_string());
        let id = self.graph.add_node(Built {
            name: name.to_string(),
            built_at: self.clock,
        });
        let _ = self.index.insert(name.to_string(), id);

        let inputs = self.sources[name].1.clone();
        for input in inputs {
            let dependency = self.request(&input);
            let _ = self.graph.add_dependency(id, dependency).unwrap();
        }
        id
    }

    fn request(&mut self, name: &str) -> NodeId {
        let Some(&id) = self.index.get(name) else {
            return self.build(name);
        };

        let sources = &self.sources;
        let order = self
            .graph
            .invalidation_order(id, |_, built| sources[&built.name].0 > built.built_at)
            .unwrap();

        let names: Vec<String> = order
            .iter()
            .map(|&node| self.graph.node(node).unwrap().name.clone())
            .collect();
        for stale in names {
            if self
                .index
                .get(&stale)
                .is_some_and(|&node| self.graph.contains(node))
                && order.contains(&self.index[&stale])
            {
                let _ = self.build(&stale);
            }
        }

        self.index[name]
    }
}

#[test]
fn test_unchanged_sources_are_reused() {
    let mut session = Session::new(&[("app", &["lib"]), ("lib", &[])]);

    let first = session.request("app");
    assert_eq!(session.rebuilt, vec!["app", "lib"]);

    session.rebuilt.clear();
    let second = session.request("app");
    assert_eq!(first, second);
    assert!(session.rebuilt.is_empty());
}

#[test]
fn test_changed_leaf_rebuilds_chain_in_order() {
    let mut session = Session::new(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
    let _ = session.request("a");
    session.rebuilt.clear();

    session.touch("c");
    let _ = session.request("a");

    // c is rebuilt first; b and a are rebuilt as part of the pass, and the
    // nested requests they make find c already fresh
    assert_eq!(session.rebuilt.first().map(String::as_str), Some("c"));
    assert!(session.rebuilt.contains(&"b".to_string()));
    assert!(session.rebuilt.contains(&"a".to_string()));

    session.rebuilt.clear();
    let _ = session.request("a");
    assert!(session.rebuilt.is_empty());
}

#[test]
fn test_changed_branch_leaves_other_branch_alone() {
    let mut session = Session::new(&[
        ("final", &["left", "right"]),
        ("left", &["root"]),
        ("right", &["root"]),
        ("root", &[]),
    ]);
    let _ = session.request("final");
    session.rebuilt.clear();

    session.touch("left");
    let _ = session.request("final");

    assert!(session.rebuilt.contains(&"left".to_string()));
    assert!(session.rebuilt.contains(&"final".to_string()));
    assert!(!session.rebuilt.contains(&"root".to_string()));
    assert!(!session.rebuilt.contains(&"right".to_string()));
}

#[test]
fn test_edges_survive_rebuild() {
    let mut session = Session::new(&[("a", &["b"]), ("b", &[])]);
    let _ = session.request("a");

    session.touch("b");
    let a = session.request("a");
    let b = session.index["b"];

    assert_eq!(session.graph.dependencies(a).unwrap(), &[b]);
    assert_eq!(session.graph.dependents(b).unwrap(), &[a]);
    assert_eq!(session.graph.node_count(), 2);
    assert_eq!(session.graph.edge_count(), 1);
}
