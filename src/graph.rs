//! Directed dependency graph over resource addresses.
//!
//! Edge direction follows the declaration: A → B means A depends on B, so
//! B's incoming edges are its dependents. Traversals use BFS with a visited
//! set; the input may contain cycles (the string-fallback extractor can
//! infer spurious edges) and nothing here relies on topological order.

use crate::errors::Result;
use crate::ingest::NormalizedPlan;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    index: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph from a normalized plan. Every resource becomes a
    /// node; edges are only inserted between addresses present in the plan,
    /// which keeps invariant I1 (edge endpoints are always nodes) by
    /// construction. Self-loops are skipped and duplicate edges collapse.
    pub fn build(plan: &NormalizedPlan) -> Result<DependencyGraph> {
        let mut graph = DiGraph::new();
        let mut index = BTreeMap::new();

        for resource in &plan.resources {
            let node = graph.add_node(resource.address.clone());
            index.insert(resource.address.clone(), node);
        }

        for resource in &plan.resources {
            let from = index[&resource.address];
            for dep in &resource.depends_on {
                if dep == &resource.address {
                    continue;
                }
                if let Some(&to) = index.get(dep) {
                    graph.update_edge(from, to, ());
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built dependency graph"
        );
        Ok(DependencyGraph { graph, index })
    }

    pub fn contains(&self, address: &str) -> bool {
        self.index.contains_key(address)
    }

    /// Direct dependents: nodes with an edge pointing at `address`.
    pub fn direct_dependents(&self, address: &str) -> BTreeSet<String> {
        match self.index.get(address) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|n| self.graph[n].clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Number of resources that declare a dependency on `address`.
    pub fn dependent_count(&self, address: &str) -> usize {
        match self.index.get(address) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .count(),
            None => 0,
        }
    }

    /// All transitive dependents of `address` (everything that would feel a
    /// change to it). Excludes the address itself even on cyclic input.
    pub fn downstream(&self, address: &str) -> BTreeSet<String> {
        self.walk(address, Direction::Incoming)
    }

    /// All transitive prerequisites of `address`.
    pub fn upstream(&self, address: &str) -> BTreeSet<String> {
        self.walk(address, Direction::Outgoing)
    }

    fn walk(&self, address: &str, direction: Direction) -> BTreeSet<String> {
        let start = match self.index.get(address) {
            Some(&node) => node,
            None => return BTreeSet::new(),
        };

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut seen: BTreeSet<NodeIndex> = BTreeSet::new();
        seen.insert(start);

        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, direction) {
                if seen.insert(next) {
                    visited.insert(self.graph[next].clone());
                    queue.push_back(next);
                }
            }
        }
        // A cycle back through the start node still counts it once.
        visited.remove(address);
        visited
    }
}
