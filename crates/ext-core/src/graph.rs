//! Boot-order resolution for providers.
//!
//! Providers may name other providers that must boot before them. Ordering
//! works in two steps:
//!
//! 1. Pre-sort every node by `(priority, discovery index)`. This order breaks
//!    ties and is the fallback when the graph has a cycle.
//! 2. Run Kahn's algorithm with a FIFO queue seeded in pre-sorted order.
//!
//! A cycle never aborts startup. It is logged and the pre-sorted order is
//! used as is.
//!
//! # Example
//!
//! ```
//! use ext_core::graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("A", 0);
//! graph.add_node("B", 5);
//! graph.add_node("C", -5);
//! graph.add_dependency("B", "A");
//!
//! let order = graph.topological_sort();
//! assert_eq!(order.ids, vec!["C", "A", "B"]);
//! assert!(!order.is_fallback());
//! ```

use std::collections::{HashMap, VecDeque};

/// A provider in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub id: String,
    pub priority: i32,
    /// Position in discovery order.
    pub index: usize,
}

/// Result of a sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootOrder {
    /// Every node exactly once.
    pub ids: Vec<String>,
    /// Nodes left unsorted by Kahn's algorithm when a cycle forced the
    /// fallback, in pre-sorted order.
    pub cycle: Option<Vec<String>>,
}

impl BootOrder {
    pub fn is_fallback(&self) -> bool {
        self.cycle.is_some()
    }
}

/// Directed graph of "boot after" relations.
///
/// Nodes keep insertion order as their discovery index. Edges are stored
/// from dependent to dependency; edges naming an unknown node or the node
/// itself are kept but ignored by the sort.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: HashMap<String, usize>,
    /// dependent -> dependencies, in declaration order
    after: Vec<Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. A repeated id is ignored; the first one keeps its index.
    pub fn add_node(&mut self, id: impl Into<String>, priority: i32) -> bool {
        let id = id.into();
        if self.index.contains_key(&id) {
            tracing::debug!(provider = %id, "duplicate graph node ignored");
            return false;
        }
        let index = self.nodes.len();
        self.index.insert(id.clone(), index);
        self.nodes.push(DependencyNode {
            id,
            priority,
            index,
        });
        self.after.push(Vec::new());
        true
    }

    /// Declare that `dependent` boots after `dependency`.
    ///
    /// Ignored when `dependent` is not a node.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        if let Some(&i) = self.index.get(dependent) {
            if !self.after[i].iter().any(|d| d == dependency) {
                self.after[i].push(dependency.to_string());
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges the sort will honor.
    pub fn edge_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| {
                self.after[node.index]
                    .iter()
                    .filter(|dep| self.resolves(node, dep))
                    .count()
            })
            .sum()
    }

    /// Declared dependencies of a node, including ignored ones.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.index
            .get(id)
            .map(|&i| self.after[i].iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    fn resolves(&self, node: &DependencyNode, dependency: &str) -> bool {
        dependency != node.id && self.index.contains_key(dependency)
    }

    /// Pre-sorted node indices: priority ascending, then discovery order.
    fn presorted(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by_key(|&i| (self.nodes[i].priority, i));
        order
    }

    /// Sort all nodes so that every honored dependency precedes its
    /// dependent, falling back to the pre-sorted order on a cycle.
    pub fn topological_sort(&self) -> BootOrder {
        let presorted = self.presorted();
        let mut rank = vec![0usize; self.nodes.len()];
        for (position, &i) in presorted.iter().enumerate() {
            rank[i] = position;
        }

        // dependency -> dependents
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        let mut in_degree = vec![0usize; self.nodes.len()];
        for node in &self.nodes {
            for dependency in &self.after[node.index] {
                if !self.resolves(node, dependency) {
                    continue;
                }
                let d = self.index[dependency.as_str()];
                dependents[d].push(node.index);
                in_degree[node.index] += 1;
            }
        }
        for list in &mut dependents {
            list.sort_by_key(|&i| rank[i]);
        }

        let mut queue: VecDeque<usize> = presorted
            .iter()
            .copied()
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut result = Vec::with_capacity(self.nodes.len());

        while let Some(current) = queue.pop_front() {
            result.push(current);
            for &dependent in &dependents[current] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if result.len() == self.nodes.len() {
            return BootOrder {
                ids: result.into_iter().map(|i| self.nodes[i].id.clone()).collect(),
                cycle: None,
            };
        }

        let participants: Vec<String> = presorted
            .iter()
            .filter(|&&i| in_degree[i] > 0)
            .map(|&i| self.nodes[i].id.clone())
            .collect();
        tracing::warn!(
            participants = ?participants,
            "dependency cycle among providers, falling back to priority order"
        );
        BootOrder {
            ids: presorted.iter().map(|&i| self.nodes[i].id.clone()).collect(),
            cycle: Some(participants),
        }
    }
}
