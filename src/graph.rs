//! Named dependency graphs.
//!
//! Used for the ordering between stacks and for `DependsOn` edges between
//! resources inside one template. An edge `a -> b` means `b` depends on `a`.

use crate::error::{Error, Result};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// A directed graph of named nodes
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning the existing index if the name is known
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_indices.insert(name.to_string(), idx);
        idx
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// Record that `dependent` depends on `dependency`; both must exist
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        let from = *self
            .node_indices
            .get(dependency)
            .ok_or_else(|| Error::StackNotFound(dependency.to_string()))?;
        let to = *self
            .node_indices
            .get(dependent)
            .ok_or_else(|| Error::StackNotFound(dependent.to_string()))?;
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
        Ok(())
    }

    /// Strongly connected groups of more than one node, plus self-loops
    pub fn cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || scc.iter().any(|&idx| self.graph.find_edge(idx, idx).is_some())
            })
            .map(|scc| {
                let mut names: Vec<String> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                names.sort();
                names
            })
            .collect()
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles().is_empty()
    }

    /// Topological order; among ready nodes, insertion order wins
    pub fn order(&self) -> Result<Vec<String>> {
        if let Err(cycle) = toposort(&self.graph, None) {
            let name = self
                .graph
                .node_weight(cycle.node_id())
                .cloned()
                .unwrap_or_default();
            return Err(Error::DependencyCycle(name));
        }

        let mut remaining: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let incoming = self.graph.neighbors_directed(idx, Direction::Incoming).count();
                (idx, incoming)
            })
            .collect();
        let mut ready: BTreeSet<NodeIndex> = remaining
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&idx, _)| idx)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(idx) = ready.pop_first() {
            if let Some(name) = self.graph.node_weight(idx) {
                order.push(name.clone());
            }
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                if let Some(count) = remaining.get_mut(&edge.target()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(edge.target());
                    }
                }
            }
        }
        Ok(order)
    }

    /// Everything `name` depends on, directly or transitively
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::new();
        if let Some(&start) = self.node_indices.get(name) {
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors_directed(current, Direction::Incoming) {
                    if let Some(node) = self.graph.node_weight(neighbor) {
                        if found.insert(node.clone()) {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }
        }
        found.into_iter().collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// DOT rendering, dependencies pointing at dependents
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph stacks {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box];\n\n");

        for idx in self.graph.node_indices() {
            if let Some(name) = self.graph.node_weight(idx) {
                output.push_str(&format!("  \"{}\";\n", name));
            }
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = self
                .graph
                .node_weight(edge.source())
                .map(String::as_str)
                .unwrap_or("?");
            let target = self
                .graph
                .node_weight(edge.target())
                .map(String::as_str)
                .unwrap_or("?");
            output.push_str(&format!("  \"{}\" -> \"{}\";\n", source, target));
        }

        output.push_str("}\n");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for n in nodes {
            g.add_node(n);
        }
        for (dependent, dependency) in edges {
            g.add_dependency(dependent, dependency).unwrap();
        }
        g
    }

    #[test]
    fn test_order_keeps_insertion_order_when_free() {
        let g = graph(&["c", "a", "b"], &[]);
        assert_eq!(g.order().unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_order_respects_dependencies() {
        let g = graph(&["pipeline", "storage", "other"], &[("pipeline", "storage")]);
        assert_eq!(g.order().unwrap(), vec!["storage", "other", "pipeline"]);
    }

    #[test]
    fn test_cycle_is_error() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "a")]);
        assert!(g.has_cycles());
        assert_eq!(g.cycles(), vec![vec!["a".to_string(), "b".to_string()]]);
        assert!(matches!(g.order(), Err(Error::DependencyCycle(_))));
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let g = graph(&["a"], &[("a", "a")]);
        assert!(g.has_cycles());
    }

    #[test]
    fn test_transitive_dependencies() {
        let g = graph(&["a", "b", "c"], &[("c", "b"), ("b", "a")]);
        assert_eq!(g.dependencies("c"), vec!["a", "b"]);
        assert!(g.dependencies("a").is_empty());
    }

    #[test]
    fn test_unknown_node() {
        let mut g = graph(&["a"], &[]);
        assert!(g.add_dependency("a", "missing").is_err());
    }

    #[test]
    fn test_to_dot() {
        let g = graph(&["a", "b"], &[("b", "a")]);
        let dot = g.to_dot();
        assert!(dot.contains("\"a\" -> \"b\";"));
    }
}
