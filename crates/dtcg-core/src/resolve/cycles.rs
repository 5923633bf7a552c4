//! Circular reference detection
//!
//! Depth-first search with an explicit recursion stack. Revisiting a node
//! that is still on the stack closes a cycle: the stack slice from that
//! node's first occurrence to the current node.

use crate::ast::TokenAst;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Directed graph of resolved reference edges.
///
/// Nodes are kept sorted so traversal order, and therefore the reported
/// cycles, do not depend on insertion order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph of the valid, internal edges of one document.
    pub fn from_ast(ast: &TokenAst) -> Self {
        let mut graph = Self::new();
        for edge in &ast.references {
            if edge.valid
                && !edge.external
                && let Some(target) = &edge.resolved_path
            {
                graph.add_edge(&edge.from, target);
            }
        }
        graph
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.edges.entry(to.to_string()).or_default();
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Find every cycle reachable in the graph.
    pub fn find_cycles(&self) -> Vec<Cycle> {
        let mut search = Search {
            graph: self,
            visited: HashSet::new(),
            on_stack: HashSet::new(),
            stack: Vec::new(),
            cycles: Vec::new(),
        };
        for node in self.edges.keys() {
            if !search.visited.contains(node.as_str()) {
                search.visit(node);
            }
        }
        search.cycles
    }
}

struct Search<'a> {
    graph: &'a ReferenceGraph,
    visited: HashSet<&'a str>,
    on_stack: HashSet<&'a str>,
    stack: Vec<&'a str>,
    cycles: Vec<Cycle>,
}

impl<'a> Search<'a> {
    fn visit(&mut self, node: &'a str) {
        let graph = self.graph;
        self.visited.insert(node);
        self.on_stack.insert(node);
        self.stack.push(node);

        if let Some(targets) = graph.edges.get(node) {
            for target in targets {
                let target = target.as_str();
                if self.on_stack.contains(target) {
                    if let Some(start) = self.stack.iter().position(|n| *n == target) {
                        self.cycles.push(Cycle {
                            nodes: self.stack[start..].iter().map(|n| n.to_string()).collect(),
                        });
                    }
                } else if !self.visited.contains(target) {
                    self.visit(target);
                }
            }
        }

        self.stack.pop();
        self.on_stack.remove(node);
    }
}

/// A closed reference chain, listed from its first node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub nodes: Vec<String>,
}

impl Cycle {
    pub fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    /// Consecutive `(from, to)` pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        let len = self.nodes.len();
        (0..len).map(move |i| (self.nodes[i].as_str(), self.nodes[(i + 1) % len].as_str()))
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{node} -> ")?;
        }
        match self.nodes.first() {
            Some(first) => write!(f, "{first}"),
            None => Ok(()),
        }
    }
}

/// Detect reference cycles in one document.
///
/// Every token on a cycle is invalidated with the rendered cycle and every
/// edge on it is marked circular.
pub fn detect_cycles(ast: &mut TokenAst) -> Vec<Cycle> {
    let cycles = ReferenceGraph::from_ast(ast).find_cycles();

    for cycle in &cycles {
        let message = format!("circular reference: {cycle}");
        for node in &cycle.nodes {
            if let Some(token) = ast.token_mut(node) {
                token.invalidate(message.clone());
                token.reference_depth = -1;
            }
        }
        for (from, to) in cycle.edges() {
            if let Some(edge) = ast.reference_from_mut(from)
                && edge.resolved_path.as_deref() == Some(to)
            {
                edge.circular = true;
            }
        }
        tracing::debug!(file = %ast.file, %cycle, "Found reference cycle");
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build_ast;
    use crate::resolve::resolver::resolve_references;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn three_node_cycle_is_reported_once() {
        let mut ast = build_ast(
            "tokens.json",
            &json!({
                "a": {"$value": "{b}"},
                "b": {"$value": "{c}"},
                "c": {"$value": "{a}"},
                "d": {"$value": "{a}"}
            }),
        );
        resolve_references(&mut ast);
        let cycles = detect_cycles(&mut ast);

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["a", "b", "c"]);
        assert_eq!(cycles[0].to_string(), "a -> b -> c -> a");
        for path in ["a", "b", "c"] {
            let token = ast.token(path).unwrap();
            assert!(!token.valid, "{path} should be invalid");
            assert!(ast.reference_from(path).unwrap().circular);
        }
        assert!(ast.token("d").unwrap().valid);
        assert!(!ast.reference_from("d").unwrap().circular);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut ast = build_ast("tokens.json", &json!({"a": {"$value": "{a}"}}));
        resolve_references(&mut ast);
        let cycles = detect_cycles(&mut ast);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].to_string(), "a -> a");
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let mut graph = ReferenceGraph::new();
        graph.add_edge("c", "b");
        graph.add_edge("b", "a");
        graph.add_edge("d", "a");
        assert!(graph.find_cycles().is_empty());
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn disjoint_cycles_are_all_found() {
        let mut graph = ReferenceGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");
        graph.add_edge("x", "y");
        graph.add_edge("y", "x");
        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 2);
        assert!(cycles[1].contains("y"));
    }
}
