//! Reference-graph cycle detection.
//!
//! References form a directed graph over `(subject, version)` nodes. The
//! registry builds the edge set while resolving a registration's references
//! and rejects the schema if the graph contains a cycle.

use std::collections::HashMap;

use super::ParseError;

/// One node of the reference graph.
pub type RefNode = (String, u32);

#[derive(Debug, Default)]
pub struct ReferenceGraph {
    edges: HashMap<RefNode, Vec<RefNode>>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, from: RefNode, to: RefNode) {
        self.edges.entry(from.clone()).or_default().push(to);
        self.edges.entry(from).or_default();
    }

    /// Depth-first search with a gray set; returns the first node found on a
    /// cycle, in deterministic order.
    pub fn find_cycle(&self) -> Option<&RefNode> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors: HashMap<&RefNode, Color> =
            self.edges.keys().map(|node| (node, Color::White)).collect();

        let mut roots: Vec<&RefNode> = self.edges.keys().collect();
        roots.sort();

        for root in roots {
            if colors[root] != Color::White {
                continue;
            }
            // Iterative DFS; the stack holds (node, next edge index).
            let mut stack: Vec<(&RefNode, usize)> = vec![(root, 0)];
            colors.insert(root, Color::Gray);

            while let Some((node, edge)) = stack.pop() {
                let targets = &self.edges[node];
                if edge >= targets.len() {
                    colors.insert(node, Color::Black);
                    continue;
                }
                stack.push((node, edge + 1));

                let target = &targets[edge];
                match colors.get(target).copied().unwrap_or(Color::White) {
                    Color::Gray => return Some(target),
                    Color::White => {
                        colors.insert(target, Color::Gray);
                        stack.push((target, 0));
                    }
                    Color::Black => {}
                }
            }
        }

        None
    }

    /// Error if the graph is cyclic.
    pub fn ensure_acyclic(&self) -> Result<(), ParseError> {
        match self.find_cycle() {
            Some((subject, version)) => Err(ParseError::CyclicReference {
                subject: subject.clone(),
                version: *version,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(subject: &str, version: u32) -> RefNode {
        (subject.to_string(), version)
    }

    #[test]
    fn acyclic_graph_passes() {
        let mut graph = ReferenceGraph::new();
        graph.add_edge(node("book", 1), node("author", 1));
        graph.add_edge(node("book", 1), node("publisher", 2));
        graph.add_edge(node("publisher", 2), node("author", 1));
        assert!(graph.ensure_acyclic().is_ok());
    }

    #[test]
    fn direct_cycle_is_detected() {
        let mut graph = ReferenceGraph::new();
        graph.add_edge(node("a", 1), node("b", 1));
        graph.add_edge(node("b", 1), node("a", 1));
        assert!(graph.ensure_acyclic().is_err());
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut graph = ReferenceGraph::new();
        graph.add_edge(node("a", 1), node("a", 1));
        assert!(graph.ensure_acyclic().is_err());
    }

    #[test]
    fn long_cycle_is_detected() {
        let mut graph = ReferenceGraph::new();
        graph.add_edge(node("a", 1), node("b", 1));
        graph.add_edge(node("b", 1), node("c", 1));
        graph.add_edge(node("c", 1), node("d", 1));
        graph.add_edge(node("d", 1), node("b", 1));
        assert!(graph.ensure_acyclic().is_err());
    }

    #[test]
    fn distinct_versions_are_distinct_nodes() {
        let mut graph = ReferenceGraph::new();
        graph.add_edge(node("a", 2), node("a", 1));
        assert!(graph.ensure_acyclic().is_ok());
    }
}
