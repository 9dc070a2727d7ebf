//! Dependency cycle detection using depth-first search with three-colour marking.
//!
//! Each node is white (unvisited), gray (on the current DFS path) or black
//! (fully explored). An edge into a gray node closes a cycle; black nodes are
//! never re-entered, so the walk is O(V + E). The DFS keeps an explicit stack
//! and does not recurse, so graph depth is bounded only by memory.

use std::collections::{btree_set, BTreeMap, BTreeSet, HashMap};

use crate::types::DependencyRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Directed graph over repository names.
#[derive(Debug, Clone, Default)]
pub struct CycleDetector {
    graph: BTreeMap<String, BTreeSet<String>>,
}

impl CycleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from `source_repo -> target_repo` records.
    pub fn from_records(records: &[DependencyRecord]) -> Self {
        let mut detector = Self::new();
        for record in records {
            detector.add_edge(&record.source_repo, &record.target_repo);
        }
        detector
    }

    /// Add a directed edge. Both endpoints become nodes.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.graph
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.graph.entry(to.to_string()).or_default();
    }

    pub fn node_count(&self) -> usize {
        self.graph.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.values().map(BTreeSet::len).sum()
    }

    /// Finds every distinct cycle closed by a back edge.
    ///
    /// # Returns
    /// Cycles as ordered name lists, each rotated to start at its smallest
    /// name, deduplicated and sorted.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut colors: HashMap<&str, Color> = self
            .graph
            .keys()
            .map(|k| (k.as_str(), Color::White))
            .collect();
        let mut cycles: BTreeSet<Vec<String>> = BTreeSet::new();

        for root in self.graph.keys() {
            let root = root.as_str();
            if colors.get(root) != Some(&Color::White) {
                continue;
            }

            // Path of gray nodes with their remaining neighbours.
            let mut stack: Vec<(&str, btree_set::Iter<'_, String>)> = Vec::new();
            let mut position: HashMap<&str, usize> = HashMap::new();

            colors.insert(root, Color::Gray);
            position.insert(root, 0);
            stack.push((root, self.neighbors(root)));

            while let Some((node, neighbors)) = stack.last_mut() {
                let node = *node;
                match neighbors.next() {
                    Some(next) => {
                        let next = next.as_str();
                        match colors.get(next).copied().unwrap_or(Color::White) {
                            Color::White => {
                                colors.insert(next, Color::Gray);
                                position.insert(next, stack.len());
                                stack.push((next, self.neighbors(next)));
                            }
                            Color::Gray => {
                                if let Some(&start) = position.get(next) {
                                    let cycle: Vec<String> = stack[start..]
                                        .iter()
                                        .map(|(name, _)| (*name).to_string())
                                        .collect();
                                    cycles.insert(canonicalize(cycle));
                                }
                            }
                            Color::Black => {}
                        }
                    }
                    None => {
                        colors.insert(node, Color::Black);
                        position.remove(node);
                        stack.pop();
                    }
                }
            }
        }

        cycles.into_iter().collect()
    }

    fn neighbors(&self, node: &str) -> btree_set::Iter<'_, String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        self.graph.get(node).unwrap_or(&EMPTY).iter()
    }
}

/// Rotate so the smallest name comes first.
fn canonicalize(mut cycle: Vec<String>) -> Vec<String> {
    if let Some(min_index) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    {
        cycle.rotate_left(min_index);
    }
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_graph(edges: Vec<(&str, Vec<&str>)>) -> CycleDetector {
        let mut detector = CycleDetector::new();
        for (from, tos) in edges {
            for to in tos {
                detector.add_edge(from, to);
            }
        }
        detector
    }

    #[test]
    fn test_simple_cycle() {
        let detector = create_graph(vec![("A", vec!["B"]), ("B", vec!["C"]), ("C", vec!["A"])]);

        let cycles = detector.find_cycles();
        assert_eq!(cycles, vec![vec!["A", "B", "C"]]);
    }

    #[test]
    fn test_cycle_reported_from_smallest_name() {
        let detector = create_graph(vec![("svc-c", vec!["svc-a"]), ("svc-a", vec!["svc-b"]), ("svc-b", vec!["svc-c"])]);
        assert_eq!(detector.find_cycles(), vec![vec!["svc-a", "svc-b", "svc-c"]]);
    }

    #[test]
    fn test_no_cycles() {
        let detector = create_graph(vec![
            ("A", vec!["B", "C"]),
            ("B", vec!["D"]),
            ("C", vec!["D"]),
        ]);
        assert!(detector.find_cycles().is_empty());
    }

    #[test]
    fn test_multiple_cycles() {
        let detector = create_graph(vec![
            ("A", vec!["B"]),
            ("B", vec!["A"]),
            ("C", vec!["D"]),
            ("D", vec!["E"]),
            ("E", vec!["C"]),
        ]);

        let cycles = detector.find_cycles();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], vec!["A", "B"]);
        assert_eq!(cycles[1], vec!["C", "D", "E"]);
    }

    #[test]
    fn test_self_loop() {
        let detector = create_graph(vec![("A", vec!["A"])]);
        assert_eq!(detector.find_cycles(), vec![vec!["A"]]);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let mut detector = CycleDetector::new();
        let names: Vec<String> = (0..200_000).map(|i| format!("n{i:06}")).collect();
        for pair in names.windows(2) {
            detector.add_edge(&pair[0], &pair[1]);
        }
        assert!(detector.find_cycles().is_empty());

        detector.add_edge(&names[names.len() - 1], &names[0]);
        let cycles = detector.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), names.len());
    }

    #[test]
    fn test_counts() {
        let detector = create_graph(vec![("A", vec!["B", "C"]), ("B", vec!["C"])]);
        assert_eq!(detector.node_count(), 3);
        assert_eq!(detector.edge_count(), 3);
    }
}
