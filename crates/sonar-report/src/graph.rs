//! Repository dependency graph, statistics and Mermaid rendering.

use serde::Serialize;
use sonar_core::{AnalysisState, CycleDetector, DependencyKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};

/// One directed dependency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: DependencyKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStatistics {
    pub total_repositories: usize,
    pub repositories_with_dependencies: usize,
    pub total_dependencies: usize,
    /// Most incoming edges, ties broken by name
    pub most_depended_upon: Option<String>,
    /// Most outgoing edges, ties broken by name
    pub most_dependent: Option<String>,
    /// Edges per repository that has any
    pub average_dependencies: f64,
}

/// The dependency graph over all recorded edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyGraph {
    /// Repositories with at least one edge, sorted
    pub nodes: Vec<String>,
    /// In recording order
    pub edges: Vec<GraphEdge>,
    pub statistics: GraphStatistics,
    pub cycles: Vec<Vec<String>>,
    /// Known repositories without any edge, sorted
    pub isolated_repositories: Vec<String>,
}

impl DependencyGraph {
    /// Build the graph. Evidence is copied onto edges only when asked for.
    pub fn build(state: &AnalysisState, include_evidence: bool) -> Self {
        let edges: Vec<GraphEdge> = state
            .dependency_records
            .iter()
            .map(|d| GraphEdge {
                source: d.source_repo.clone(),
                target: d.target_repo.clone(),
                kind: d.kind,
                description: d.description.clone(),
                evidence: (include_evidence && !d.evidence.is_empty()).then(|| d.evidence.clone()),
            })
            .collect();

        let nodes: BTreeSet<String> = edges
            .iter()
            .flat_map(|e| [e.source.clone(), e.target.clone()])
            .collect();

        let isolated_repositories = state
            .repositories
            .keys()
            .filter(|name| !nodes.contains(*name))
            .cloned()
            .collect();

        let cycles = if edges.is_empty() {
            Vec::new()
        } else {
            CycleDetector::from_records(&state.dependency_records).find_cycles()
        };

        let statistics = GraphStatistics {
            total_repositories: state.repositories.len(),
            repositories_with_dependencies: nodes.len(),
            total_dependencies: edges.len(),
            most_depended_upon: busiest(edges.iter().map(|e| e.target.as_str())),
            most_dependent: busiest(edges.iter().map(|e| e.source.as_str())),
            average_dependencies: if nodes.is_empty() {
                0.0
            } else {
                edges.len() as f64 / nodes.len() as f64
            },
        };

        Self {
            nodes: nodes.into_iter().collect(),
            edges,
            statistics,
            cycles,
            isolated_repositories,
        }
    }

    /// Mermaid `graph TD` text. Node ids replace `-` with `_`.
    pub fn to_mermaid(&self) -> String {
        let edges = self.edges.iter().map(|edge| {
            format!(
                "    {} -->|{}| {}\n",
                mermaid_id(&edge.source),
                edge.kind,
                mermaid_id(&edge.target)
            )
        });
        std::iter::once("graph TD\n".to_string()).chain(edges).collect()
    }

    pub fn write_mermaid<W: Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(out, "graph TD")?;
        for edge in &self.edges {
            writeln!(
                out,
                "    {} -->|{}| {}",
                mermaid_id(&edge.source),
                edge.kind,
                mermaid_id(&edge.target)
            )?;
        }
        Ok(())
    }
}

fn mermaid_id(name: &str) -> String {
    name.replace('-', "_")
}

/// Name occurring most often, ties broken by name ascending.
fn busiest<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in names {
        *counts.entry(name).or_insert(0) += 1;
    }
    // max_by_key returns the last maximum; iterate in reverse for the first name
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(name, _)| name.to_string())
}
