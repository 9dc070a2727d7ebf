//! Sonar Report - read-only views over the discovery state.
//!
//! - [`ReportGenerator`]: the markdown discovery report and the deep-analysis report
//! - [`ComponentsSummary`] / [`RepositoryDetails`]: structured views for JSON output
//! - [`DependencyGraph`]: edges, statistics, cycles and Mermaid text
//!
//! Nothing here reads the clock or the filesystem; the same state always
//! renders the same bytes.

pub mod graph;
mod markdown;
pub mod summary;

pub use graph::{DependencyGraph, GraphEdge, GraphStatistics};
pub use markdown::{thousands, DeepReportOptions, ReportGenerator};
pub use summary::{
    investigation_suggestions, ComponentSummary, ComponentsSummary, RepositoryDetails,
    TechnologySummary, ValidationDigest,
};

/// Errors raised while building reports.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("unknown repositories: {}", .0.join(", "))]
    UnknownRepositories(Vec<String>),

    #[error("failed to render report")]
    Format(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
