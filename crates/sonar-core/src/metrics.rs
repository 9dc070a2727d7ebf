//! Progress metrics derived from the analysis state.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{AnalysisState, AnalysisStatus};

/// Snapshot of discovery progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressMetrics {
    pub total_repositories: usize,
    pub analyzed_repositories: usize,
    pub insight_enriched_repositories: usize,
    pub components_created: usize,
    /// `analyzed / total * 100`, 0 when there are no repositories.
    pub analysis_progress: f64,
    /// `insight_enriched / total * 100`, 0 when there are no repositories.
    pub investigation_progress: f64,
    /// Repositories with at least one component, as a percentage.
    pub assignment_coverage: f64,
    pub unassigned_repositories: Vec<String>,
    pub multi_assigned_repositories: BTreeMap<String, Vec<String>>,
}

impl ProgressMetrics {
    /// Compute metrics from the current state.
    pub fn compute(state: &AnalysisState) -> Self {
        let total = state.repositories.len();
        let analyzed = state
            .repositories
            .values()
            .filter(|r| r.analysis_status.is_analyzed())
            .count();
        let enriched = state
            .repositories
            .values()
            .filter(|r| r.analysis_status == AnalysisStatus::InsightEnriched)
            .count();
        let unassigned = state.unassigned_repositories();
        let assigned = total - unassigned.len();

        Self {
            total_repositories: total,
            analyzed_repositories: analyzed,
            insight_enriched_repositories: enriched,
            components_created: state.components.len(),
            analysis_progress: percentage(analyzed, total),
            investigation_progress: percentage(enriched, total),
            assignment_coverage: percentage(assigned, total),
            unassigned_repositories: unassigned,
            multi_assigned_repositories: state.multi_assigned_repositories(),
        }
    }
}

/// `part / whole * 100`, or 0 for an empty whole.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RepositoryRecord;

    #[test]
    fn test_empty_state() {
        let metrics = ProgressMetrics::compute(&AnalysisState::default());
        assert_eq!(metrics.total_repositories, 0);
        assert_eq!(metrics.analysis_progress, 0.0);
        assert_eq!(metrics.assignment_coverage, 0.0);
    }

    #[test]
    fn test_progress() {
        let mut state = AnalysisState::default();
        for (name, status) in [
            ("a", AnalysisStatus::Analyzed),
            ("b", AnalysisStatus::InsightEnriched),
            ("c", AnalysisStatus::Unanalyzed),
            ("d", AnalysisStatus::Error),
        ] {
            let mut record = RepositoryRecord::new(name, name);
            record.analysis_status = status;
            state.repositories.insert(name.into(), record);
        }
        state
            .repositories
            .get_mut("a")
            .unwrap()
            .assigned_components = vec!["x".into(), "y".into()];

        let metrics = ProgressMetrics::compute(&state);
        assert_eq!(metrics.analysis_progress, 50.0);
        assert_eq!(metrics.investigation_progress, 25.0);
        assert_eq!(metrics.assignment_coverage, 25.0);
        assert_eq!(metrics.unassigned_repositories, vec!["b", "c", "d"]);
        assert_eq!(metrics.multi_assigned_repositories["a"], vec!["x", "y"]);
    }
}
