//! Property tests for coverage arithmetic and assignment bookkeeping.

use proptest::prelude::*;
use sonar_core::{AnalysisState, RepositoryRecord, ValidationEngine};

fn state_with(assigned: &[bool]) -> AnalysisState {
    let mut state = AnalysisState::default();
    for (i, is_assigned) in assigned.iter().enumerate() {
        let name = format!("repo-{i:03}");
        let mut record = RepositoryRecord::new(&name, &name);
        if *is_assigned {
            record.assigned_components.push("core".to_string());
        }
        state.repositories.insert(name, record);
    }
    state
}

proptest! {
    #[test]
    fn coverage_matches_assigned_fraction(assigned in prop::collection::vec(any::<bool>(), 1..200)) {
        let state = state_with(&assigned);
        let report = ValidationEngine::default().validate(&state);

        let n = assigned.len();
        let k = assigned.iter().filter(|a| **a).count();

        prop_assert_eq!(report.assigned_repositories, k);
        prop_assert_eq!(report.assignment_coverage, k as f64 / n as f64 * 100.0);
        prop_assert_eq!(report.unassigned_repositories.len(), n - k);
    }
}

#[test]
fn empty_state_has_zero_coverage() {
    let report = ValidationEngine::default().validate(&AnalysisState::default());
    assert_eq!(report.total_repositories, 0);
    assert_eq!(report.assignment_coverage, 0.0);
    assert!(!report.is_ready());
}
