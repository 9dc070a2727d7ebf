//! Coverage, sizing and consistency diagnostics over the analysis state.
//!
//! Everything reported here is advisory. Validation never mutates state and
//! never fails; collaborators decide what to do with the findings.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::cycles::CycleDetector;
use crate::metrics::{percentage, ProgressMetrics};
use crate::types::{AnalysisState, AnalysisStatus, ComponentRecord};

/// Analysis progress below this percentage is a readiness issue.
pub const READY_ANALYSIS_PROGRESS: f64 = 90.0;

/// Thresholds used to classify component sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Smallest appropriate component
    #[serde(default = "default_min_appropriate")]
    pub min_appropriate: usize,

    /// Largest appropriate component
    #[serde(default = "default_max_appropriate")]
    pub max_appropriate: usize,

    /// Components above this size are too large
    #[serde(default = "default_too_large_threshold")]
    pub too_large_threshold: usize,

    /// Components spanning more primary technologies than this are too large
    #[serde(default = "default_max_primary_technologies")]
    pub max_primary_technologies: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_appropriate: default_min_appropriate(),
            max_appropriate: default_max_appropriate(),
            too_large_threshold: default_too_large_threshold(),
            max_primary_technologies: default_max_primary_technologies(),
        }
    }
}

fn default_min_appropriate() -> usize {
    3
}

fn default_max_appropriate() -> usize {
    15
}

fn default_too_large_threshold() -> usize {
    30
}

fn default_max_primary_technologies() -> usize {
    4
}

/// Size classification of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    /// No repositories assigned
    Empty,
    /// Below the appropriate range
    TooSmall,
    /// Within the appropriate range
    Appropriate,
    /// Above the appropriate range but not yet too large
    Large,
    /// Too many repositories or technologies
    TooLarge,
}

impl SizeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::Empty => "empty",
            SizeCategory::TooSmall => "too_small",
            SizeCategory::Appropriate => "appropriate",
            SizeCategory::Large => "large",
            SizeCategory::TooLarge => "too_large",
        }
    }
}

impl std::fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sizing verdict for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentAssessment {
    pub name: String,
    pub repository_count: usize,
    pub size_category: SizeCategory,
    /// Distinct primary technologies of the members, sorted.
    pub primary_technologies: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Result of [`ValidationEngine::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_repositories: usize,
    pub assigned_repositories: usize,
    /// `assigned / total * 100`.
    pub assignment_coverage: f64,
    pub analysis_progress: f64,
    pub unassigned_repositories: Vec<String>,
    /// Repository name to its components, for repositories in more than one.
    pub multi_assigned_repositories: BTreeMap<String, Vec<String>>,
    /// Components with no repositories.
    pub orphaned_components: Vec<String>,
    /// Repositories whose scan failed.
    pub failed_repositories: Vec<String>,
    pub components: Vec<ComponentAssessment>,
    /// Each cycle is an ordered list of repository names.
    pub dependency_cycles: Vec<Vec<String>>,
    /// Dependency records naming repositories that are not in the state.
    pub dangling_dependencies: Vec<String>,
    pub readiness_issues: Vec<String>,
}

impl ValidationReport {
    /// No readiness issues were found.
    pub fn is_ready(&self) -> bool {
        self.readiness_issues.is_empty()
    }

    /// Assessment for a component by name.
    pub fn component(&self, name: &str) -> Option<&ComponentAssessment> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// Computes a [`ValidationReport`] from an [`AnalysisState`].
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    policy: ValidationPolicy,
}

impl ValidationEngine {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate(&self, state: &AnalysisState) -> ValidationReport {
        let metrics = ProgressMetrics::compute(state);
        let total = metrics.total_repositories;
        let assigned = total - metrics.unassigned_repositories.len();

        let components: Vec<ComponentAssessment> = state
            .components
            .values()
            .map(|component| self.assess_component(state, component))
            .collect();

        let orphaned_components: Vec<String> = components
            .iter()
            .filter(|c| c.size_category == SizeCategory::Empty)
            .map(|c| c.name.clone())
            .collect();

        let failed_repositories: Vec<String> = state
            .repositories
            .values()
            .filter(|r| r.analysis_status == AnalysisStatus::Error)
            .map(|r| r.name.clone())
            .collect();

        let dependency_cycles = if state.dependency_records.is_empty() {
            Vec::new()
        } else {
            CycleDetector::from_records(&state.dependency_records).find_cycles()
        };

        let dangling_dependencies: Vec<String> = state
            .dependency_records
            .iter()
            .flat_map(|d| [&d.source_repo, &d.target_repo])
            .filter(|name| !state.repositories.contains_key(name.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut report = ValidationReport {
            total_repositories: total,
            assigned_repositories: assigned,
            assignment_coverage: percentage(assigned, total),
            analysis_progress: metrics.analysis_progress,
            unassigned_repositories: metrics.unassigned_repositories,
            multi_assigned_repositories: metrics.multi_assigned_repositories,
            orphaned_components,
            failed_repositories,
            components,
            dependency_cycles,
            dangling_dependencies,
            readiness_issues: Vec::new(),
        };
        report.readiness_issues = readiness_issues(&report);
        report
    }

    /// Classify one component.
    pub fn assess_component(
        &self,
        state: &AnalysisState,
        component: &ComponentRecord,
    ) -> ComponentAssessment {
        let count = component.repositories.len();
        let technologies: Vec<String> = component
            .repositories
            .iter()
            .filter_map(|name| state.repositories.get(name))
            .filter_map(|repo| repo.primary_technology())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let policy = &self.policy;
        let mut warnings = Vec::new();
        let mut suggestions = Vec::new();

        let too_many_technologies = technologies.len() > policy.max_primary_technologies;
        let size_category = if count == 0 {
            warnings.push("Component has no repositories assigned".to_string());
            suggestions.push("Assign repositories or remove the component".to_string());
            SizeCategory::Empty
        } else if count > policy.too_large_threshold || too_many_technologies {
            if count > policy.too_large_threshold {
                warnings.push(format!(
                    "Component has {count} repositories (more than {})",
                    policy.too_large_threshold
                ));
            }
            if too_many_technologies {
                warnings.push(format!(
                    "Component spans {} primary technologies (more than {})",
                    technologies.len(),
                    policy.max_primary_technologies
                ));
            }
            suggestions.push("Consider splitting into smaller, more focused components".to_string());
            SizeCategory::TooLarge
        } else if count == 1 && component.standalone {
            SizeCategory::Appropriate
        } else if count < policy.min_appropriate {
            if count == 1 {
                warnings.push("Component contains a single repository".to_string());
                suggestions.push(
                    "Merge with a related component or mark it standalone".to_string(),
                );
            } else {
                warnings.push(format!(
                    "Component has only {count} repositories (fewer than {})",
                    policy.min_appropriate
                ));
                suggestions.push("Consider merging with a related component".to_string());
            }
            SizeCategory::TooSmall
        } else if count > policy.max_appropriate {
            warnings.push(format!(
                "Component has {count} repositories (more than {})",
                policy.max_appropriate
            ));
            suggestions.push("Review whether the component has a single purpose".to_string());
            SizeCategory::Large
        } else {
            SizeCategory::Appropriate
        };

        ComponentAssessment {
            name: component.name.clone(),
            repository_count: count,
            size_category,
            primary_technologies: technologies,
            warnings,
            suggestions,
        }
    }
}

fn readiness_issues(report: &ValidationReport) -> Vec<String> {
    let mut issues = Vec::new();

    if report.total_repositories == 0 {
        issues.push("No repositories have been discovered".to_string());
        return issues;
    }
    if report.analysis_progress < READY_ANALYSIS_PROGRESS {
        issues.push(format!(
            "Analysis incomplete: {:.1}% of repositories analyzed",
            report.analysis_progress
        ));
    }
    if !report.unassigned_repositories.is_empty() {
        issues.push(format!(
            "{} repositories are not assigned to any component",
            report.unassigned_repositories.len()
        ));
    }
    if !report.orphaned_components.is_empty() {
        issues.push(format!(
            "{} components have no repositories",
            report.orphaned_components.len()
        ));
    }
    if !report.failed_repositories.is_empty() {
        issues.push(format!(
            "{} repositories failed analysis",
            report.failed_repositories.len()
        ));
    }
    if !report.dependency_cycles.is_empty() {
        issues.push(format!(
            "{} circular dependencies detected",
            report.dependency_cycles.len()
        ));
    }

    issues
}
