//! Structured views over the state: component summaries and repository details.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sonar_core::{
    AnalysisState, DependencyRecord, RepositoryRecord, RepositoryType, SizeCategory,
    ValidationReport,
};
use std::collections::{BTreeMap, BTreeSet};

/// Coverage above which the summary suggests producing the final report.
const REPORT_READY_COVERAGE: f64 = 95.0;

/// Aggregated technology of a component's members.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TechnologySummary {
    /// Extension counts summed over members, highest first, ties by key
    pub primary_file_types: Vec<(String, u64)>,
    pub frameworks: Vec<String>,
    pub primary_technologies: Vec<String>,
    pub file_type_diversity: usize,
    pub framework_count: usize,
}

impl TechnologySummary {
    pub fn for_repositories<'a>(records: impl IntoIterator<Item = &'a RepositoryRecord>) -> Self {
        let mut file_types: BTreeMap<String, u64> = BTreeMap::new();
        let mut frameworks = BTreeSet::new();
        let mut technologies = BTreeSet::new();

        for record in records {
            for (ext, count) in &record.file_extension_counts {
                *file_types.entry(ext.clone()).or_insert(0) += count;
            }
            frameworks.extend(record.detected_frameworks.iter().cloned());
            if let Some(tech) = record.primary_technology() {
                technologies.insert(tech.to_string());
            }
        }

        let mut primary_file_types: Vec<(String, u64)> = file_types.into_iter().collect();
        primary_file_types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            file_type_diversity: primary_file_types.len(),
            framework_count: frameworks.len(),
            primary_file_types,
            frameworks: frameworks.into_iter().collect(),
            primary_technologies: technologies.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub name: String,
    pub purpose: String,
    pub rationale: String,
    pub repository_count: usize,
    pub repositories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub standalone: bool,
    pub size_category: SizeCategory,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub technology: TechnologySummary,
}

/// Digest of the validation run embedded in a summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationDigest {
    pub assignment_coverage: f64,
    pub unassigned_repositories: Vec<String>,
    pub multi_assigned_repositories: BTreeMap<String, Vec<String>>,
    pub orphaned_components: Vec<String>,
    pub dependency_cycles: Vec<Vec<String>>,
    pub readiness_issues: Vec<String>,
}

/// Every component with its membership, technology and sizing verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentsSummary {
    pub total_components: usize,
    pub total_repositories: usize,
    pub components: Vec<ComponentSummary>,
    pub validation: ValidationDigest,
    pub suggestions: Vec<String>,
}

impl ComponentsSummary {
    pub fn build(state: &AnalysisState, validation: &ValidationReport) -> Self {
        let components: Vec<ComponentSummary> = state
            .components
            .values()
            .map(|component| {
                let assessment = validation.component(&component.name);
                let members = component
                    .repositories
                    .iter()
                    .filter_map(|name| state.repositories.get(name));

                ComponentSummary {
                    name: component.name.clone(),
                    purpose: component.purpose.clone(),
                    rationale: component.rationale.clone(),
                    repository_count: component.repositories.len(),
                    repositories: component.repositories.clone(),
                    created_at: component.created_at,
                    standalone: component.standalone,
                    size_category: assessment
                        .map(|a| a.size_category)
                        .unwrap_or(SizeCategory::Empty),
                    warnings: assessment.map(|a| a.warnings.clone()).unwrap_or_default(),
                    suggestions: assessment
                        .map(|a| a.suggestions.clone())
                        .unwrap_or_default(),
                    technology: TechnologySummary::for_repositories(members),
                }
            })
            .collect();

        let suggestions = component_suggestions(&components, validation);

        Self {
            total_components: components.len(),
            total_repositories: state.repositories.len(),
            components,
            validation: ValidationDigest {
                assignment_coverage: validation.assignment_coverage,
                unassigned_repositories: validation.unassigned_repositories.clone(),
                multi_assigned_repositories: validation.multi_assigned_repositories.clone(),
                orphaned_components: validation.orphaned_components.clone(),
                dependency_cycles: validation.dependency_cycles.clone(),
                readiness_issues: validation.readiness_issues.clone(),
            },
            suggestions,
        }
    }

    pub fn component(&self, name: &str) -> Option<&ComponentSummary> {
        self.components.iter().find(|c| c.name == name)
    }
}

fn component_suggestions(components: &[ComponentSummary], validation: &ValidationReport) -> Vec<String> {
    if components.is_empty() {
        return vec![
            "No components created yet".to_string(),
            "Create components that group repositories by business function or technology stack"
                .to_string(),
        ];
    }

    let mut suggestions = Vec::new();
    if !validation.unassigned_repositories.is_empty() {
        suggestions.push(format!(
            "Assign {} unassigned repositories to components",
            validation.unassigned_repositories.len()
        ));
    }

    let names_in = |category: SizeCategory| -> Vec<&str> {
        components
            .iter()
            .filter(|c| c.size_category == category)
            .map(|c| c.name.as_str())
            .collect()
    };
    let large = names_in(SizeCategory::TooLarge);
    if !large.is_empty() {
        suggestions.push(format!("Consider splitting large components: {}", large.join(", ")));
    }
    let small = names_in(SizeCategory::TooSmall);
    if !small.is_empty() {
        suggestions.push(format!(
            "Review small components for potential merging: {}",
            small.join(", ")
        ));
    }

    if validation.assignment_coverage >= REPORT_READY_COVERAGE {
        suggestions.push("Nearly all repositories are assigned; the discovery report is ready to generate".to_string());
    }
    suggestions
}

/// A repository record together with its dependency edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryDetails {
    pub record: RepositoryRecord,
    pub discovery_status: String,
    pub primary_technology: Option<String>,
    pub outgoing: Vec<DependencyRecord>,
    pub incoming: Vec<DependencyRecord>,
    /// Where to look next when investigating this repository
    pub suggestions: Vec<String>,
}

impl RepositoryDetails {
    /// `None` when the repository is unknown.
    pub fn build(state: &AnalysisState, name: &str) -> Option<Self> {
        let record = state.repositories.get(name)?;
        Some(Self {
            discovery_status: record.discovery_phase_status(),
            primary_technology: record.primary_technology().map(str::to_string),
            outgoing: state.outgoing_dependencies(name).into_iter().cloned().collect(),
            incoming: state.incoming_dependencies(name).into_iter().cloned().collect(),
            suggestions: investigation_suggestions(record),
            record: record.clone(),
        })
    }
}

/// Hints for a collaborator investigating a repository.
pub fn investigation_suggestions(record: &RepositoryRecord) -> Vec<String> {
    let mut suggestions = Vec::new();

    if record.has_readme {
        suggestions.push("Read the README to understand the stated purpose".to_string());
    } else {
        suggestions.push("Read any documentation files to understand the purpose".to_string());
    }

    if !record.config_files.is_empty() {
        let shown: Vec<&str> = record.config_files.iter().take(3).map(String::as_str).collect();
        suggestions.push(format!("Examine config files: {}", shown.join(", ")));
    }

    let counts = &record.file_extension_counts;
    if counts.contains_key(".py") {
        suggestions.push("Look for main.py, app.py or manage.py entry points".to_string());
    } else if counts.contains_key(".js") || counts.contains_key(".ts") {
        suggestions.push("Check package.json scripts and index or server entry points".to_string());
    } else if counts.contains_key(".java") {
        suggestions.push("Find the Application or Main class entry point".to_string());
    } else if counts.contains_key(".go") {
        suggestions.push("Look for main packages under cmd/".to_string());
    } else if counts.contains_key(".cs") {
        suggestions.push("Find Program.cs and the startup configuration".to_string());
    }

    if record.repository_type == RepositoryType::Unknown {
        suggestions.push("Explore the directory structure to understand the architecture".to_string());
    }

    suggestions
}
