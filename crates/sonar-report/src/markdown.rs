//! Markdown report rendering.
//!
//! Output depends only on the inputs: no clock reads, and every collection is
//! walked in sorted order, so identical state renders byte-identical text.

use crate::graph::DependencyGraph;
use crate::{ReportError, Result};
use sonar_core::{
    percentage, AnalysisState, AnalysisStatus, ProgressMetrics, RepositoryRecord,
    SizeCategory, ValidationReport,
};
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Frameworks listed in the technology summary
const TOP_FRAMEWORKS: usize = 10;

/// File types shown per repository
const TOP_FILE_TYPES: usize = 5;

/// Options for [`ReportGenerator::deep_analysis_report`].
#[derive(Debug, Clone)]
pub struct DeepReportOptions {
    /// Include scan metadata for each repository
    pub include_scan_details: bool,
    /// Include per-repository edges and the dependency section
    pub include_dependencies: bool,
    /// Restrict to these repositories, in the given order
    pub repositories: Option<Vec<String>>,
}

impl Default for DeepReportOptions {
    fn default() -> Self {
        Self {
            include_scan_details: true,
            include_dependencies: true,
            repositories: None,
        }
    }
}

/// Renders discovery and deep-analysis reports.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    title: String,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            title: "Repository Discovery Report".to_string(),
        }
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    /// The full discovery report.
    pub fn generate(&self, state: &AnalysisState, validation: &ValidationReport) -> Result<String> {
        let mut out = String::new();
        self.write_report(&mut out, state, validation)?;
        Ok(out)
    }

    /// Write the discovery report to any formatter sink.
    pub fn write_report<W: Write>(
        &self,
        out: &mut W,
        state: &AnalysisState,
        validation: &ValidationReport,
    ) -> fmt::Result {
        let metrics = ProgressMetrics::compute(state);

        writeln!(out, "# {}\n", self.title)?;
        if let Some(base) = &state.metadata.base_repos_path {
            writeln!(out, "**Base Path:** `{}`", base.display())?;
        }
        if let Some(completed) = state.metadata.analysis_completed {
            writeln!(
                out,
                "**Analysis Completed:** {}",
                completed.format("%Y-%m-%d %H:%M:%S UTC")
            )?;
        }
        writeln!(out)?;

        self.executive_summary(out, &metrics)?;
        self.inventory(out, state)?;
        self.components(out, state, validation)?;
        self.technology_summary(out, state)?;
        self.assignment_validation(out, validation)?;
        self.recommendations(out, state, validation, &metrics)
    }

    fn executive_summary<W: Write>(&self, out: &mut W, metrics: &ProgressMetrics) -> fmt::Result {
        writeln!(out, "## Executive Summary\n")?;
        writeln!(out, "- **Total Repositories:** {}", metrics.total_repositories)?;
        writeln!(out, "- **Analysis Progress:** {:.1}%", metrics.analysis_progress)?;
        writeln!(
            out,
            "- **Investigation Progress:** {:.1}%",
            metrics.investigation_progress
        )?;
        writeln!(
            out,
            "- **Repositories with Insights:** {}",
            metrics.insight_enriched_repositories
        )?;
        writeln!(out, "- **Logical Components:** {}", metrics.components_created)?;
        writeln!(
            out,
            "- **Unassigned Repositories:** {}\n",
            metrics.unassigned_repositories.len()
        )
    }

    fn inventory<W: Write>(&self, out: &mut W, state: &AnalysisState) -> fmt::Result {
        writeln!(out, "## Repository Inventory\n")?;
        if state.repositories.is_empty() {
            return writeln!(out, "*No repositories discovered.*\n");
        }

        let mut complete = Vec::new();
        let mut needs_assignment = Vec::new();
        let mut needs_investigation = Vec::new();
        let mut failed = Vec::new();
        for repo in state.repositories.values() {
            match (
                repo.analysis_status == AnalysisStatus::Error,
                repo.has_insights(),
                repo.assigned_components.is_empty(),
            ) {
                (true, _, _) => failed.push(repo),
                (false, true, false) => complete.push(repo),
                (false, true, true) => needs_assignment.push(repo),
                (false, false, _) => needs_investigation.push(repo),
            }
        }

        for (title, repos) in [
            ("Complete (Insights and Components)", complete),
            ("Needs Component Assignment", needs_assignment),
            ("Needs Investigation", needs_investigation),
        ] {
            if repos.is_empty() {
                continue;
            }
            writeln!(out, "### {} ({})\n", title, repos.len())?;
            for repo in repos {
                repository_entry(out, repo)?;
            }
        }

        if !failed.is_empty() {
            writeln!(out, "### Scan Failures ({})\n", failed.len())?;
            for repo in failed {
                writeln!(
                    out,
                    "- **{}**: {}",
                    repo.name,
                    repo.error.as_deref().unwrap_or("unknown error")
                )?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn components<W: Write>(
        &self,
        out: &mut W,
        state: &AnalysisState,
        validation: &ValidationReport,
    ) -> fmt::Result {
        if state.components.is_empty() {
            return Ok(());
        }
        writeln!(out, "## Logical Components\n")?;

        for component in state.components.values() {
            let assessment = validation.component(&component.name);
            writeln!(out, "### {}\n", component.name)?;
            writeln!(out, "**Purpose:** {}\n", component.purpose)?;
            writeln!(out, "**Rationale:** {}\n", component.rationale)?;
            writeln!(
                out,
                "**Repositories ({}):** {}\n",
                component.repositories.len(),
                component.repositories.join(", ")
            )?;
            let category = assessment
                .map(|a| a.size_category)
                .unwrap_or(SizeCategory::Empty);
            let standalone = if component.standalone { " (standalone)" } else { "" };
            writeln!(
                out,
                "**Size Assessment:** {}{}\n",
                title_case(category.as_str()),
                standalone
            )?;

            if let Some(assessment) = assessment {
                if !assessment.primary_technologies.is_empty() {
                    writeln!(
                        out,
                        "**Primary Technologies:** {}\n",
                        assessment.primary_technologies.join(", ")
                    )?;
                }
                if !assessment.warnings.is_empty() {
                    writeln!(out, "**Warnings:**")?;
                    for warning in &assessment.warnings {
                        writeln!(out, "- {warning}")?;
                    }
                    writeln!(out)?;
                }
            }
        }
        Ok(())
    }

    fn technology_summary<W: Write>(&self, out: &mut W, state: &AnalysisState) -> fmt::Result {
        if state.repositories.is_empty() {
            return Ok(());
        }

        let mut frameworks: BTreeMap<&str, usize> = BTreeMap::new();
        let mut technologies: BTreeMap<&str, usize> = BTreeMap::new();
        let mut types: BTreeMap<&str, usize> = BTreeMap::new();
        for repo in state.repositories.values() {
            for framework in &repo.detected_frameworks {
                *frameworks.entry(framework.as_str()).or_insert(0) += 1;
            }
            if let Some(tech) = repo.primary_technology() {
                *technologies.entry(tech).or_insert(0) += 1;
            }
            if repo.analysis_status.is_analyzed() {
                *types.entry(repo.repository_type.as_str()).or_insert(0) += 1;
            }
        }

        writeln!(out, "## Technology Stack Summary\n")?;
        for (heading, counts, limit) in [
            ("Frameworks", frameworks, TOP_FRAMEWORKS),
            ("Primary Technologies", technologies, usize::MAX),
            ("Repository Types", types, usize::MAX),
        ] {
            if counts.is_empty() {
                continue;
            }
            writeln!(out, "**{heading}:**")?;
            for (name, count) in ranked(counts).into_iter().take(limit) {
                writeln!(out, "- {name}: {count} {}", plural(count, "repository", "repositories"))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn assignment_validation<W: Write>(&self, out: &mut W, validation: &ValidationReport) -> fmt::Result {
        writeln!(out, "## Assignment Validation\n")?;
        writeln!(
            out,
            "**Coverage:** {:.1}% of repositories assigned ({}/{})\n",
            validation.assignment_coverage,
            validation.assigned_repositories,
            validation.total_repositories
        )?;

        if !validation.unassigned_repositories.is_empty() {
            writeln!(
                out,
                "**Unassigned Repositories ({}):**",
                validation.unassigned_repositories.len()
            )?;
            for name in &validation.unassigned_repositories {
                writeln!(out, "- {name}")?;
            }
            writeln!(out)?;
        }

        if !validation.multi_assigned_repositories.is_empty() {
            writeln!(out, "**Multi-assigned Repositories:**")?;
            for (name, components) in &validation.multi_assigned_repositories {
                writeln!(out, "- {}: {}", name, components.join(", "))?;
            }
            writeln!(out)?;
        }

        if !validation.orphaned_components.is_empty() {
            writeln!(
                out,
                "**Empty Components:** {}\n",
                validation.orphaned_components.join(", ")
            )?;
        }

        if !validation.dependency_cycles.is_empty() {
            writeln!(out, "**Dependency Cycles:**")?;
            for cycle in &validation.dependency_cycles {
                writeln!(out, "- {}", cycle_text(cycle))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn recommendations<W: Write>(
        &self,
        out: &mut W,
        state: &AnalysisState,
        validation: &ValidationReport,
        metrics: &ProgressMetrics,
    ) -> fmt::Result {
        writeln!(out, "## Recommendations\n")?;
        writeln!(out, "### Immediate Actions\n")?;

        let mut items: Vec<(String, Vec<String>)> = Vec::new();

        if !validation.unassigned_repositories.is_empty() {
            items.push((
                format!(
                    "**Assign {} unassigned repositories** to appropriate components",
                    validation.unassigned_repositories.len()
                ),
                vec!["Group by business function or technology stack".to_string()],
            ));
        }

        let large: Vec<String> = validation
            .components
            .iter()
            .filter(|c| c.size_category == SizeCategory::TooLarge)
            .map(|c| format!("{}: {} repositories", c.name, c.repository_count))
            .collect();
        if !large.is_empty() {
            items.push(("**Review large components** for potential splitting".to_string(), large));
        }

        if !validation.failed_repositories.is_empty() {
            items.push((
                format!(
                    "**Re-run analysis** for {} repositories that failed to scan",
                    validation.failed_repositories.len()
                ),
                validation.failed_repositories.clone(),
            ));
        }

        if !validation.dependency_cycles.is_empty() {
            items.push((
                format!(
                    "**Break {} circular dependencies** before planning migration order",
                    validation.dependency_cycles.len()
                ),
                Vec::new(),
            ));
        }

        let remaining = metrics.total_repositories - metrics.insight_enriched_repositories;
        if remaining > 0 {
            items.push((
                format!("**Complete investigation** of {remaining} remaining repositories"),
                vec!["Store insights for each repository as it is understood".to_string()],
            ));
        }

        if items.is_empty() && !state.repositories.is_empty() {
            items.push((
                "**Discovery appears complete**: every repository has insights and a component"
                    .to_string(),
                Vec::new(),
            ));
            items.push((
                "**Ready for the next phase**: detailed migration planning can begin".to_string(),
                Vec::new(),
            ));
        }

        for (index, (headline, details)) in items.iter().enumerate() {
            writeln!(out, "{}. {}", index + 1, headline)?;
            for detail in details {
                writeln!(out, "   - {detail}")?;
            }
        }
        Ok(())
    }

    /// Long-form report over repositories' deep analysis.
    ///
    /// Fails when the filter names repositories that do not exist.
    pub fn deep_analysis_report(
        &self,
        state: &AnalysisState,
        options: &DeepReportOptions,
    ) -> Result<String> {
        let names: Vec<&str> = match &options.repositories {
            Some(filter) => {
                let unknown: Vec<String> = filter
                    .iter()
                    .filter(|name| !state.repositories.contains_key(name.as_str()))
                    .cloned()
                    .collect();
                if !unknown.is_empty() {
                    return Err(ReportError::UnknownRepositories(unknown));
                }
                filter.iter().map(String::as_str).collect()
            }
            None => state.repositories.keys().map(String::as_str).collect(),
        };

        let mut out = String::new();
        write_deep_report(&mut out, state, options, &names)?;
        Ok(out)
    }
}

fn write_deep_report<W: Write>(
    out: &mut W,
    state: &AnalysisState,
    options: &DeepReportOptions,
    names: &[&str],
) -> fmt::Result {
    let total = state.repositories.len();
    let with_deep = state
        .repositories
        .values()
        .filter(|r| r.deep_analysis.is_some())
        .count();

    writeln!(out, "# Deep Repository Analysis Report\n")?;
    writeln!(out, "**Total Repositories:** {total}\n")?;
    writeln!(out, "## Executive Summary\n")?;
    writeln!(out, "- Repositories with deep analysis: {with_deep}/{total}")?;
    writeln!(
        out,
        "- Total dependency relationships: {}",
        state.dependency_records.len()
    )?;
    writeln!(
        out,
        "- Analysis completion: {:.1}%\n",
        percentage(with_deep, total)
    )?;

    writeln!(out, "## Repository Analysis\n")?;
    for &name in names {
        let Some(repo) = state.repositories.get(name) else {
            continue;
        };
        writeln!(out, "### {name}\n")?;

        if options.include_scan_details {
            writeln!(out, "**Basic Information:**")?;
            writeln!(out, "- Path: `{}`", repo.path.display())?;
            writeln!(
                out,
                "- Files: {} ({} lines)",
                thousands(repo.total_files),
                thousands(repo.total_lines)
            )?;
            if let Some(tech) = repo.primary_technology() {
                writeln!(out, "- Primary technology: {tech}")?;
            }
            if !repo.detected_frameworks.is_empty() {
                let frameworks: Vec<&str> =
                    repo.detected_frameworks.iter().map(String::as_str).collect();
                writeln!(out, "- Frameworks: {}", frameworks.join(", "))?;
            }
            writeln!(out)?;
        }

        match &repo.deep_analysis {
            Some(deep) => {
                writeln!(out, "**Deep Analysis:**\n")?;
                writeln!(out, "{}\n", deep.markdown_summary.trim_end())?;
                if !deep.deep_insights.is_empty() {
                    writeln!(out, "**Key Insights:**")?;
                    for (key, value) in &deep.deep_insights {
                        writeln!(out, "- **{key}**: {value}")?;
                    }
                    writeln!(out)?;
                }
            }
            None => {
                writeln!(out, "*No deep analysis available*\n")?;
            }
        }

        if options.include_dependencies {
            let outgoing = state.outgoing_dependencies(name);
            let incoming = state.incoming_dependencies(name);
            if !outgoing.is_empty() || !incoming.is_empty() {
                writeln!(out, "**Dependencies:**\n")?;
                if !outgoing.is_empty() {
                    writeln!(out, "*Depends on:*")?;
                    for dep in outgoing {
                        writeln!(
                            out,
                            "- → `{}` ({}): {}",
                            dep.target_repo, dep.kind, dep.description
                        )?;
                    }
                    writeln!(out)?;
                }
                if !incoming.is_empty() {
                    writeln!(out, "*Depended upon by:*")?;
                    for dep in incoming {
                        writeln!(
                            out,
                            "- ← `{}` ({}): {}",
                            dep.source_repo, dep.kind, dep.description
                        )?;
                    }
                    writeln!(out)?;
                }
            }
        }
    }

    if options.include_dependencies && !state.dependency_records.is_empty() {
        dependency_section(out, &DependencyGraph::build(state, false))?;
    }
    Ok(())
}

fn dependency_section<W: Write>(out: &mut W, graph: &DependencyGraph) -> fmt::Result {
    let stats = &graph.statistics;
    writeln!(out, "## Dependency Analysis\n")?;
    writeln!(out, "- Total dependencies: {}", stats.total_dependencies)?;
    writeln!(
        out,
        "- Repositories with dependencies: {}",
        stats.repositories_with_dependencies
    )?;
    if let Some(name) = &stats.most_depended_upon {
        writeln!(out, "- Most depended upon: `{name}`")?;
    }
    if let Some(name) = &stats.most_dependent {
        writeln!(out, "- Most dependent: `{name}`")?;
    }
    writeln!(out)?;

    if !graph.cycles.is_empty() {
        writeln!(out, "**Circular Dependencies Detected:**")?;
        for cycle in &graph.cycles {
            writeln!(out, "- {}", cycle_text(cycle))?;
        }
        writeln!(out)?;
    }

    if !graph.isolated_repositories.is_empty() {
        writeln!(out, "**Isolated Repositories:**")?;
        for name in &graph.isolated_repositories {
            writeln!(out, "- `{name}` (no dependencies)")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "### Dependency Diagram\n")?;
    writeln!(out, "```mermaid")?;
    graph.write_mermaid(out)?;
    writeln!(out, "```")
}

fn repository_entry<W: Write>(out: &mut W, repo: &RepositoryRecord) -> fmt::Result {
    writeln!(out, "**{}**", repo.name)?;
    writeln!(out, "- Type: {}", repo.repository_type)?;
    if !repo.detected_frameworks.is_empty() {
        let frameworks: Vec<&str> = repo.detected_frameworks.iter().map(String::as_str).collect();
        writeln!(out, "- Frameworks: {}", frameworks.join(", "))?;
    }
    if !repo.file_extension_counts.is_empty() {
        let counts = repo
            .file_extension_counts
            .iter()
            .map(|(ext, count)| (ext.as_str(), *count as usize))
            .collect();
        let shown: Vec<String> = ranked(counts)
            .into_iter()
            .take(TOP_FILE_TYPES)
            .map(|(ext, count)| format!("{ext}: {count}"))
            .collect();
        writeln!(out, "- File types: {}", shown.join(", "))?;
    }
    writeln!(out, "- Files: {}", thousands(repo.total_files))?;
    writeln!(out, "- Lines: {}", thousands(repo.total_lines))?;
    writeln!(out, "- Status: {}", repo.discovery_phase_status())?;
    let components = if repo.assigned_components.is_empty() {
        "Unassigned".to_string()
    } else {
        repo.assigned_components.join(", ")
    };
    writeln!(out, "- Components: {components}")?;
    if !repo.scan_caveats.is_empty() {
        writeln!(out, "- Caveats: {}", repo.scan_caveats.join("; "))?;
    }
    if repo.has_insights() {
        writeln!(out, "- **Insights:**")?;
        for (key, value) in &repo.insights {
            writeln!(out, "  - {key}: {value}")?;
        }
    }
    writeln!(out)
}

/// Highest count first, ties by name.
fn ranked(counts: BTreeMap<&str, usize>) -> Vec<(&str, usize)> {
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
}

fn cycle_text(cycle: &[String]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first);
    }
    parts.join(" → ")
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

/// `too_small` → `Too Small`
fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// `1234567` → `1,234,567`
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("too_small"), "Too Small");
        assert_eq!(title_case("appropriate"), "Appropriate");
    }

    #[test]
    fn test_cycle_text() {
        let cycle = vec!["a".to_string(), "b".to_string()];
        assert_eq!(cycle_text(&cycle), "a → b → a");
    }

    #[test]
    fn test_empty_state_report() {
        let state = AnalysisState::default();
        let validation = sonar_core::ValidationEngine::default().validate(&state);
        let report = ReportGenerator::new().generate(&state, &validation).unwrap();
        assert!(report.starts_with("# Repository Discovery Report\n"));
        assert!(report.contains("- **Total Repositories:** 0"));
        assert!(report.contains("*No repositories discovered.*"));
        assert!(!report.contains("## Logical Components"));
    }
}
