//! Human-readable formatter for discovery results.

use colored::*;
use sonar_core::{AnalysisStatus, RepositoryRecord, SizeCategory, ValidationReport};
use sonar_engine::AnalysisSummary;
use sonar_report::{thousands, ComponentsSummary, DependencyGraph, RepositoryDetails};
use sonar_store::StorageInfo;
use std::collections::BTreeMap;

pub fn print_analysis_summary(summary: &AnalysisSummary) {
    println!("\n🔍 {}", "Repository Analysis".bold());
    println!("   Root: {}", summary.repos_root.display());
    println!("   Discovered: {}", summary.discovered);
    println!("   Analyzed: {}", summary.analyzed.to_string().green());
    let elapsed = summary.completed - summary.started;
    println!("   Duration: {}ms", elapsed.num_milliseconds());

    if !summary.failures.is_empty() {
        println!("\n{} ({}):", "Failed scans".red().bold(), summary.failures.len());
        for failure in &summary.failures {
            println!("  {} {}: {}", "✗".red(), failure.name, failure.error);
        }
    }
}

pub fn print_repositories(title: &str, repos: &BTreeMap<String, RepositoryRecord>) {
    println!("\n📦 {} ({}):", title.bold(), repos.len());
    if repos.is_empty() {
        println!("   None.");
        return;
    }

    let width = repos.keys().map(String::len).max().unwrap_or(0);
    for repo in repos.values() {
        let marker = status_marker(repo.analysis_status);
        let technology = repo.primary_technology().unwrap_or("-");
        let components = if repo.assigned_components.is_empty() {
            "unassigned".bright_black().to_string()
        } else {
            repo.assigned_components.join(", ").cyan().to_string()
        };
        println!(
            "  {} {:width$}  {:14} {:>8} files  {}",
            marker,
            repo.name,
            repo.repository_type.as_str(),
            thousands(repo.total_files),
            format!("{technology}  {components}"),
            width = width
        );
    }
}

fn status_marker(status: AnalysisStatus) -> ColoredString {
    match status {
        AnalysisStatus::InsightEnriched => "●".green(),
        AnalysisStatus::Analyzed => "○".yellow(),
        AnalysisStatus::Unanalyzed => "·".bright_black(),
        AnalysisStatus::Error => "✗".red(),
    }
}

pub fn print_repository_details(details: &RepositoryDetails) {
    let repo = &details.record;
    println!("\n📦 {}", repo.name.bold());
    println!("   Path: {}", repo.path.display());
    println!("   Type: {} ({:.0}% confidence)", repo.repository_type, repo.analysis_confidence * 100.0);
    println!("   Status: {}", details.discovery_status);
    if let Some(tech) = &details.primary_technology {
        println!("   Primary technology: {}", tech);
    }
    println!(
        "   Files: {}  Lines: {}",
        thousands(repo.total_files),
        thousands(repo.total_lines)
    );
    if !repo.detected_frameworks.is_empty() {
        let frameworks: Vec<&str> = repo.detected_frameworks.iter().map(String::as_str).collect();
        println!("   Frameworks: {}", frameworks.join(", "));
    }
    if !repo.config_files.is_empty() {
        println!("   Config files: {}", repo.config_files.join(", "));
    }
    if let Some(error) = &repo.error {
        println!("   {} {}", "Error:".red(), error);
    }
    for caveat in &repo.scan_caveats {
        println!("   {} {}", "⚠️ ".yellow(), caveat);
    }

    if !repo.insights.is_empty() {
        println!("\n   {}", "Insights:".bold());
        for (key, value) in &repo.insights {
            println!("     {}: {}", key.cyan(), value);
        }
    }

    if !details.outgoing.is_empty() || !details.incoming.is_empty() {
        println!("\n   {}", "Dependencies:".bold());
        for dep in &details.outgoing {
            println!("     → {} ({}) {}", dep.target_repo, dep.kind, dep.description);
        }
        for dep in &details.incoming {
            println!("     ← {} ({}) {}", dep.source_repo, dep.kind, dep.description);
        }
    }

    if !details.suggestions.is_empty() {
        println!("\n   {}", "Next steps:".bold());
        for suggestion in &details.suggestions {
            println!("     - {}", suggestion);
        }
    }
}

pub fn print_graph(graph: &DependencyGraph) {
    let stats = &graph.statistics;
    println!("\n🕸  {}", "Dependency Graph".bold());
    println!("   Repositories: {}", stats.total_repositories);
    println!("   With dependencies: {}", stats.repositories_with_dependencies);
    println!("   Dependencies: {}", stats.total_dependencies);
    println!("   Average per repository: {:.2}", stats.average_dependencies);
    if let Some(name) = &stats.most_depended_upon {
        println!("   Most depended upon: {}", name.cyan());
    }
    if let Some(name) = &stats.most_dependent {
        println!("   Most dependent: {}", name.cyan());
    }

    if !graph.edges.is_empty() {
        println!("\n   {}", "Edges:".bold());
        for edge in &graph.edges {
            println!("     {} → {} ({})", edge.source, edge.target, edge.kind);
            if let Some(evidence) = &edge.evidence {
                println!("       {}", evidence.bright_black());
            }
        }
    }

    print_cycles(&graph.cycles);

    if !graph.isolated_repositories.is_empty() {
        println!(
            "\n   Isolated: {}",
            graph.isolated_repositories.join(", ").bright_black()
        );
    }
}

fn print_cycles(cycles: &[Vec<String>]) {
    if cycles.is_empty() {
        return;
    }
    println!("\n🔄 {} ({}):", "Circular Dependencies".red().bold(), cycles.len());
    for (idx, cycle) in cycles.iter().enumerate() {
        let mut path = cycle.clone();
        if let Some(first) = cycle.first() {
            path.push(first.clone());
        }
        println!("  ⚠️  Cycle {}: {}", idx + 1, path.join(" → "));
    }
}

pub fn print_validation(report: &ValidationReport) {
    println!("\n✅ {}", "Validation".bold());
    println!(
        "   Coverage: {:.1}% ({}/{} assigned)",
        report.assignment_coverage, report.assigned_repositories, report.total_repositories
    );
    println!("   Analysis progress: {:.1}%", report.analysis_progress);

    if !report.unassigned_repositories.is_empty() {
        println!(
            "\n   {} ({}): {}",
            "Unassigned".yellow(),
            report.unassigned_repositories.len(),
            report.unassigned_repositories.join(", ")
        );
    }
    for (repo, components) in &report.multi_assigned_repositories {
        println!("   {} {} in {}", "Multi-assigned:".yellow(), repo, components.join(", "));
    }
    if !report.orphaned_components.is_empty() {
        println!("   {} {}", "Empty components:".yellow(), report.orphaned_components.join(", "));
    }
    if !report.failed_repositories.is_empty() {
        println!("   {} {}", "Failed scans:".red(), report.failed_repositories.join(", "));
    }
    if !report.dangling_dependencies.is_empty() {
        println!(
            "   {} {}",
            "Dependencies on unknown repositories:".red(),
            report.dangling_dependencies.join(", ")
        );
    }

    for component in &report.components {
        if component.warnings.is_empty() {
            continue;
        }
        println!("\n   {} [{}]", component.name.bold(), size_label(component.size_category));
        for warning in &component.warnings {
            println!("     ⚠️  {}", warning);
        }
        for suggestion in &component.suggestions {
            println!("     → {}", suggestion);
        }
    }

    print_cycles(&report.dependency_cycles);

    println!();
    if report.is_ready() {
        println!("{} Ready for the discovery report", "✓".green());
    } else {
        println!("{}", "Not ready yet:".yellow().bold());
        for issue in &report.readiness_issues {
            println!("  - {}", issue);
        }
    }
}

fn size_label(category: SizeCategory) -> ColoredString {
    match category {
        SizeCategory::Appropriate => category.as_str().green(),
        SizeCategory::Large | SizeCategory::TooSmall => category.as_str().yellow(),
        SizeCategory::TooLarge | SizeCategory::Empty => category.as_str().red(),
    }
}

pub fn print_components(summary: &ComponentsSummary) {
    println!(
        "\n🧩 {} ({} components, {} repositories):",
        "Logical Components".bold(),
        summary.total_components,
        summary.total_repositories
    );

    for component in &summary.components {
        let standalone = if component.standalone { " standalone" } else { "" };
        println!(
            "\n  {} [{}{}]",
            component.name.bold(),
            size_label(component.size_category),
            standalone
        );
        if !component.purpose.is_empty() {
            println!("    Purpose: {}", component.purpose);
        }
        println!(
            "    Repositories ({}): {}",
            component.repository_count,
            component.repositories.join(", ")
        );
        if !component.technology.primary_technologies.is_empty() {
            println!(
                "    Technologies: {}",
                component.technology.primary_technologies.join(", ")
            );
        }
        if !component.technology.frameworks.is_empty() {
            println!("    Frameworks: {}", component.technology.frameworks.join(", "));
        }
        for warning in &component.warnings {
            println!("    ⚠️  {}", warning);
        }
    }

    println!(
        "\n   Coverage: {:.1}%",
        summary.validation.assignment_coverage
    );
    if !summary.suggestions.is_empty() {
        println!("\n{}", "Suggestions:".bold());
        for suggestion in &summary.suggestions {
            println!("  - {}", suggestion);
        }
    }
}

pub fn print_storage_info(info: &StorageInfo) {
    println!("\n💾 {}", "Discovery Cache".bold());
    println!("   Directory: {}", info.storage_dir.display());
    println!(
        "   Cache file: {} ({})",
        info.cache_file.display(),
        describe_file(info.cache_file_exists, info.cache_file_size)
    );
    if let Some(modified) = info.cache_file_modified {
        println!("   Modified: {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!(
        "   Backup: {} ({})",
        info.backup_file.display(),
        describe_file(info.backup_file_exists, info.backup_file_size)
    );
    println!("   Loaded from: {}", info.loaded_from);
    println!("   Repositories: {}", info.repositories);
    println!("   Components: {}", info.components);
}

fn describe_file(exists: bool, size: Option<u64>) -> String {
    match (exists, size) {
        (true, Some(size)) => format_bytes(size),
        (true, None) => "present".to_string(),
        (false, _) => "missing".to_string(),
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_describe_file() {
        assert_eq!(describe_file(false, None), "missing");
        assert_eq!(describe_file(true, Some(10)), "10 B");
    }
}
