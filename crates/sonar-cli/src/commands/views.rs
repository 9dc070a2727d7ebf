use crate::formatters::{human, print_json};
use anyhow::{Context, Result};
use clap::Args;
use sonar_engine::{DeepReportOptions, DiscoveryEngine};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Per-repository deep analysis report instead of the discovery report
    #[arg(long)]
    pub deep: bool,

    /// Limit the deep report to these repositories (repeatable)
    #[arg(long = "repo", value_name = "NAME", requires = "deep")]
    pub repositories: Vec<String>,

    /// Leave out the dependency section of the deep report
    #[arg(long, requires = "deep")]
    pub no_dependencies: bool,

    /// Leave out scan details of the deep report
    #[arg(long, requires = "deep")]
    pub no_scan_details: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ReportArgs {
    fn deep_options(&self) -> DeepReportOptions {
        DeepReportOptions {
            include_scan_details: !self.no_scan_details,
            include_dependencies: !self.no_dependencies,
            repositories: (!self.repositories.is_empty()).then(|| self.repositories.clone()),
        }
    }
}

pub async fn show_details(engine: &DiscoveryEngine, repository: &str, json: bool) -> Result<()> {
    let details = engine.get_repository_details(repository).await?;
    if json {
        return print_json(&details);
    }
    human::print_repository_details(&details);
    Ok(())
}

pub async fn show_graph(
    engine: &DiscoveryEngine,
    mermaid: bool,
    evidence: bool,
    json: bool,
) -> Result<()> {
    let graph = engine.get_dependency_graph(evidence).await;
    if mermaid {
        print!("{}", graph.to_mermaid());
        return Ok(());
    }
    if json {
        return print_json(&graph);
    }
    human::print_graph(&graph);
    Ok(())
}

pub async fn validate(engine: &DiscoveryEngine, json: bool) -> Result<()> {
    let report = engine.validate().await;
    if json {
        return print_json(&report);
    }
    human::print_validation(&report);
    Ok(())
}

pub async fn report(engine: &DiscoveryEngine, args: ReportArgs) -> Result<()> {
    let markdown = if args.deep {
        engine
            .generate_deep_analysis_report(&args.deep_options())
            .await?
    } else {
        engine.generate_discovery_report().await?
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &markdown)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("✓ Report written to {}", path.display());
        }
        None => print!("{}", markdown),
    }
    Ok(())
}
