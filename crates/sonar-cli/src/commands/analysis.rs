use crate::formatters::{human, print_json};
use anyhow::{bail, Context, Result};
use colored::*;
use sonar_core::Insights;
use sonar_engine::{DiscoveryEngine, ScanProgress};
use std::path::Path;

pub async fn scan(engine: &DiscoveryEngine, force: bool, json: bool) -> Result<()> {
    let summary = if force {
        let progress = |p: &ScanProgress| {
            if !json {
                let marker = if p.succeeded { "✓".green() } else { "✗".red() };
                eprintln!("  [{}/{}] {} {}", p.completed, p.total, marker, p.repository);
            }
        };
        Some(engine.reanalyze_with_progress(progress).await?)
    } else {
        engine.ensure_analyzed().await?
    };

    match (summary, json) {
        (Some(summary), true) => print_json(&summary),
        (Some(summary), false) => {
            human::print_analysis_summary(&summary);
            Ok(())
        }
        (None, true) => print_json(&engine.progress_metrics().await),
        (None, false) => {
            let metrics = engine.progress_metrics().await;
            println!(
                "Using cached analysis of {} repositories ({:.1}% with insights).",
                metrics.total_repositories, metrics.investigation_progress
            );
            println!("Run 'sonar scan --force' to rescan.");
            Ok(())
        }
    }
}

pub async fn list_repositories(engine: &DiscoveryEngine, unanalyzed: bool, json: bool) -> Result<()> {
    let (title, repos) = if unanalyzed {
        ("Repositories without insights", engine.get_unanalyzed_repositories().await?)
    } else {
        ("Repositories", engine.get_all_repositories().await?)
    };

    if json {
        return print_json(&repos);
    }
    human::print_repositories(title, &repos);
    Ok(())
}

pub async fn store_insights(
    engine: &DiscoveryEngine,
    repository: &str,
    insights: &str,
    json: bool,
) -> Result<()> {
    let insights = parse_insights(insights)?;
    let count = insights.len();
    let record = engine
        .store_repository_insights(repository, insights)
        .await
        .with_context(|| format!("Failed to store insights for '{}'", repository))?;

    if json {
        return print_json(&record);
    }
    println!("✓ Stored {} insight(s) for {}", count, repository);
    println!("  {}", record.discovery_phase_status());
    Ok(())
}

pub async fn store_deep_analysis(
    engine: &DiscoveryEngine,
    repository: &str,
    summary_file: &Path,
    insights: Option<&str>,
    json: bool,
) -> Result<()> {
    let summary = std::fs::read_to_string(summary_file)
        .with_context(|| format!("Failed to read {}", summary_file.display()))?;
    let insights = match insights {
        Some(text) => parse_insights(text)?,
        None => Insights::new(),
    };

    let record = engine
        .store_repository_deep_analysis(repository, &summary, insights)
        .await
        .with_context(|| format!("Failed to store deep analysis for '{}'", repository))?;

    if json {
        return print_json(&record);
    }
    println!("✓ Stored deep analysis for {}", repository);
    Ok(())
}

/// Parse a JSON object given inline or as `@path`.
pub fn parse_insights(arg: &str) -> Result<Insights> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read insights from {}", path))?,
        None => arg.to_string(),
    };

    let value: serde_json::Value =
        serde_json::from_str(&text).context("Insights must be valid JSON")?;
    if !value.is_object() {
        bail!("Insights must be a JSON object of key/value pairs");
    }
    serde_json::from_value(value).context("Insight values must be booleans, numbers, strings, string lists or objects")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_core::InsightValue;
    use tempfile::TempDir;

    #[test]
    fn test_parse_inline_insights() {
        let insights =
            parse_insights(r#"{"business_domain": "payments", "replicas": 3, "stack": ["java", "kafka"]}"#)
                .unwrap();
        assert_eq!(insights["business_domain"], InsightValue::Text("payments".into()));
        assert_eq!(insights["replicas"], InsightValue::Number(3.0));
        assert_eq!(
            insights["stack"],
            InsightValue::List(vec!["java".into(), "kafka".into()])
        );
    }

    #[test]
    fn test_parse_insights_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("insights.json");
        std::fs::write(&path, r#"{"owner": "team-a"}"#).unwrap();

        let insights = parse_insights(&format!("@{}", path.display())).unwrap();
        assert_eq!(insights.len(), 1);
    }

    #[test]
    fn test_parse_insights_rejects_non_objects() {
        assert!(parse_insights("[1, 2]").is_err());
        assert!(parse_insights("not json").is_err());
        assert!(parse_insights("@/definitely/not/here.json").is_err());
    }
}
