use chrono::{TimeZone, Utc};
use sonar_core::{
    AnalysisState, AnalysisStatus, ComponentRecord, DeepAnalysis, DependencyKind,
    DependencyRecord, Insights, RepositoryRecord, ValidationEngine,
};
use sonar_report::{DeepReportOptions, ReportError, ReportGenerator};
use std::path::PathBuf;

fn repo(name: &str, ext: &str, files: u64, lines: u64) -> RepositoryRecord {
    let mut record = RepositoryRecord::new(name, format!("/repos/{name}"));
    record.analysis_status = AnalysisStatus::Analyzed;
    record.file_extension_counts.insert(ext.to_string(), files);
    record.total_files = files;
    record.total_lines = lines;
    record
}

fn edge(source: &str, target: &str) -> DependencyRecord {
    DependencyRecord {
        source_repo: source.into(),
        target_repo: target.into(),
        kind: DependencyKind::Runtime,
        evidence: String::new(),
        description: format!("{source} calls {target}"),
        created_at: None,
    }
}

fn fixture() -> AnalysisState {
    let mut state = AnalysisState::new(Some(PathBuf::from("/repos")));
    let mut orders = repo("orders-api", ".java", 1200, 84_000);
    orders.detected_frameworks.insert("Spring Boot".into());
    let mut insights = Insights::new();
    insights.insert("business_domain".into(), "orders".into());
    orders.insights = insights;
    orders.analysis_status = AnalysisStatus::InsightEnriched;
    orders.assigned_components.push("commerce".into());
    orders.deep_analysis = Some(DeepAnalysis {
        markdown_summary: "Hexagonal service with a Postgres adapter.".into(),
        deep_insights: Insights::new(),
        analysis_timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    });

    let mut web = repo("web-shop", ".ts", 300, 20_000);
    web.detected_frameworks.insert("React".into());

    let mut failed = RepositoryRecord::failed("broken", "/repos/broken", "permission denied");
    failed.analysis_status = AnalysisStatus::Error;

    for record in [orders, web, failed] {
        state.repositories.insert(record.name.clone(), record);
    }

    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut commerce = ComponentRecord::new("commerce", "Order handling", "Shared data", created);
    commerce.repositories.push("orders-api".into());
    state.components.insert("commerce".into(), commerce);
    state.dependency_records.push(edge("web-shop", "orders-api"));
    state.refresh_counters();
    state
}

#[test]
fn test_report_is_deterministic() {
    let state = fixture();
    let validation = ValidationEngine::default().validate(&state);
    let generator = ReportGenerator::new();
    assert_eq!(
        generator.generate(&state, &validation).unwrap(),
        generator.generate(&state, &validation).unwrap()
    );
}

#[test]
fn test_report_sections_in_order() {
    let state = fixture();
    let validation = ValidationEngine::default().validate(&state);
    let report = ReportGenerator::new().generate(&state, &validation).unwrap();

    let sections = [
        "## Executive Summary",
        "## Repository Inventory",
        "## Logical Components",
        "## Technology Stack Summary",
        "## Assignment Validation",
        "## Recommendations",
    ];
    let positions: Vec<usize> = sections
        .iter()
        .map(|s| report.find(s).unwrap_or_else(|| panic!("missing {s}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    assert!(report.contains("**Base Path:** `/repos`"));
    assert!(report.contains("### Complete (Insights and Components) (1)"));
    assert!(report.contains("### Needs Investigation (1)"));
    assert!(report.contains("### Scan Failures (1)"));
    assert!(report.contains("- **broken**: permission denied"));
    assert!(report.contains("- Lines: 84,000"));
    assert!(report.contains("  - business_domain: orders"));
    assert!(report.contains("**Size Assessment:** Too Small"));
    assert!(report.contains("- Spring Boot: 1 repository"));
}

#[test]
fn test_recommendations_are_numbered() {
    let state = fixture();
    let validation = ValidationEngine::default().validate(&state);
    let report = ReportGenerator::new().generate(&state, &validation).unwrap();
    let recommendations = &report[report.find("## Recommendations").unwrap()..];

    assert!(recommendations.contains("1. **Assign 2 unassigned repositories**"));
    assert!(recommendations.contains("2. **Re-run analysis** for 1 repositories"));
    assert!(recommendations.contains("3. **Complete investigation** of 2 remaining"));
    assert!(!recommendations.contains("Discovery appears complete"));
}

#[test]
fn test_complete_discovery_recommendation() {
    let mut state = AnalysisState::default();
    let mut record = repo("solo", ".go", 10, 100);
    record.insights.insert("purpose".into(), "cli".into());
    record.analysis_status = AnalysisStatus::InsightEnriched;
    record.assigned_components.push("tools".into());
    state.repositories.insert("solo".into(), record);
    let mut tools = ComponentRecord::new("tools", "", "", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    tools.repositories.push("solo".into());
    tools.standalone = true;
    state.components.insert("tools".into(), tools);

    let validation = ValidationEngine::default().validate(&state);
    let report = ReportGenerator::new().generate(&state, &validation).unwrap();
    assert!(report.contains("1. **Discovery appears complete**"));
    assert!(report.contains("2. **Ready for the next phase**"));
}

#[test]
fn test_deep_report() {
    let state = fixture();
    let report = ReportGenerator::new()
        .deep_analysis_report(&state, &DeepReportOptions::default())
        .unwrap();

    assert!(report.contains("- Repositories with deep analysis: 1/3"));
    assert!(report.contains("- Analysis completion: 33.3%"));
    assert!(report.contains("Hexagonal service with a Postgres adapter."));
    assert!(report.contains("*No deep analysis available*"));
    assert!(report.contains("- → `orders-api` (runtime): web-shop calls orders-api"));
    assert!(report.contains("- ← `web-shop` (runtime)"));
    assert!(report.contains("```mermaid\ngraph TD\n    web_shop -->|runtime| orders_api\n```"));
    assert!(report.contains("- `broken` (no dependencies)"));
}

#[test]
fn test_deep_report_filter() {
    let state = fixture();
    let generator = ReportGenerator::new();
    let options = DeepReportOptions {
        include_scan_details: false,
        include_dependencies: false,
        repositories: Some(vec!["web-shop".into()]),
    };
    let report = generator.deep_analysis_report(&state, &options).unwrap();
    assert!(report.contains("### web-shop"));
    assert!(!report.contains("### orders-api"));
    assert!(!report.contains("**Basic Information:**"));
    assert!(!report.contains("## Dependency Analysis"));

    let options = DeepReportOptions {
        repositories: Some(vec!["web-shop".into(), "ghost".into()]),
        ..DeepReportOptions::default()
    };
    assert_eq!(
        generator.deep_analysis_report(&state, &options),
        Err(ReportError::UnknownRepositories(vec!["ghost".into()]))
    );
}
