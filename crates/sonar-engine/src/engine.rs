use crate::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sonar_config::SonarConfig;
use sonar_core::{
    AnalysisState, ComponentRecord, DependencyKind, DependencyRecord, Error as StateError,
    Insights, ProgressMetrics, RepositoryRecord, ValidationEngine, ValidationReport,
};
use sonar_detect::FrameworkDetector;
use sonar_report::{
    ComponentsSummary, DeepReportOptions, DependencyGraph, ReportGenerator, RepositoryDetails,
};
use sonar_scan::{
    find_repositories, AnalysisCoordinator, BatchResult, IgnoreRules, RepositoryScanner,
    ScanOptions, ScanProgress,
};
use sonar_store::{AnalysisStateStore, StorageInfo};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A repository whose scan failed during an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedScan {
    pub name: String,
    pub error: String,
}

/// Outcome of one full analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub repos_root: PathBuf,
    /// Directories found under the root
    pub discovered: usize,
    /// Successfully scanned
    pub analyzed: usize,
    pub failures: Vec<FailedScan>,
    pub started: DateTime<Utc>,
    pub completed: DateTime<Utc>,
}

/// Discovery and memory engine
///
/// Owns the scanner pool, the persistent state store and the report
/// generator. Every state-changing operation is persisted before it returns.
pub struct DiscoveryEngine {
    repos_root: PathBuf,
    coordinator: AnalysisCoordinator,
    store: AnalysisStateStore,
    validator: ValidationEngine,
    reports: ReportGenerator,
    /// Held for the duration of an analysis run
    analysis: Mutex<()>,
}

impl DiscoveryEngine {
    /// Build an engine from configuration.
    ///
    /// Loads the built-in framework rules plus any extra rule files, and
    /// opens (or recovers) the discovery cache. Repositories are not scanned
    /// until first needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule file or ignore pattern is invalid, or the
    /// cache directory cannot be created.
    pub async fn from_config(config: &SonarConfig) -> Result<Self> {
        let mut detector = FrameworkDetector::built_in()?;
        for path in &config.rules.extra_rule_files {
            detector.load_rule_file(path)?;
        }

        let options = ScanOptions {
            max_files: config.scan.max_files,
            max_file_size: config.scan.max_file_size,
            manifest_depth: config.scan.manifest_depth,
            ignore: IgnoreRules::new(&config.scan.ignore_patterns)?,
            ..ScanOptions::default()
        };
        let scanner = Arc::new(RepositoryScanner::new(options, Arc::new(detector)));
        let coordinator = AnalysisCoordinator::new(scanner, config.scan.worker_count);

        let root = config
            .scan
            .repos_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let repos_root = std::path::absolute(&root).map_err(|source| EngineError::Discovery {
            path: root.clone(),
            source,
        })?;

        let store =
            AnalysisStateStore::open(&config.storage.cache_dir, &config.storage.cache_file).await?;
        tracing::debug!(
            repos_root = %repos_root.display(),
            cache = %store.cache_path().display(),
            workers = coordinator.workers(),
            "Discovery engine ready"
        );

        Ok(Self {
            repos_root,
            coordinator,
            store,
            validator: ValidationEngine::new(config.validation.clone()),
            reports: ReportGenerator::new(),
            analysis: Mutex::new(()),
        })
    }

    pub fn repos_root(&self) -> &Path {
        &self.repos_root
    }

    pub fn store(&self) -> &AnalysisStateStore {
        &self.store
    }

    /// A copy of the whole state.
    pub async fn snapshot(&self) -> AnalysisState {
        self.store.snapshot().await
    }

    /// All repository records, running a full analysis first if the cache
    /// has never been populated.
    pub async fn get_all_repositories(&self) -> Result<BTreeMap<String, RepositoryRecord>> {
        self.ensure_analyzed().await?;
        Ok(self.store.snapshot().await.repositories)
    }

    /// Repositories not yet enriched with insights.
    pub async fn get_unanalyzed_repositories(&self) -> Result<BTreeMap<String, RepositoryRecord>> {
        self.ensure_analyzed().await?;
        Ok(self.store.snapshot().await.unanalyzed_repositories())
    }

    /// Run the first analysis if nothing has been analysed yet.
    ///
    /// Returns `None` when the cache was already populated.
    pub async fn ensure_analyzed(&self) -> Result<Option<AnalysisSummary>> {
        let _guard = self.analysis.lock().await;
        if !self.store.snapshot().await.is_unpopulated() {
            return Ok(None);
        }
        tracing::info!(root = %self.repos_root.display(), "No cached analysis, scanning repositories");
        self.run_analysis(|_| {}).await.map(Some)
    }

    /// Rescan every repository directory and merge the results.
    ///
    /// New directories are added; records whose directory vanished are kept.
    pub async fn reanalyze(&self) -> Result<AnalysisSummary> {
        self.reanalyze_with_progress(|_| {}).await
    }

    /// [`reanalyze`](Self::reanalyze), reporting each completed scan.
    pub async fn reanalyze_with_progress<F>(&self, progress: F) -> Result<AnalysisSummary>
    where
        F: FnMut(&ScanProgress),
    {
        let _guard = self.analysis.lock().await;
        self.run_analysis(progress).await
    }

    async fn run_analysis<F>(&self, progress: F) -> Result<AnalysisSummary>
    where
        F: FnMut(&ScanProgress),
    {
        let started = Utc::now();
        let paths = find_repositories(&self.repos_root).map_err(|source| EngineError::Discovery {
            path: self.repos_root.clone(),
            source,
        })?;
        let discovered = paths.len();

        let outcomes = self
            .coordinator
            .analyze_all(&self.repos_root, paths, progress)
            .await;
        let batch = BatchResult::from_outcomes(outcomes);
        let analyzed = batch.records.len();

        let known = self.store.snapshot().await;
        let mut records = batch.records;
        let mut failures = Vec::with_capacity(batch.failures.len());
        for failure in batch.failures {
            let message = failure.error.to_string();
            if known.repositories.contains_key(&failure.name) {
                // Last good scan stays
                tracing::warn!(repository = %failure.name, "Keeping previous record after failed rescan");
            } else {
                let relative = failure
                    .path
                    .strip_prefix(&self.repos_root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| failure.path.clone());
                records.push(RepositoryRecord::failed(&failure.name, relative, &message));
            }
            failures.push(FailedScan {
                name: failure.name,
                error: message,
            });
        }

        self.store
            .record_analysis(&self.repos_root, records, started)
            .await?;

        Ok(AnalysisSummary {
            repos_root: self.repos_root.clone(),
            discovered,
            analyzed,
            failures,
            started,
            completed: Utc::now(),
        })
    }

    pub async fn store_repository_insights(
        &self,
        name: &str,
        insights: Insights,
    ) -> Result<RepositoryRecord> {
        Ok(self.store.store_insights(name, insights).await?)
    }

    pub async fn store_repository_deep_analysis(
        &self,
        name: &str,
        markdown_summary: &str,
        deep_insights: Insights,
    ) -> Result<RepositoryRecord> {
        Ok(self
            .store
            .store_deep_analysis(name, markdown_summary, deep_insights)
            .await?)
    }

    pub async fn add_component(
        &self,
        name: &str,
        purpose: &str,
        rationale: &str,
    ) -> Result<ComponentRecord> {
        Ok(self.store.add_component(name, purpose, rationale).await?)
    }

    /// Returns `false` when the repository was already a member.
    pub async fn assign_repository_to_component(
        &self,
        repository: &str,
        component: &str,
    ) -> Result<bool> {
        Ok(self.store.assign_repository(repository, component).await?)
    }

    /// Returns `false` when the repository was not a member.
    pub async fn unassign_repository(&self, repository: &str, component: &str) -> Result<bool> {
        Ok(self.store.unassign_repository(repository, component).await?)
    }

    pub async fn set_component_standalone(&self, component: &str, standalone: bool) -> Result<()> {
        Ok(self.store.set_component_standalone(component, standalone).await?)
    }

    pub async fn add_repository_dependency(
        &self,
        source: &str,
        target: &str,
        kind: DependencyKind,
        description: &str,
        evidence: &str,
    ) -> Result<DependencyRecord> {
        Ok(self
            .store
            .add_dependency(source, target, kind, description, evidence)
            .await?)
    }

    pub async fn get_repository_details(&self, name: &str) -> Result<RepositoryDetails> {
        let state = self.store.snapshot().await;
        RepositoryDetails::build(&state, name)
            .ok_or_else(|| EngineError::State(StateError::repository_not_found(name)))
    }

    pub async fn get_dependency_graph(&self, include_evidence: bool) -> DependencyGraph {
        DependencyGraph::build(&self.store.snapshot().await, include_evidence)
    }

    pub async fn progress_metrics(&self) -> ProgressMetrics {
        self.store.metrics().await
    }

    pub async fn validate(&self) -> ValidationReport {
        self.validator.validate(&self.store.snapshot().await)
    }

    pub async fn get_components_summary(&self) -> ComponentsSummary {
        let state = self.store.snapshot().await;
        let validation = self.validator.validate(&state);
        ComponentsSummary::build(&state, &validation)
    }

    /// The markdown discovery report over the current state.
    pub async fn generate_discovery_report(&self) -> Result<String> {
        let state = self.store.snapshot().await;
        let validation = self.validator.validate(&state);
        Ok(self.reports.generate(&state, &validation)?)
    }

    pub async fn generate_deep_analysis_report(&self, options: &DeepReportOptions) -> Result<String> {
        let state = self.store.snapshot().await;
        Ok(self.reports.deep_analysis_report(&state, options)?)
    }

    pub async fn storage_info(&self) -> Result<StorageInfo> {
        Ok(self.store.storage_info().await?)
    }

    /// Snapshot the cache file; `None` when nothing has been saved yet.
    pub async fn create_backup(&self, name: Option<&str>) -> Result<Option<PathBuf>> {
        Ok(self.store.create_backup(name).await?)
    }

    /// Reset to an empty state. The previous state is kept as a backup.
    pub async fn clear(&self) -> Result<Option<PathBuf>> {
        let _guard = self.analysis.lock().await;
        Ok(self.store.clear().await?)
    }
}

impl std::fmt::Debug for DiscoveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryEngine")
            .field("repos_root", &self.repos_root)
            .field("store", &self.store)
            .field("workers", &self.coordinator.workers())
            .finish()
    }
}
