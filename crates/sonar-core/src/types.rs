//! Records persisted in the discovery cache.
//!
//! Every field added after the first schema carries `#[serde(default)]` so
//! older cache files keep loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use crate::technology::language_for_extension;

/// Histogram bucket holding every extension outside the top entries.
pub const OTHERS_BUCKET: &str = "others";

/// Histogram key for files without an extension.
pub const NO_EXTENSION: &str = "(none)";

/// Version written into `metadata.schema_version`.
pub const SCHEMA_VERSION: u32 = 1;

/// Coarse classification of what a repository contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryType {
    /// Deployable service (container, serverless or web framework markers).
    Microservice,
    /// Package consumed by other code.
    Library,
    /// Mostly configuration or infrastructure definitions.
    Config,
    /// Mostly prose.
    Documentation,
    /// Not enough signal.
    #[default]
    Unknown,
}

impl RepositoryType {
    /// Returns all types in a consistent order
    pub fn all() -> &'static [RepositoryType] {
        &[
            RepositoryType::Microservice,
            RepositoryType::Library,
            RepositoryType::Config,
            RepositoryType::Documentation,
            RepositoryType::Unknown,
        ]
    }

    /// Serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryType::Microservice => "microservice",
            RepositoryType::Library => "library",
            RepositoryType::Config => "config",
            RepositoryType::Documentation => "documentation",
            RepositoryType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a repository stands in the discovery workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Known by name only.
    #[default]
    Unanalyzed,
    /// Scanned successfully.
    Analyzed,
    /// Scanned and enriched with external insights.
    InsightEnriched,
    /// The scan failed; see `RepositoryRecord::error`.
    Error,
}

impl AnalysisStatus {
    /// Whether a scan has completed for the repository.
    pub fn is_analyzed(&self) -> bool {
        matches!(self, AnalysisStatus::Analyzed | AnalysisStatus::InsightEnriched)
    }

    /// Serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Unanalyzed => "unanalyzed",
            AnalysisStatus::Analyzed => "analyzed",
            AnalysisStatus::InsightEnriched => "insight_enriched",
            AnalysisStatus::Error => "error",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nature of a dependency between two repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Needed to build (shared library, generated code).
    Build,
    /// Called at runtime (API, queue, database).
    Runtime,
    /// Shares configuration.
    Config,
    /// Anything else.
    #[default]
    Unknown,
}

impl DependencyKind {
    /// Returns all kinds in a consistent order
    pub fn all() -> &'static [DependencyKind] {
        &[
            DependencyKind::Build,
            DependencyKind::Runtime,
            DependencyKind::Config,
            DependencyKind::Unknown,
        ]
    }

    /// Parse a user supplied kind, case-insensitively. Unrecognised names map to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "build" => DependencyKind::Build,
            "runtime" => DependencyKind::Runtime,
            "config" => DependencyKind::Config,
            _ => DependencyKind::Unknown,
        }
    }

    /// Serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Build => "build",
            DependencyKind::Runtime => "runtime",
            DependencyKind::Config => "config",
            DependencyKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One insight value supplied by an external collaborator.
///
/// Serialized untagged, so the cache holds plain JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsightValue {
    /// `true` / `false`
    Bool(bool),
    /// Any finite number
    Number(f64),
    /// Free text
    Text(String),
    /// List of strings
    List(Vec<String>),
    /// Nested mapping
    Map(BTreeMap<String, InsightValue>),
}

impl InsightValue {
    /// Returns the first key path holding a NaN or infinite number.
    pub fn non_finite_path(&self, prefix: &str) -> Option<String> {
        match self {
            InsightValue::Number(n) if !n.is_finite() => Some(prefix.to_string()),
            InsightValue::Map(map) => map
                .iter()
                .find_map(|(key, value)| value.non_finite_path(&format!("{prefix}.{key}"))),
            _ => None,
        }
    }
}

impl fmt::Display for InsightValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightValue::Bool(b) => write!(f, "{b}"),
            InsightValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            InsightValue::Number(n) => write!(f, "{n}"),
            InsightValue::Text(s) => f.write_str(s),
            InsightValue::List(items) => f.write_str(&items.join(", ")),
            InsightValue::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for InsightValue {
    fn from(value: &str) -> Self {
        InsightValue::Text(value.to_string())
    }
}

impl From<String> for InsightValue {
    fn from(value: String) -> Self {
        InsightValue::Text(value)
    }
}

impl From<f64> for InsightValue {
    fn from(value: f64) -> Self {
        InsightValue::Number(value)
    }
}

impl From<bool> for InsightValue {
    fn from(value: bool) -> Self {
        InsightValue::Bool(value)
    }
}

impl From<Vec<String>> for InsightValue {
    fn from(value: Vec<String>) -> Self {
        InsightValue::List(value)
    }
}

/// Open mapping of insight keys to values.
pub type Insights = BTreeMap<String, InsightValue>;

/// Long-form analysis attached to a repository in a second pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepAnalysis {
    /// Markdown write-up.
    pub markdown_summary: String,
    /// Structured findings.
    #[serde(default)]
    pub deep_insights: Insights,
    /// When the analysis was stored.
    pub analysis_timestamp: DateTime<Utc>,
}

/// Metadata for one discovered repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Unique key, the directory name.
    pub name: String,
    /// Location relative to the repositories root.
    pub path: PathBuf,
    /// Top extensions by file count plus an `others` bucket.
    #[serde(default)]
    pub file_extension_counts: BTreeMap<String, u64>,
    /// Files seen (bounded by the scan cap).
    #[serde(default)]
    pub total_files: u64,
    /// Lines across line-countable files.
    #[serde(default)]
    pub total_lines: u64,
    /// Technology labels from manifest detection.
    #[serde(default)]
    pub detected_frameworks: BTreeSet<String>,
    /// README present at the root.
    #[serde(default)]
    pub has_readme: bool,
    #[serde(default)]
    pub repository_type: RepositoryType,
    #[serde(default)]
    pub analysis_status: AnalysisStatus,
    /// Certainty of `repository_type` and `detected_frameworks`, 0.0 to 1.0.
    #[serde(default)]
    pub analysis_confidence: f64,
    /// Externally supplied findings, shallow-merged on update.
    #[serde(default)]
    pub insights: Insights,
    /// Components this repository belongs to, in assignment order.
    #[serde(default)]
    pub assigned_components: Vec<String>,
    /// Recognised manifests and config files, relative to the repository.
    #[serde(default)]
    pub config_files: Vec<String>,
    /// Notes about limits hit while scanning.
    #[serde(default)]
    pub scan_caveats: Vec<String>,
    /// Failure message when `analysis_status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_analysis: Option<DeepAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analyzed: Option<DateTime<Utc>>,
}

impl RepositoryRecord {
    /// Create an unanalyzed record.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            file_extension_counts: BTreeMap::new(),
            total_files: 0,
            total_lines: 0,
            detected_frameworks: BTreeSet::new(),
            has_readme: false,
            repository_type: RepositoryType::Unknown,
            analysis_status: AnalysisStatus::Unanalyzed,
            analysis_confidence: 0.0,
            insights: Insights::new(),
            assigned_components: Vec::new(),
            config_files: Vec::new(),
            scan_caveats: Vec::new(),
            error: None,
            deep_analysis: None,
            last_analyzed: None,
        }
    }

    /// Create a record for a repository whose scan failed.
    pub fn failed(name: impl Into<String>, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        let mut record = Self::new(name, path);
        record.analysis_status = AnalysisStatus::Error;
        record.error = Some(message.into());
        record
    }

    pub fn has_insights(&self) -> bool {
        !self.insights.is_empty()
    }

    /// One line describing progress through the discovery phase.
    pub fn discovery_phase_status(&self) -> String {
        let insights = if self.has_insights() {
            "Insights added."
        } else {
            "No insights added."
        };
        let components = if self.assigned_components.is_empty() {
            "Assigned to no components.".to_string()
        } else {
            format!(
                "Assigned to components: {}.",
                self.assigned_components.join(", ")
            )
        };
        format!("{insights} {components}")
    }

    /// Language of the most frequent source extension, ties broken by extension.
    pub fn primary_technology(&self) -> Option<&'static str> {
        let mut best: Option<(&str, u64)> = None;
        for (ext, count) in &self.file_extension_counts {
            if language_for_extension(ext).is_none() {
                continue;
            }
            match best {
                Some((_, best_count)) if *count <= best_count => {}
                _ => best = Some((ext.as_str(), *count)),
            }
        }
        best.and_then(|(ext, _)| language_for_extension(ext))
    }

    /// Fold a fresh scan into this record.
    ///
    /// Scan output overwrites scalar fields. Insights are shallow-merged,
    /// assignments and deep analysis are kept, and an enriched repository
    /// stays enriched when rescanned.
    pub fn merge_scan(&mut self, scanned: RepositoryRecord) {
        let was_enriched = self.analysis_status == AnalysisStatus::InsightEnriched;
        let assigned = std::mem::take(&mut self.assigned_components);
        let mut insights = std::mem::take(&mut self.insights);
        let deep = self.deep_analysis.take();

        *self = scanned;

        insights.extend(std::mem::take(&mut self.insights));
        self.insights = insights;
        self.assigned_components = assigned;
        if self.deep_analysis.is_none() {
            self.deep_analysis = deep;
        }
        if was_enriched && self.analysis_status == AnalysisStatus::Analyzed {
            self.analysis_status = AnalysisStatus::InsightEnriched;
        }
    }
}

/// A named logical grouping of repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub name: String,
    pub purpose: String,
    pub rationale: String,
    /// Member repositories, in assignment order.
    #[serde(default)]
    pub repositories: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// A single-repository component is intentional.
    #[serde(default)]
    pub standalone: bool,
}

impl ComponentRecord {
    pub fn new(
        name: impl Into<String>,
        purpose: impl Into<String>,
        rationale: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
            rationale: rationale.into(),
            repositories: Vec::new(),
            created_at,
            standalone: false,
        }
    }
}

/// A directed dependency between two repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub source_repo: String,
    pub target_repo: String,
    #[serde(default)]
    pub kind: DependencyKind,
    /// Why the dependency is believed to exist.
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Derived counters and bookkeeping stored next to the collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMetadata {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub total_repositories: usize,
    #[serde(default)]
    pub analyzed_repositories: usize,
    #[serde(default)]
    pub insight_enriched_repositories: usize,
    #[serde(default)]
    pub components_created: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_repos_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for StateMetadata {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            total_repositories: 0,
            analyzed_repositories: 0,
            insight_enriched_repositories: 0,
            components_created: 0,
            base_repos_path: None,
            analysis_started: None,
            analysis_completed: None,
            last_updated: None,
        }
    }
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// The aggregate root of the discovery cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisState {
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryRecord>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentRecord>,
    #[serde(default)]
    pub dependency_records: Vec<DependencyRecord>,
    #[serde(default)]
    pub metadata: StateMetadata,
}

impl AnalysisState {
    /// Empty state rooted at `base_repos_path`.
    pub fn new(base_repos_path: Option<PathBuf>) -> Self {
        Self {
            metadata: StateMetadata {
                base_repos_path,
                ..StateMetadata::default()
            },
            ..Self::default()
        }
    }

    /// Recompute the derived counters in `metadata`.
    pub fn refresh_counters(&mut self) {
        let meta = &mut self.metadata;
        meta.total_repositories = self.repositories.len();
        meta.analyzed_repositories = self
            .repositories
            .values()
            .filter(|r| r.analysis_status.is_analyzed())
            .count();
        meta.insight_enriched_repositories = self
            .repositories
            .values()
            .filter(|r| r.analysis_status == AnalysisStatus::InsightEnriched)
            .count();
        meta.components_created = self.components.len();
    }

    /// Whether a full analysis batch has never been persisted.
    pub fn is_unpopulated(&self) -> bool {
        self.repositories.is_empty() && self.metadata.analysis_completed.is_none()
    }

    /// Repositories without any component, sorted by name.
    pub fn unassigned_repositories(&self) -> Vec<String> {
        self.repositories
            .values()
            .filter(|r| r.assigned_components.is_empty())
            .map(|r| r.name.clone())
            .collect()
    }

    /// Repositories in more than one component, with their components.
    pub fn multi_assigned_repositories(&self) -> BTreeMap<String, Vec<String>> {
        self.repositories
            .values()
            .filter(|r| r.assigned_components.len() > 1)
            .map(|r| (r.name.clone(), r.assigned_components.clone()))
            .collect()
    }

    /// Records whose status is not `insight_enriched`.
    pub fn unanalyzed_repositories(&self) -> BTreeMap<String, RepositoryRecord> {
        self.repositories
            .iter()
            .filter(|(_, r)| r.analysis_status != AnalysisStatus::InsightEnriched)
            .map(|(name, r)| (name.clone(), r.clone()))
            .collect()
    }

    /// Dependencies where `name` is the source.
    pub fn outgoing_dependencies(&self, name: &str) -> Vec<&DependencyRecord> {
        self.dependency_records
            .iter()
            .filter(|d| d.source_repo == name)
            .collect()
    }

    /// Dependencies where `name` is the target.
    pub fn incoming_dependencies(&self, name: &str) -> Vec<&DependencyRecord> {
        self.dependency_records
            .iter()
            .filter(|d| d.target_repo == name)
            .collect()
    }
}
