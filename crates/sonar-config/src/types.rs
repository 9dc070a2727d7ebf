use serde::{Deserialize, Serialize};
use sonar_core::ValidationPolicy;
use std::path::PathBuf;

/// Main configuration structure, stored as `sonar.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SonarConfig {
    /// Scanner limits and repository root
    #[serde(default)]
    pub scan: ScanSettings,

    /// Where the discovery cache lives
    #[serde(default)]
    pub storage: StorageSettings,

    /// Component size thresholds
    #[serde(default)]
    pub validation: ValidationPolicy,

    /// Extra framework detection rules
    #[serde(default)]
    pub rules: RuleSettings,
}

/// `[scan]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanSettings {
    /// Directory holding one subdirectory per repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repos_path: Option<PathBuf>,

    /// Files counted per repository before the walk stops
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Files larger than this (bytes) are counted but not read
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Deepest directory level searched for manifests
    #[serde(default = "default_manifest_depth")]
    pub manifest_depth: usize,

    /// Concurrent repository scans
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Extra glob patterns, matched against repository-relative paths
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            repos_path: None,
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
            manifest_depth: default_manifest_depth(),
            worker_count: default_worker_count(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Plain file name inside `cache_dir`
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_file: default_cache_file(),
        }
    }
}

/// `[rules]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleSettings {
    /// TOML rule files loaded on top of the built-in rules
    #[serde(default)]
    pub extra_rule_files: Vec<PathBuf>,
}

fn default_max_files() -> usize {
    5000
}

fn default_max_file_size() -> u64 {
    1024 * 1024
}

fn default_manifest_depth() -> usize {
    6
}

fn default_worker_count() -> usize {
    4
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".discovery_cache")
}

fn default_cache_file() -> String {
    "discovery_cache.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: SonarConfig = toml::from_str("").unwrap();
        assert_eq!(config, SonarConfig::default());
        assert_eq!(config.scan.max_files, 5000);
        assert_eq!(config.scan.max_file_size, 1_048_576);
        assert_eq!(config.storage.cache_file, "discovery_cache.json");
        assert_eq!(config.validation.too_large_threshold, 30);
    }

    #[test]
    fn test_partial_sections() {
        let config: SonarConfig = toml::from_str(
            r#"
            [scan]
            repos_path = "/srv/repos"
            worker_count = 8
            ignore_patterns = ["**/fixtures/**"]

            [validation]
            max_appropriate = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.scan.repos_path, Some(PathBuf::from("/srv/repos")));
        assert_eq!(config.scan.worker_count, 8);
        assert_eq!(config.scan.max_files, 5000);
        assert_eq!(config.scan.ignore_patterns, vec!["**/fixtures/**"]);
        assert_eq!(config.validation.max_appropriate, 20);
        assert_eq!(config.validation.min_appropriate, 3);
        assert_eq!(config.storage.cache_dir, PathBuf::from(".discovery_cache"));
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&SonarConfig::default()).unwrap();
        assert!(text.contains("[scan]"));
        assert!(!text.contains("repos_path"));
        let parsed: SonarConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, SonarConfig::default());
    }
}
