//! TOML rule file definitions
//!
//! A rule file describes one ecosystem: which files are its manifests, how
//! to parse them, and which dependency names or content patterns map to
//! which framework labels.
//!
//! ```toml
//! [ecosystem]
//! name = "JavaScript"
//!
//! [[manifest]]
//! name = "npm"
//! file_names = ["package.json"]
//! format = "json"
//! sections = ["dependencies", "devDependencies"]
//!
//! [[framework]]
//! name = "React"
//!
//! [[framework.detection]]
//! type = "dependency"
//! manifest = "npm"
//! pattern = "^react$"
//! ```

use serde::{Deserialize, Serialize};

/// A complete rule file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuleFile {
    /// Ecosystem metadata (optional)
    #[serde(default)]
    pub ecosystem: Option<EcosystemMetadata>,

    /// Manifest definitions
    #[serde(default, rename = "manifest")]
    pub manifests: Vec<ManifestDefinition>,

    /// Framework definitions
    #[serde(default, rename = "framework")]
    pub frameworks: Vec<FrameworkDefinition>,
}

/// Ecosystem metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EcosystemMetadata {
    /// Ecosystem name (e.g., "JavaScript", "JVM")
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// How to recognise and parse one kind of manifest
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestDefinition {
    /// Registry-wide name referenced by detection rules (e.g., "npm")
    pub name: String,

    /// Exact file names, compared case-insensitively
    #[serde(default)]
    pub file_names: Vec<String>,

    /// File extensions including the dot (e.g., ".csproj")
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns matched against the file name (e.g., "docker-compose*.yml")
    #[serde(default)]
    pub globs: Vec<String>,

    /// Parser used for the contents
    #[serde(default)]
    pub format: ManifestFormat,

    /// Where dependency names live. Meaning depends on the format:
    /// dotted table paths for JSON/TOML, element names or `Element@attribute`
    /// for XML. Ignored for line and text formats.
    #[serde(default)]
    pub sections: Vec<String>,

    /// Regex with one capture group extracting a dependency name from a line
    /// (line format only)
    #[serde(default)]
    pub line_pattern: Option<String>,
}

/// Manifest content format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestFormat {
    /// Structured JSON document
    Json,
    /// Structured TOML document
    Toml,
    /// XML-like markup (pom.xml, *.csproj)
    Xml,
    /// One dependency per line (requirements.txt, Gemfile, go.mod)
    Lines,
    /// Raw text, only content rules apply
    #[default]
    Text,
}

/// A framework and the rules that detect it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrameworkDefinition {
    /// Label reported when detected (e.g., "Spring Boot")
    pub name: String,

    /// Ordering priority (higher = listed first, default: 50)
    #[serde(default)]
    pub priority: Option<u32>,

    /// Labels hidden when this one is detected (e.g., Spring Boot hides Spring Framework)
    #[serde(default)]
    pub suppresses: Vec<String>,

    /// Detection rules
    #[serde(default)]
    pub detection: Vec<DetectionRule>,
}

/// Detection rule for a framework
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionRule {
    /// Detection type
    #[serde(rename = "type")]
    pub rule_type: DetectionType,

    /// Name of the manifest definition this rule applies to
    pub manifest: String,

    /// Regex (case-insensitive) for dependency/content rules; unused for presence rules
    #[serde(default)]
    pub pattern: String,

    /// Optional weight for this detection rule (default: 1.0)
    #[serde(default)]
    pub weight: Option<f32>,
}

/// Detection rule type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    /// Match dependency names extracted by the manifest parser
    Dependency,
    /// Match the raw manifest contents
    Content,
    /// The manifest file exists
    Presence,
}

impl DetectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionType::Dependency => "dependency",
            DetectionType::Content => "content",
            DetectionType::Presence => "presence",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_file() {
        let toml_str = r#"
            [ecosystem]
            name = "Python"

            [[manifest]]
            name = "pip"
            file_names = ["requirements.txt"]
            format = "lines"

            [[framework]]
            name = "Django"

            [[framework.detection]]
            type = "dependency"
            manifest = "pip"
            pattern = "^django$"
        "#;

        let file: RuleFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.ecosystem.unwrap().name, "Python");
        assert_eq!(file.manifests.len(), 1);
        assert_eq!(file.manifests[0].format, ManifestFormat::Lines);
        assert_eq!(file.frameworks[0].detection[0].rule_type, DetectionType::Dependency);
    }

    #[test]
    fn test_defaults() {
        let toml_str = r#"
            [[manifest]]
            name = "docker"
            file_names = ["Dockerfile"]
        "#;

        let file: RuleFile = toml::from_str(toml_str).unwrap();
        assert!(file.ecosystem.is_none());
        assert_eq!(file.manifests[0].format, ManifestFormat::Text);
        assert!(file.frameworks.is_empty());
    }
}
