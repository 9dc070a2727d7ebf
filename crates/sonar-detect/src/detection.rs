//! Framework detection registry
//!
//! Manifests and framework rules are registered from TOML rule files. The
//! detector is immutable once built and can be shared across scanner workers.

use crate::parser::{parser_for, ManifestParser};
use crate::rule_file::{DetectionRule, DetectionType, FrameworkDefinition, ManifestDefinition, RuleFile};
use crate::{Result, RuleError};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

/// Maximum regex pattern length (to prevent ReDoS attacks)
const MAX_REGEX_LEN: usize = 500;

/// Maximum DFA size for regex compilation (2MB) - protects against ReDoS
const MAX_DFA_SIZE: usize = 2 * 1024 * 1024;

/// Priority used when a framework does not declare one
const DEFAULT_PRIORITY: u32 = 50;

/// Longest matched snippet kept as evidence context
const MAX_CONTEXT_LEN: usize = 80;

/// Compile a case-insensitive pattern with the registry's size limits
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex> {
    if pattern.len() > MAX_REGEX_LEN {
        return Err(RuleError::InvalidPattern(format!(
            "Pattern too long (max {} chars): {}",
            MAX_REGEX_LEN,
            pattern.len()
        )));
    }

    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dfa_size_limit(MAX_DFA_SIZE)
        .build()
        .map_err(RuleError::RegexError)
}

/// A manifest definition with its matchers and parser built
#[derive(Debug)]
struct CompiledManifest {
    name: String,
    file_names: Vec<String>,
    extensions: Vec<String>,
    globs: Option<GlobSet>,
    parser: Box<dyn ManifestParser>,
}

impl CompiledManifest {
    fn compile(definition: &ManifestDefinition) -> Result<Self> {
        let globs = if definition.globs.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &definition.globs {
                let glob = GlobBuilder::new(pattern)
                    .case_insensitive(true)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| RuleError::InvalidPattern(format!("Invalid glob pattern: {}", e)))?;
                builder.add(glob);
            }
            Some(
                builder
                    .build()
                    .map_err(|e| RuleError::InvalidPattern(format!("Invalid glob set: {}", e)))?,
            )
        };

        Ok(Self {
            name: definition.name.clone(),
            file_names: definition.file_names.iter().map(|n| n.to_lowercase()).collect(),
            extensions: definition.extensions.iter().map(|e| e.to_lowercase()).collect(),
            globs,
            parser: parser_for(definition)?,
        })
    }

    fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.file_names.iter().any(|n| *n == lower)
            || self.extensions.iter().any(|e| lower.len() > e.len() && lower.ends_with(e.as_str()))
            || self.globs.as_ref().is_some_and(|g| g.is_match(file_name))
    }
}

/// Compiled detection rule with cached regex
#[derive(Debug, Clone)]
pub struct CompiledDetectionRule {
    /// Framework this rule votes for
    pub framework: String,
    /// Original rule
    pub rule: DetectionRule,
    /// Compiled regex (dependency and content rules)
    pub regex: Option<Regex>,
}

impl CompiledDetectionRule {
    /// Compile a detection rule with security limits
    pub fn compile(framework: &str, rule: DetectionRule) -> Result<Self> {
        if let Some(weight) = rule.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RuleError::InvalidPattern(format!(
                    "Invalid weight {} for {}: must be finite and non-negative",
                    weight, framework
                )));
            }
        }

        let regex = match rule.rule_type {
            DetectionType::Dependency | DetectionType::Content => {
                if rule.pattern.is_empty() {
                    return Err(RuleError::InvalidPattern(format!(
                        "{} rule for {} has an empty pattern",
                        rule.rule_type.as_str(),
                        framework
                    )));
                }
                Some(compile_pattern(&rule.pattern)?)
            }
            DetectionType::Presence => None,
        };

        Ok(Self {
            framework: framework.to_string(),
            rule,
            regex,
        })
    }

    fn weight(&self) -> f32 {
        self.rule.weight.unwrap_or(1.0)
    }

    fn describe(&self) -> String {
        match self.rule.rule_type {
            DetectionType::Presence => format!("presence:{}", self.rule.manifest),
            other => format!("{}:{}", other.as_str(), self.rule.pattern),
        }
    }
}

/// Evidence for why a framework was detected
#[derive(Debug, Clone)]
pub struct DetectionEvidence {
    /// Framework name
    pub framework: String,
    /// Detection rule that matched
    pub rule: String,
    /// Confidence contributed by this rule
    pub confidence: f32,
    /// What matched
    pub context: Option<String>,
}

/// Detection result for a single framework
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Framework name
    pub framework: String,
    /// Total confidence score (capped at 1.0)
    pub confidence: f32,
    /// List of evidence
    pub evidence: Vec<DetectionEvidence>,
}

/// Manifest-driven framework detector
#[derive(Debug, Default)]
pub struct FrameworkDetector {
    manifests: Vec<CompiledManifest>,
    /// Compiled rules keyed by manifest name
    rules: HashMap<String, Vec<CompiledDetectionRule>>,
    /// Framework priorities (higher = listed first)
    priorities: HashMap<String, u32>,
    /// Framework suppression rules (framework -> suppressed frameworks)
    suppresses: HashMap<String, Vec<String>>,
}

impl FrameworkDetector {
    /// Empty detector with no manifests
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a detector from TOML rule files.
    ///
    /// Manifests from every file are registered before any framework, so a
    /// rule may reference a manifest declared in another file.
    pub fn from_toml_files(toml_files: Vec<(String, &str)>) -> Result<Self> {
        let mut files = Vec::with_capacity(toml_files.len());
        for (_name, toml_content) in toml_files {
            let file: RuleFile = toml::from_str(toml_content)?;
            files.push(file);
        }

        let mut detector = Self::new();
        for file in &files {
            for manifest in &file.manifests {
                detector.register_manifest(manifest)?;
            }
        }
        for file in &files {
            for framework in &file.frameworks {
                detector.register_framework(framework)?;
            }
        }

        Ok(detector)
    }

    /// Register every manifest and framework of one rule file
    pub fn register_rule_file(&mut self, file: &RuleFile) -> Result<()> {
        for manifest in &file.manifests {
            self.register_manifest(manifest)?;
        }
        for framework in &file.frameworks {
            self.register_framework(framework)?;
        }
        Ok(())
    }

    /// Read and register a rule file from disk
    pub fn load_rule_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path).map_err(|source| RuleError::LoadError {
            path: path.display().to_string(),
            source,
        })?;
        let file: RuleFile = toml::from_str(&contents)?;
        self.register_rule_file(&file)?;
        tracing::debug!(
            path = %path.display(),
            manifests = file.manifests.len(),
            frameworks = file.frameworks.len(),
            "Loaded rule file"
        );
        Ok(())
    }

    /// Register one manifest definition
    pub fn register_manifest(&mut self, definition: &ManifestDefinition) -> Result<()> {
        if self.manifests.iter().any(|m| m.name == definition.name) {
            return Err(RuleError::DuplicateManifest(definition.name.clone()));
        }
        self.manifests.push(CompiledManifest::compile(definition)?);
        Ok(())
    }

    /// Register one framework and its rules.
    ///
    /// Registering a framework name again adds its rules to the existing
    /// ones and keeps the higher priority.
    pub fn register_framework(&mut self, definition: &FrameworkDefinition) -> Result<()> {
        let mut compiled = Vec::with_capacity(definition.detection.len());
        for rule in &definition.detection {
            if !self.manifests.iter().any(|m| m.name == rule.manifest) {
                return Err(RuleError::UnknownManifest {
                    manifest: rule.manifest.clone(),
                    framework: definition.name.clone(),
                });
            }
            compiled.push(CompiledDetectionRule::compile(&definition.name, rule.clone())?);
        }

        for rule in compiled {
            self.rules.entry(rule.rule.manifest.clone()).or_default().push(rule);
        }

        let priority = definition.priority.unwrap_or(DEFAULT_PRIORITY);
        self.priorities
            .entry(definition.name.clone())
            .and_modify(|p| *p = (*p).max(priority))
            .or_insert(priority);

        if !definition.suppresses.is_empty() {
            self.suppresses
                .entry(definition.name.clone())
                .or_default()
                .extend(definition.suppresses.iter().cloned());
        }

        Ok(())
    }

    /// Whether `file_name` is recognised as any registered manifest
    pub fn is_manifest(&self, file_name: &str) -> bool {
        self.manifests.iter().any(|m| m.matches(file_name))
    }

    /// Names of the manifests `file_name` is recognised as
    pub fn manifest_kinds(&self, file_name: &str) -> Vec<&str> {
        self.manifests
            .iter()
            .filter(|m| m.matches(file_name))
            .map(|m| m.name.as_str())
            .collect()
    }

    pub fn manifest_count(&self) -> usize {
        self.manifests.len()
    }

    pub fn framework_count(&self) -> usize {
        self.priorities.len()
    }

    /// Every label this detector can report, sorted
    pub fn labels(&self) -> BTreeSet<&str> {
        self.priorities.keys().map(String::as_str).collect()
    }

    /// Labels detected in one manifest. Malformed contents yield no labels.
    pub fn detect(&self, file_name: &str, contents: &str) -> BTreeSet<String> {
        self.detect_with_evidence(file_name, contents)
            .into_iter()
            .map(|result| result.framework)
            .collect()
    }

    /// Detection results with evidence, ordered by priority then confidence
    pub fn detect_with_evidence(&self, file_name: &str, contents: &str) -> Vec<DetectionResult> {
        let mut results: HashMap<String, DetectionResult> = HashMap::new();

        for manifest in self.manifests.iter().filter(|m| m.matches(file_name)) {
            let Some(rules) = self.rules.get(&manifest.name) else {
                continue;
            };

            let dependencies = match manifest.parser.dependencies(contents) {
                Ok(dependencies) => dependencies,
                Err(error) => {
                    tracing::debug!(
                        file = file_name,
                        manifest = %manifest.name,
                        %error,
                        "Skipping malformed manifest"
                    );
                    continue;
                }
            };

            for rule in rules {
                let context = match rule.rule.rule_type {
                    DetectionType::Presence => Some(format!("file: {}", file_name)),
                    DetectionType::Dependency => rule.regex.as_ref().and_then(|regex| {
                        dependencies
                            .iter()
                            .find(|dep| regex.is_match(dep))
                            .map(|dep| format!("dependency: {}", dep))
                    }),
                    DetectionType::Content => rule.regex.as_ref().and_then(|regex| {
                        regex
                            .find(contents)
                            .map(|m| format!("content: {}", truncate(m.as_str())))
                    }),
                };

                let Some(context) = context else {
                    continue;
                };

                results
                    .entry(rule.framework.clone())
                    .or_insert_with(|| DetectionResult {
                        framework: rule.framework.clone(),
                        confidence: 0.0,
                        evidence: Vec::new(),
                    })
                    .evidence
                    .push(DetectionEvidence {
                        framework: rule.framework.clone(),
                        rule: rule.describe(),
                        confidence: rule.weight(),
                        context: Some(context),
                    });
            }
        }

        self.finalize_results(results)
    }

    /// Finalize detection results: calculate confidence, apply suppression, and sort
    fn finalize_results(&self, mut results: HashMap<String, DetectionResult>) -> Vec<DetectionResult> {
        for result in results.values_mut() {
            result.confidence = result
                .evidence
                .iter()
                .map(|e| e.confidence)
                .sum::<f32>()
                .min(1.0);
        }

        let mut final_results: Vec<DetectionResult> = results.into_values().collect();
        self.apply_suppression(&mut final_results);

        final_results.sort_by(|a, b| {
            let priority_a = self.priorities.get(&a.framework).copied().unwrap_or(0);
            let priority_b = self.priorities.get(&b.framework).copied().unwrap_or(0);
            priority_b
                .cmp(&priority_a)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
                .then_with(|| a.framework.cmp(&b.framework))
        });

        final_results
    }

    /// Apply suppression rules (e.g., Spring Boot suppresses Spring Framework)
    fn apply_suppression(&self, results: &mut Vec<DetectionResult>) {
        let suppressed: HashSet<String> = results
            .iter()
            .filter_map(|r| self.suppresses.get(&r.framework))
            .flatten()
            .cloned()
            .collect();

        results.retain(|r| !suppressed.contains(&r.framework));
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_CONTEXT_LEN) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NPM: &str = r#"
        [[manifest]]
        name = "npm"
        file_names = ["package.json"]
        format = "json"
        sections = ["dependencies", "devDependencies"]
    "#;

    #[test]
    fn test_detect_dependency() {
        let rules = r#"
            [[framework]]
            name = "React"

            [[framework.detection]]
            type = "dependency"
            manifest = "npm"
            pattern = "^react$"
        "#;

        let detector = FrameworkDetector::from_toml_files(vec![
            ("npm".to_string(), NPM),
            ("react".to_string(), rules),
        ])
        .unwrap();

        let labels = detector.detect("package.json", r#"{"dependencies": {"react": "18", "react-dom": "18"}}"#);
        assert_eq!(labels.into_iter().collect::<Vec<_>>(), vec!["React"]);
    }

    #[test]
    fn test_file_name_is_case_insensitive() {
        let detector = FrameworkDetector::from_toml_files(vec![("npm".to_string(), NPM)]).unwrap();
        assert!(detector.is_manifest("Package.JSON"));
        assert!(!detector.is_manifest("package.json.bak"));
    }

    #[test]
    fn test_suppression() {
        let rules = r#"
            [[manifest]]
            name = "maven"
            file_names = ["pom.xml"]
            format = "xml"
            sections = ["artifactId"]

            [[framework]]
            name = "Spring Boot"
            priority = 80
            suppresses = ["Spring Framework"]

            [[framework.detection]]
            type = "dependency"
            manifest = "maven"
            pattern = "^spring-boot-starter"

            [[framework]]
            name = "Spring Framework"

            [[framework.detection]]
            type = "dependency"
            manifest = "maven"
            pattern = "^spring-(core|context)"
        "#;

        let detector = FrameworkDetector::from_toml_files(vec![("jvm".to_string(), rules)]).unwrap();
        let pom = "<project><artifactId>spring-boot-starter-web</artifactId><artifactId>spring-core</artifactId></project>";
        let labels = detector.detect("pom.xml", pom);
        assert!(labels.contains("Spring Boot"));
        assert!(!labels.contains("Spring Framework"));

        let plain = "<project><artifactId>spring-core</artifactId></project>";
        assert!(detector.detect("pom.xml", plain).contains("Spring Framework"));
    }

    #[test]
    fn test_malformed_manifest_yields_nothing() {
        let rules = r#"
            [[framework]]
            name = "React"

            [[framework.detection]]
            type = "dependency"
            manifest = "npm"
            pattern = "^react$"

            [[framework.detection]]
            type = "content"
            manifest = "npm"
            pattern = "react"
        "#;

        let detector = FrameworkDetector::from_toml_files(vec![
            ("npm".to_string(), NPM),
            ("react".to_string(), rules),
        ])
        .unwrap();

        assert!(detector.detect("package.json", "{ \"dependencies\": { \"react\"").is_empty());
    }

    #[test]
    fn test_unknown_manifest_rejected() {
        let rules = r#"
            [[framework]]
            name = "Rails"

            [[framework.detection]]
            type = "dependency"
            manifest = "bundler"
            pattern = "^rails$"
        "#;

        let err = FrameworkDetector::from_toml_files(vec![("ruby".to_string(), rules)]).unwrap_err();
        assert!(matches!(err, RuleError::UnknownManifest { .. }));
    }

    #[test]
    fn test_duplicate_manifest_rejected() {
        let err = FrameworkDetector::from_toml_files(vec![
            ("a".to_string(), NPM),
            ("b".to_string(), NPM),
        ])
        .unwrap_err();
        assert!(matches!(err, RuleError::DuplicateManifest(name) if name == "npm"));
    }

    #[test]
    fn test_pattern_too_long() {
        let rule = DetectionRule {
            rule_type: DetectionType::Content,
            manifest: "npm".into(),
            pattern: "a".repeat(MAX_REGEX_LEN + 1),
            weight: None,
        };
        assert!(CompiledDetectionRule::compile("Long", rule).is_err());
    }

    #[test]
    fn test_invalid_weight() {
        let rule = DetectionRule {
            rule_type: DetectionType::Presence,
            manifest: "npm".into(),
            pattern: String::new(),
            weight: Some(f32::NAN),
        };
        assert!(CompiledDetectionRule::compile("Nan", rule).is_err());
    }

    #[test]
    fn test_confidence_capped_and_ordered() {
        let rules = r#"
            [[framework]]
            name = "Next.js"
            priority = 90

            [[framework.detection]]
            type = "dependency"
            manifest = "npm"
            pattern = "^next$"
            weight = 0.8

            [[framework.detection]]
            type = "content"
            manifest = "npm"
            pattern = "next build"
            weight = 0.8

            [[framework]]
            name = "Jest"
            priority = 10

            [[framework.detection]]
            type = "dependency"
            manifest = "npm"
            pattern = "^jest$"
            weight = 0.5
        "#;

        let detector = FrameworkDetector::from_toml_files(vec![
            ("npm".to_string(), NPM),
            ("js".to_string(), rules),
        ])
        .unwrap();

        let package = r#"{
            "scripts": {"build": "next build"},
            "dependencies": {"next": "14"},
            "devDependencies": {"jest": "29"}
        }"#;
        let results = detector.detect_with_evidence("package.json", package);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].framework, "Next.js");
        assert_eq!(results[0].confidence, 1.0);
        assert_eq!(results[0].evidence.len(), 2);
        assert_eq!(results[1].framework, "Jest");
        assert_eq!(results[1].confidence, 0.5);
    }
}
