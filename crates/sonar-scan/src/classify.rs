//! Repository type classification from the scanned file mix.

use sonar_core::{language_for_extension, RepositoryType};
use std::collections::{BTreeMap, BTreeSet};

const DOC_EXTENSIONS: &[&str] = &[".md", ".rst", ".adoc", ".txt", ".pdf", ".docx", ".html", ".htm"];

const CONFIG_EXTENSIONS: &[&str] = &[
    ".yml", ".yaml", ".json", ".toml", ".xml", ".ini", ".cfg", ".conf", ".properties", ".env",
    ".tf", ".tfvars", ".hcl",
];

/// Files and directories that mark a deployable service.
const DEPLOYMENT_MARKERS: &[&str] = &["dockerfile", "docker-compose", "compose.y", "procfile"];

/// Orchestration descriptors.
const ORCHESTRATION_MARKERS: &[&str] = &[
    "chart.yaml",
    "serverless.y",
    "k8s/",
    "kubernetes/",
    "helm/",
    "kustomization.y",
    "function.json",
    "skaffold.yaml",
];

/// Package manifests that mark a publishable library.
const PACKAGE_MARKERS: &[&str] = &[
    "cargo.toml",
    "package.json",
    "setup.py",
    "pyproject.toml",
    "pom.xml",
    "build.gradle",
    ".gemspec",
    ".csproj",
    "composer.json",
    "go.mod",
];

/// Labels for frameworks that serve traffic.
const SERVICE_FRAMEWORKS: &[&str] = &[
    "ASP.NET Core",
    "Actix",
    "Axum",
    "Django",
    "Dropwizard",
    "Echo",
    "Express.js",
    "FastAPI",
    "Fastify",
    "Fiber",
    "Flask",
    "Gin",
    "Hapi",
    "Koa",
    "Laravel",
    "Micronaut",
    "NestJS",
    "Quarkus",
    "Rocket",
    "Ruby on Rails",
    "Sinatra",
    "Spring Boot",
    "Symfony",
    "Warp",
    "Azure Functions",
    "AWS Lambda",
    "Serverless Framework",
];

/// Everything the classifier looks at.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryProfile<'a> {
    /// Raw per-extension counts, before folding into the top-N histogram
    pub extension_counts: &'a BTreeMap<String, u64>,
    pub total_files: u64,
    /// Recognised config files, relative paths with `/` separators
    pub config_files: &'a [String],
    pub frameworks: &'a BTreeSet<String>,
    pub has_readme: bool,
}

/// Classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub repository_type: RepositoryType,
    /// 0.0 to 1.0
    pub confidence: f64,
}

impl Classification {
    fn new(repository_type: RepositoryType, confidence: f64) -> Self {
        Self {
            repository_type,
            confidence: confidence.clamp(0.0, 0.95),
        }
    }
}

/// Guess what kind of repository this is.
pub fn classify(profile: &RepositoryProfile<'_>) -> Classification {
    if profile.total_files == 0 {
        return Classification::new(RepositoryType::Unknown, 0.0);
    }

    let doc_ratio = share(profile, |ext| DOC_EXTENSIONS.contains(&ext));
    let config_ratio = share(profile, |ext| CONFIG_EXTENSIONS.contains(&ext));
    let source_ratio = share(profile, |ext| language_for_extension(ext).is_some() && ext != ".tf");

    let deployment = has_marker(profile.config_files, DEPLOYMENT_MARKERS);
    let orchestration = has_marker(profile.config_files, ORCHESTRATION_MARKERS);
    let service_framework = profile
        .frameworks
        .iter()
        .any(|label| SERVICE_FRAMEWORKS.contains(&label.as_str()));
    let package = has_marker(profile.config_files, PACKAGE_MARKERS);

    if source_ratio == 0.0 {
        if doc_ratio >= 0.5 {
            return Classification::new(RepositoryType::Documentation, 0.5 + doc_ratio / 2.0);
        }
        if config_ratio >= 0.5 || orchestration {
            return Classification::new(RepositoryType::Config, 0.5 + config_ratio / 2.0);
        }
        return Classification::new(RepositoryType::Unknown, 0.2);
    }

    if doc_ratio >= 0.7 {
        return Classification::new(RepositoryType::Documentation, doc_ratio);
    }

    if config_ratio >= 0.6 && source_ratio < 0.2 && !service_framework {
        return Classification::new(RepositoryType::Config, config_ratio);
    }

    let service_signals = [deployment, orchestration, service_framework]
        .iter()
        .filter(|signal| **signal)
        .count();
    if service_signals > 0 {
        return Classification::new(
            RepositoryType::Microservice,
            0.6 + 0.1 * service_signals as f64 + if profile.has_readme { 0.05 } else { 0.0 },
        );
    }

    if package {
        return Classification::new(
            RepositoryType::Library,
            0.6 + if profile.has_readme { 0.1 } else { 0.0 },
        );
    }

    Classification::new(RepositoryType::Unknown, 0.3)
}

/// Fraction of files whose extension satisfies `predicate`.
fn share(profile: &RepositoryProfile<'_>, predicate: impl Fn(&str) -> bool) -> f64 {
    let count: u64 = profile
        .extension_counts
        .iter()
        .filter(|(ext, _)| predicate(ext.as_str()))
        .map(|(_, count)| *count)
        .sum();
    count as f64 / profile.total_files as f64
}

/// Whether any config file matches a marker. Markers ending in `/` match
/// directory prefixes, the rest match within the file name.
fn has_marker(config_files: &[String], markers: &[&str]) -> bool {
    config_files.iter().any(|file| {
        let lower = file.to_lowercase();
        let name = lower.rsplit('/').next().unwrap_or(&lower);
        markers.iter().any(|marker| {
            if marker.ends_with('/') {
                lower.starts_with(marker)
            } else {
                name.contains(marker)
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(ext, n)| (ext.to_string(), *n)).collect()
    }

    fn run(pairs: &[(&str, u64)], config_files: &[&str], frameworks: &[&str]) -> Classification {
        let extension_counts = counts(pairs);
        let total_files = extension_counts.values().sum();
        let config_files: Vec<String> = config_files.iter().map(|s| s.to_string()).collect();
        let frameworks: BTreeSet<String> = frameworks.iter().map(|s| s.to_string()).collect();
        classify(&RepositoryProfile {
            extension_counts: &extension_counts,
            total_files,
            config_files: &config_files,
            frameworks: &frameworks,
            has_readme: true,
        })
    }

    #[test]
    fn test_microservice() {
        let c = run(&[(".java", 40), (".xml", 2)], &["pom.xml", "Dockerfile"], &["Spring Boot"]);
        assert_eq!(c.repository_type, RepositoryType::Microservice);
        assert!(c.confidence > 0.8);
    }

    #[test]
    fn test_library() {
        let c = run(&[(".rs", 12), (".toml", 1), (".md", 1)], &["Cargo.toml"], &[]);
        assert_eq!(c.repository_type, RepositoryType::Library);
    }

    #[test]
    fn test_documentation() {
        let c = run(&[(".md", 30), (".png", 5)], &[], &[]);
        assert_eq!(c.repository_type, RepositoryType::Documentation);
    }

    #[test]
    fn test_config() {
        let c = run(&[(".yaml", 20), (".json", 3)], &["helm/"], &[]);
        assert_eq!(c.repository_type, RepositoryType::Config);

        let c = run(&[(".yaml", 20), (".sh", 1)], &[], &[]);
        assert_eq!(c.repository_type, RepositoryType::Config);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(run(&[], &[], &[]).repository_type, RepositoryType::Unknown);
        assert_eq!(run(&[(".py", 3)], &[], &[]).repository_type, RepositoryType::Unknown);
    }

    #[test]
    fn test_confidence_bounds() {
        let c = run(&[(".md", 100)], &[], &[]);
        assert!(c.confidence <= 0.95);
    }
}
