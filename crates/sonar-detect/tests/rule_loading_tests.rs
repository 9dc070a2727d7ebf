//! Rule loading and hardening tests for sonar-detect
//!
//! These tests verify:
//! - Extra rule files extend the built-in registry
//! - Broken rule files are rejected with a useful error
//! - Pathological patterns and inputs stay fast

use sonar_detect::{FrameworkDetector, RuleError};
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_extra_rule_file_extends_built_in() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("internal.toml");
    fs::write(
        &path,
        r#"
            [ecosystem]
            name = "Internal"

            [[manifest]]
            name = "platform_descriptor"
            file_names = ["platform.json"]
            format = "json"
            sections = ["runtime"]

            [[framework]]
            name = "Acme Platform"

            [[framework.detection]]
            type = "dependency"
            manifest = "platform_descriptor"
            pattern = "^acme-"

            # New rules may target built-in manifests
            [[framework]]
            name = "Acme UI Kit"

            [[framework.detection]]
            type = "dependency"
            manifest = "npm"
            pattern = "^@acme/ui$"
        "#,
    )
    .unwrap();

    let mut detector = FrameworkDetector::built_in().unwrap();
    let before = detector.framework_count();
    detector.load_rule_file(&path).unwrap();
    assert_eq!(detector.framework_count(), before + 2);

    let labels = detector.detect("platform.json", r#"{"runtime": {"acme-jvm": "2"}}"#);
    assert!(labels.contains("Acme Platform"));

    let labels = detector.detect("package.json", r#"{"dependencies": {"@acme/ui": "1", "react": "18"}}"#);
    assert!(labels.contains("Acme UI Kit"));
    assert!(labels.contains("React"));
}

#[test]
fn test_missing_rule_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut detector = FrameworkDetector::new();
    let err = detector
        .load_rule_file(&temp_dir.path().join("absent.toml"))
        .unwrap_err();
    assert!(matches!(err, RuleError::LoadError { .. }));
}

#[test]
fn test_invalid_toml_rule_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[[framework]\nname = ").unwrap();

    let mut detector = FrameworkDetector::new();
    assert!(matches!(
        detector.load_rule_file(&path).unwrap_err(),
        RuleError::TomlError(_)
    ));
}

#[test]
fn test_invalid_regex_rejected() {
    let rules = r#"
        [[manifest]]
        name = "pip"
        file_names = ["requirements.txt"]
        format = "lines"

        [[framework]]
        name = "Broken"

        [[framework.detection]]
        type = "dependency"
        manifest = "pip"
        pattern = "(unclosed"
    "#;

    let err = FrameworkDetector::from_toml_files(vec![("broken".to_string(), rules)]).unwrap_err();
    assert!(matches!(err, RuleError::RegexError(_)));
}

#[test]
fn test_content_rule_requires_pattern() {
    let rules = r#"
        [[manifest]]
        name = "docker"
        file_names = ["Dockerfile"]

        [[framework]]
        name = "Empty"

        [[framework.detection]]
        type = "content"
        manifest = "docker"
    "#;

    let err = FrameworkDetector::from_toml_files(vec![("empty".to_string(), rules)]).unwrap_err();
    assert!(matches!(err, RuleError::InvalidPattern(_)));
}

// ============================================================================
// Hardening
// ============================================================================

#[test]
fn test_nested_quantifier_pattern_is_linear() {
    let rules = r#"
        [[manifest]]
        name = "text"
        file_names = ["input.txt"]

        [[framework]]
        name = "Backtrack"

        [[framework.detection]]
        type = "content"
        manifest = "text"
        pattern = "(a+)+b"
    "#;

    let detector = FrameworkDetector::from_toml_files(vec![("text".to_string(), rules)]).unwrap();
    let input = "a".repeat(100_000);

    let start = Instant::now();
    let labels = detector.detect("input.txt", &input);
    assert!(labels.is_empty());
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_large_manifest_is_handled() {
    let detector = FrameworkDetector::built_in().unwrap();
    let mut requirements = String::new();
    for i in 0..20_000 {
        requirements.push_str(&format!("package-{}==1.0\n", i));
    }
    requirements.push_str("flask\n");

    let start = Instant::now();
    let labels = detector.detect("requirements.txt", &requirements);
    assert!(labels.contains("Flask"));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_binary_garbage_is_tolerated() {
    let detector = FrameworkDetector::built_in().unwrap();
    let garbage: String = (0u32..2048)
        .filter_map(|i| char::from_u32((i * 7919) % 0xD000))
        .collect();

    for manifest in ["package.json", "pom.xml", "Cargo.toml", "go.mod", "Gemfile", "app.csproj"] {
        let _ = detector.detect(manifest, &garbage);
    }
}

// ============================================================================
// Built-in manifests
// ============================================================================

#[test]
fn test_pom_with_arrow_in_description() {
    let detector = FrameworkDetector::built_in().unwrap();
    let pom = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <artifactId>router</artifactId>
  <description>Routes a -> b</description>
  <dependencies>
    <dependency>
      <groupId>org.springframework.boot</groupId>
      <artifactId>spring-boot-starter-web</artifactId>
    </dependency>
  </dependencies>
</project>"#;

    let labels = detector.detect("pom.xml", pom);
    assert!(labels.contains("Spring Boot"), "labels: {:?}", labels);
}

#[test]
fn test_pom_commented_dependency_ignored() {
    let detector = FrameworkDetector::built_in().unwrap();
    let pom = r#"<project>
  <artifactId>legacy</artifactId>
  <dependencies>
    <!--
    <dependency>
      <groupId>org.springframework.boot</groupId>
      <artifactId>spring-boot-starter-web</artifactId>
    </dependency>
    -->
  </dependencies>
</project>"#;

    let labels = detector.detect("pom.xml", pom);
    assert!(!labels.contains("Spring Boot"), "labels: {:?}", labels);
}

#[test]
fn test_csproj_package_references() {
    let detector = FrameworkDetector::built_in().unwrap();
    let csproj = r#"<Project Sdk="Microsoft.NET.Sdk.Web">
  <ItemGroup>
    <PackageReference Include="Microsoft.EntityFrameworkCore" Version="8.0.0" />
  </ItemGroup>
</Project>"#;

    let labels = detector.detect("api.csproj", csproj);
    assert!(labels.contains("ASP.NET Core"), "labels: {:?}", labels);
    assert!(labels.contains("Entity Framework"), "labels: {:?}", labels);
}
