//! Sonar Detect - manifest-driven framework detection
//!
//! A declarative registry maps manifest files (package.json, pom.xml,
//! requirements.txt, ...) to technology labels without hardcoded
//! conditionals. Adding an ecosystem is a new TOML rule file.
//!
//! # Architecture
//!
//! - **Manifests**: which file names are manifests and how to parse them
//! - **Frameworks**: dependency, content and presence rules producing labels
//! - **Built-in rules**: embedded at compile time, extendable at runtime
//!
//! # Example
//!
//! ```
//! use sonar_detect::FrameworkDetector;
//!
//! let detector = FrameworkDetector::built_in().unwrap();
//! let labels = detector.detect("requirements.txt", "fastapi==0.110\nuvicorn\n");
//! assert!(labels.contains("FastAPI"));
//! ```

pub mod built_in;
pub mod detection;
pub mod parser;
pub mod rule_file;

pub use built_in::load_built_in_toml_files;
pub use detection::{CompiledDetectionRule, DetectionEvidence, DetectionResult, FrameworkDetector};
pub use parser::{requirement_name, ManifestParser, ParseError};
pub use rule_file::{
    DetectionRule, DetectionType, EcosystemMetadata, FrameworkDefinition, ManifestDefinition,
    ManifestFormat, RuleFile,
};

/// Result type for rule operations
pub type Result<T> = std::result::Result<T, RuleError>;

/// Error types for the detection registry
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Failed to load rules from {path}: {source}")]
    LoadError {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Manifest '{0}' is registered twice")]
    DuplicateManifest(String),

    #[error("Framework '{framework}' references unknown manifest '{manifest}'")]
    UnknownManifest { manifest: String, framework: String },
}
