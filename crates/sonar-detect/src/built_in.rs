//! Built-in detection rules embedded in the binary
//!
//! One TOML file per ecosystem, embedded at compile time via `include_str!()`
//! for zero-config defaults. Extra rule files can be registered on top.

use crate::{FrameworkDetector, Result};

/// npm manifests and JavaScript build tooling
pub const JAVASCRIPT_RULES: &str = include_str!("built_in/javascript.toml");

/// pip, Pipenv, Poetry and setuptools
pub const PYTHON_RULES: &str = include_str!("built_in/python.toml");

/// Maven and Gradle
pub const JVM_RULES: &str = include_str!("built_in/jvm.toml");

/// MSBuild projects and NuGet
pub const DOTNET_RULES: &str = include_str!("built_in/dotnet.toml");

/// Go modules
pub const GO_RULES: &str = include_str!("built_in/go.toml");

/// Cargo
pub const RUST_RULES: &str = include_str!("built_in/rust.toml");

/// Composer
pub const PHP_RULES: &str = include_str!("built_in/php.toml");

/// Bundler and gemspecs
pub const RUBY_RULES: &str = include_str!("built_in/ruby.toml");

/// Containers, CI, infrastructure as code, serverless
pub const INFRASTRUCTURE_RULES: &str = include_str!("built_in/infrastructure.toml");

/// dbt, notebooks, Flutter
pub const DATA_RULES: &str = include_str!("built_in/data.toml");

/// All built-in rule files as (name, toml_content) pairs, suitable for
/// [`FrameworkDetector::from_toml_files`].
pub fn load_built_in_toml_files() -> Vec<(String, &'static str)> {
    vec![
        ("javascript".to_string(), JAVASCRIPT_RULES),
        ("python".to_string(), PYTHON_RULES),
        ("jvm".to_string(), JVM_RULES),
        ("dotnet".to_string(), DOTNET_RULES),
        ("go".to_string(), GO_RULES),
        ("rust".to_string(), RUST_RULES),
        ("php".to_string(), PHP_RULES),
        ("ruby".to_string(), RUBY_RULES),
        ("infrastructure".to_string(), INFRASTRUCTURE_RULES),
        ("data".to_string(), DATA_RULES),
    ]
}

impl FrameworkDetector {
    /// Detector loaded with every built-in rule file
    pub fn built_in() -> Result<Self> {
        Self::from_toml_files(load_built_in_toml_files())
    }
}
