//! Sonar Config - `sonar.toml` loading and saving.
//!
//! ```toml
//! [scan]
//! repos_path = "/srv/repos"
//! worker_count = 4
//! ignore_patterns = ["**/fixtures/**"]
//!
//! [storage]
//! cache_dir = ".discovery_cache"
//!
//! [validation]
//! max_appropriate = 15
//!
//! [rules]
//! extra_rule_files = ["rules/internal.toml"]
//! ```

pub mod manager;
pub mod types;

pub use manager::{validate, ConfigError, ConfigManager, ConfigSource, LOCAL_CONFIG_FILE};
pub use types::{RuleSettings, ScanSettings, SonarConfig, StorageSettings};
