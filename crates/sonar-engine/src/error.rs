//! Error types for the discovery engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A state operation was rejected or the cache could not be written
    #[error(transparent)]
    Store(#[from] sonar_store::StoreError),

    /// Scanner setup failed (the repositories themselves fail individually)
    #[error(transparent)]
    Scan(#[from] sonar_scan::ScanError),

    /// Framework rules could not be loaded
    #[error("Framework rules: {0}")]
    Rules(#[from] sonar_detect::RuleError),

    /// A report could not be built
    #[error(transparent)]
    Report(#[from] sonar_report::ReportError),

    /// Lookup of an unknown repository or component
    #[error(transparent)]
    State(#[from] sonar_core::Error),

    /// The repositories root could not be listed
    #[error("Cannot list repositories under {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Whether the error is a not-found condition on a repository or component
    pub fn is_not_found(&self) -> bool {
        match self {
            EngineError::Store(e) => e.is_not_found(),
            EngineError::State(e) => e.is_not_found(),
            _ => false,
        }
    }
}
