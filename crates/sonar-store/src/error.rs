use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`AnalysisStateStore`](crate::AnalysisStateStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A state mutation was rejected (unknown name, duplicate, invalid input).
    #[error(transparent)]
    State(#[from] sonar_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid file name '{0}': must be a plain file name")]
    InvalidFileName(String),
}

impl StoreError {
    /// Whether the error is a not-found condition on a repository or component.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::State(e) if e.is_not_found())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A cache file that was read but is not a valid state document.
///
/// Never leaves the crate: loading recovers from the backup or starts fresh.
#[derive(Debug, Error)]
#[error("Cache file {path} is unusable: {reason}")]
pub(crate) struct StorageCorruption {
    pub(crate) path: PathBuf,
    pub(crate) reason: String,
}
