use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why one repository could not be scanned.
///
/// Scan errors are isolated per repository: the coordinator records them and
/// carries on with the rest of the batch.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("repository root {0} does not exist")]
    RootMissing(PathBuf),

    #[error("repository root {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("repository root {path} is unreadable: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid ignore pattern '{pattern}': {message}")]
    InvalidIgnorePattern { pattern: String, message: String },

    #[error("scan of {name} aborted: {message}")]
    Aborted { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, ScanError>;
