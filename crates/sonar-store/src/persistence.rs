//! Reading and writing the cache document.
//!
//! Writes go to a temporary file first. The current cache is then copied to
//! the rolling backup and the temporary file renamed over it, so a crash at
//! any point leaves either the old or the new document in place.

use crate::error::StorageCorruption;
use crate::Result;
use serde::Serialize;
use sonar_core::AnalysisState;
use sonar_fs::FileSystem;
use std::io;
use std::path::{Path, PathBuf};

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".discovery_cache";

/// Default cache file name inside the cache directory
pub const DEFAULT_CACHE_FILE: &str = "discovery_cache.json";

/// Where a loaded state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    /// The current cache file
    Primary,
    /// The rolling backup, after the primary failed
    Backup,
    /// Nothing usable was found
    Fresh,
}

impl std::fmt::Display for LoadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadSource::Primary => f.write_str("primary"),
            LoadSource::Backup => f.write_str("backup"),
            LoadSource::Fresh => f.write_str("fresh"),
        }
    }
}

/// File names used inside the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFiles {
    pub cache: PathBuf,
    pub backup: PathBuf,
    pub temp: PathBuf,
    /// A corrupt primary is moved here before recovery
    pub quarantine: PathBuf,
}

impl CacheFiles {
    pub fn new(cache_name: &str) -> Self {
        Self {
            cache: PathBuf::from(cache_name),
            backup: PathBuf::from(format!("{cache_name}.backup")),
            temp: PathBuf::from(format!("{cache_name}.tmp")),
            quarantine: PathBuf::from(format!("{cache_name}.corrupt")),
        }
    }
}

impl Default for CacheFiles {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_FILE)
    }
}

/// Load the primary file, then the backup, then an empty state.
///
/// Never fails: unusable files are logged and skipped. Only a primary that
/// reads but does not parse is moved aside; one that cannot be read stays put.
pub(crate) async fn load<F: FileSystem + ?Sized>(
    fs: &F,
    files: &CacheFiles,
) -> (AnalysisState, LoadSource) {
    let primary_failed = match read_state(fs, &files.cache).await {
        Ok(Some(state)) => return (state, LoadSource::Primary),
        Ok(None) => false,
        Err(ReadFailure::Unreadable(error)) => {
            tracing::warn!(
                cache = %files.cache.display(),
                %error,
                "Discovery cache could not be read, trying backup"
            );
            true
        }
        Err(ReadFailure::Corrupt(corruption)) => {
            tracing::warn!(%corruption, "Discovery cache is corrupt, trying backup");
            quarantine(fs, files).await;
            true
        }
    };

    match read_state(fs, &files.backup).await {
        Ok(Some(state)) => {
            tracing::warn!(
                backup = %files.backup.display(),
                "Recovered discovery state from backup"
            );
            return (state, LoadSource::Backup);
        }
        Ok(None) if primary_failed => {
            tracing::warn!("No backup available, starting with empty discovery state");
        }
        Ok(None) => {
            tracing::debug!("No discovery cache found, starting with empty state");
        }
        Err(ReadFailure::Unreadable(error)) => {
            tracing::warn!(%error, "Backup could not be read, starting with empty discovery state");
        }
        Err(ReadFailure::Corrupt(corruption)) => {
            tracing::warn!(%corruption, "Backup is corrupt, starting with empty discovery state");
        }
    }

    (AnalysisState::default(), LoadSource::Fresh)
}

/// Write `state` through the temp file, rotating the current file into the backup.
pub(crate) async fn save<F: FileSystem + ?Sized>(
    fs: &F,
    files: &CacheFiles,
    state: &AnalysisState,
) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;

    if let Err(error) = write_rotating(fs, files, &json).await {
        if fs.exists(&files.temp).await.unwrap_or(false) {
            let _ = fs.remove_file(&files.temp).await;
        }
        return Err(error.into());
    }

    tracing::debug!(
        cache = %files.cache.display(),
        bytes = json.len(),
        repositories = state.repositories.len(),
        "Saved discovery state"
    );
    Ok(())
}

async fn write_rotating<F: FileSystem + ?Sized>(
    fs: &F,
    files: &CacheFiles,
    json: &str,
) -> io::Result<()> {
    fs.write(&files.temp, json).await?;
    if fs.exists(&files.cache).await? {
        fs.copy(&files.cache, &files.backup).await?;
    }
    fs.rename(&files.temp, &files.cache).await
}

/// Why a cache file that exists could not be loaded.
enum ReadFailure {
    /// The file could not be read at all
    Unreadable(io::Error),
    /// The file was read but is not a valid state document
    Corrupt(StorageCorruption),
}

async fn read_state<F: FileSystem + ?Sized>(
    fs: &F,
    path: &Path,
) -> std::result::Result<Option<AnalysisState>, ReadFailure> {
    let contents = match fs.read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ReadFailure::Unreadable(e)),
    };

    serde_json::from_str(&contents).map(Some).map_err(|e| {
        ReadFailure::Corrupt(StorageCorruption {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    })
}

/// Move a corrupt primary aside so the next save does not rotate it into the backup.
async fn quarantine<F: FileSystem + ?Sized>(fs: &F, files: &CacheFiles) {
    if let Err(error) = fs.rename(&files.cache, &files.quarantine).await {
        tracing::warn!(%error, "Could not move corrupt cache aside");
    }
}
