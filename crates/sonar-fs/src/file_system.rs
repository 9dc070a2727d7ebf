//! FileSystem trait for rooted, async filesystem operations.

use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Metadata for a path, present or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Whether the path exists.
    pub exists: bool,
    /// Whether the path is a regular file.
    pub is_file: bool,
    /// Whether the path is a directory.
    pub is_dir: bool,
    /// Whether the path is a symbolic link.
    pub is_symlink: bool,
    /// Size in bytes (0 for directories or missing paths).
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

impl FileMetadata {
    /// Metadata describing a path that does not exist.
    pub fn missing() -> Self {
        Self {
            exists: false,
            is_file: false,
            is_dir: false,
            is_symlink: false,
            size: 0,
            modified: None,
        }
    }
}

/// Filesystem operations scoped to a root directory.
///
/// Every method is async. The native implementation offloads blocking calls
/// to tokio's blocking pool. Errors are plain `std::io::Error`; paths that
/// escape the root fail with `io::ErrorKind::PermissionDenied`.
#[async_trait::async_trait]
pub trait FileSystem: Send + Sync {
    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Read file contents as a string.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::NotFound` if file doesn't exist.
    /// Returns `io::ErrorKind::InvalidData` if file is not valid UTF-8.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read file contents as bytes.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Get file/directory metadata.
    ///
    /// Returns `exists: false` instead of an error for missing paths.
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;

    /// Write string contents to a file and flush it to disk.
    ///
    /// Parent directories are not created. Existing files are overwritten.
    async fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Copy a file, overwriting the destination.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Remove a file. Refuses directories and symlinks.
    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Atomically rename a file.
    ///
    /// Used for atomic file updates (write to .tmp, then rename).
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create a directory and all parent directories.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// The root this filesystem is scoped to.
    fn root(&self) -> &Path;
}
