//! Native filesystem implementation using std::fs + tokio.

use crate::{FileMetadata, FileSystem};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tokio::task;

/// Native filesystem rooted at a directory.
///
/// Blocking `std::fs` calls run under `tokio::task::spawn_blocking`.
#[derive(Debug, Clone)]
pub struct NativeFileSystem {
    root: PathBuf,
    canonical_root: PathBuf,
}

impl NativeFileSystem {
    /// Create a filesystem scoped to `root`.
    ///
    /// The root itself may not exist yet (a fresh cache directory), but its
    /// parent must.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the root nor its parent can be canonicalized.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };

        let canonical_root = match absolute.canonicalize() {
            Ok(path) => path,
            Err(_) => {
                let parent = absolute.parent().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "Invalid root path")
                })?;
                let name = absolute.file_name().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "Invalid root path")
                })?;
                parent.canonicalize()?.join(name)
            }
        };

        Ok(Self {
            root: absolute,
            canonical_root,
        })
    }

    /// Resolve `path` against the root and reject anything outside it.
    fn validate_path(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(rest) => self.canonical_root.join(rest),
                Err(_) => path.to_path_buf(),
            }
        } else {
            self.canonical_root.join(path)
        };

        // Resolve symlinks for existing paths; fall back to the parent for new files.
        let resolved = match absolute.canonicalize() {
            Ok(path) => path,
            Err(_) => match (absolute.parent(), absolute.file_name()) {
                (Some(parent), Some(name)) => match parent.canonicalize() {
                    Ok(parent) => parent.join(name),
                    Err(_) => normalize_lexically(&absolute),
                },
                _ => normalize_lexically(&absolute),
            },
        };

        if !resolved.starts_with(&self.canonical_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "Path traversal detected: {} is outside {}",
                    resolved.display(),
                    self.root.display()
                ),
            ));
        }

        Ok(resolved)
    }
}

/// Remove `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn join_error(e: task::JoinError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

#[async_trait::async_trait]
impl FileSystem for NativeFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || validated.try_exists())
            .await
            .map_err(join_error)?
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || std::fs::read_to_string(&validated))
            .await
            .map_err(join_error)?
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || std::fs::read(&validated))
            .await
            .map_err(join_error)?
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || match std::fs::symlink_metadata(&validated) {
            Ok(meta) => Ok(FileMetadata {
                exists: true,
                is_file: meta.is_file(),
                is_dir: meta.is_dir(),
                is_symlink: meta.file_type().is_symlink(),
                size: meta.len(),
                modified: meta.modified().ok(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileMetadata::missing()),
            Err(e) => Err(e),
        })
        .await
        .map_err(join_error)?
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let validated = self.validate_path(path)?;
        let contents = contents.to_string();
        task::spawn_blocking(move || {
            let mut file = std::fs::File::create(&validated)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        })
        .await
        .map_err(join_error)?
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        let from_validated = self.validate_path(from)?;
        let to_validated = self.validate_path(to)?;
        task::spawn_blocking(move || std::fs::copy(&from_validated, &to_validated))
            .await
            .map_err(join_error)?
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        let meta = self.metadata(path).await?;
        if meta.is_symlink {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Refusing to remove symlink",
            ));
        }
        if meta.is_dir {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Refusing to remove directory",
            ));
        }

        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || std::fs::remove_file(&validated))
            .await
            .map_err(join_error)?
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_validated = self.validate_path(from)?;
        let to_validated = self.validate_path(to)?;
        task::spawn_blocking(move || std::fs::rename(&from_validated, &to_validated))
            .await
            .map_err(join_error)?
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let validated = self.validate_path(path)?;
        task::spawn_blocking(move || std::fs::create_dir_all(&validated))
            .await
            .map_err(join_error)?
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
