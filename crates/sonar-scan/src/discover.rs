//! Finding repository directories under a root.

use std::io;
use std::path::{Path, PathBuf};

/// Candidate repositories under `root`: visible, non-empty subdirectories,
/// sorted by name.
///
/// A missing root yields an empty list. Entries that cannot be read are
/// skipped.
pub fn find_repositories(root: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(root = %root.display(), "Repositories root does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut repositories = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::debug!(%error, "Skipping unreadable entry");
                continue;
            }
        };

        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        if !path.is_dir() || is_empty_dir(&path) {
            continue;
        }
        repositories.push(path);
    }

    repositories.sort();
    Ok(repositories)
}

fn is_empty_dir(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// Repository name for a directory: its final component.
pub fn repository_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
