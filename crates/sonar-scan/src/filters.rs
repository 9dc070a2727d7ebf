//! Entries skipped while walking a repository.

use crate::{Result, ScanError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Directory names never descended into.
///
/// These cover version control metadata, dependency caches, build outputs,
/// virtual environments and editor state.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "__pycache__",
    ".pytest_cache",
    "target",
    "build",
    "dist",
    ".gradle",
    "venv",
    ".venv",
    "env",
    ".env",
    ".idea",
    ".vscode",
    ".vs",
    "logs",
    "log",
    "tmp",
    "temp",
];

/// File names never counted.
pub const IGNORED_FILES: &[&str] = &[".gitignore", ".gitkeep", ".DS_Store", "Thumbs.db", ".env.example"];

/// Compiled ignore rules: the defaults plus user glob patterns.
///
/// User patterns are matched against the path relative to the repository
/// root, e.g. `**/fixtures/**` or `*.generated.cs`.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    use_defaults: bool,
    patterns: GlobSet,
    pattern_count: usize,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            use_defaults: true,
            patterns: GlobSet::empty(),
            pattern_count: 0,
        }
    }
}

impl IgnoreRules {
    /// Build rules from the defaults plus `patterns`.
    pub fn new<I>(patterns: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_count = 0;
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidIgnorePattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            builder.add(glob);
            pattern_count += 1;
        }
        let patterns = builder.build().map_err(|e| ScanError::InvalidIgnorePattern {
            pattern: String::from("<set>"),
            message: e.to_string(),
        })?;

        Ok(Self {
            use_defaults: true,
            patterns,
            pattern_count,
        })
    }

    /// Disable the built-in directory and file lists.
    pub fn no_defaults(mut self) -> Self {
        self.use_defaults = false;
        self
    }

    /// Number of user patterns.
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Whether a directory should be pruned.
    pub fn skip_dir(&self, name: &str, relative: &Path) -> bool {
        (self.use_defaults && IGNORED_DIRS.contains(&name)) || self.patterns.is_match(relative)
    }

    /// Whether a file should be left out of every count.
    pub fn skip_file(&self, name: &str, relative: &Path) -> bool {
        (self.use_defaults && IGNORED_FILES.contains(&name)) || self.patterns.is_match(relative)
    }
}
