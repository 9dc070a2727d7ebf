//! Error types for Sonar core.

use std::fmt;
use thiserror::Error;

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which collection a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A scanned repository.
    Repository,
    /// A logical component.
    Component,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Repository => f.write_str("Repository"),
            EntityKind::Component => f.write_str("Component"),
        }
    }
}

/// Errors collaborators are expected to handle when mutating state.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// An operation referenced an unknown repository or component.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Collection that was searched.
        kind: EntityKind,
        /// The name that did not resolve.
        name: String,
    },

    /// A component with this name already exists.
    #[error("{kind} already exists: {name}")]
    DuplicateName {
        /// Collection holding the existing entry.
        kind: EntityKind,
        /// The colliding name.
        name: String,
    },

    /// A component name failed validation.
    #[error("Invalid component name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The same dependency edge was recorded twice.
    #[error("Dependency already recorded: {source_repo} -> {target_repo} ({kind})")]
    DuplicateDependency {
        /// Depending repository.
        source_repo: String,
        /// Repository depended upon.
        target_repo: String,
        /// Dependency kind.
        kind: String,
    },

    /// A repository was recorded as depending on itself.
    #[error("Repository cannot depend on itself: {name}")]
    SelfDependency {
        /// The repository name.
        name: String,
    },

    /// An insight value cannot be persisted.
    #[error("Insight '{key}' holds a non-finite number")]
    InvalidInsight {
        /// Insight key (dotted path for nested maps).
        key: String,
    },
}

impl Error {
    /// Shorthand for a missing repository.
    pub fn repository_not_found(name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: EntityKind::Repository,
            name: name.into(),
        }
    }

    /// Shorthand for a missing component.
    pub fn component_not_found(name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: EntityKind::Component,
            name: name.into(),
        }
    }

    /// Whether this is a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
