//! Component name validation.

use crate::error::{Error, Result};

/// Longest accepted component name.
pub const MAX_COMPONENT_NAME_LEN: usize = 64;

/// Validate a component name
///
/// Component names must:
/// - Be 1-64 characters long
/// - Contain only ASCII alphanumerics, hyphens and underscores
/// - Not start with a hyphen or underscore
pub fn validate_component_name(name: &str) -> Result<()> {
    let reject = |reason: &str| Error::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(reject("must not be empty"));
    }

    if name.len() > MAX_COMPONENT_NAME_LEN {
        return Err(reject("longer than 64 characters"));
    }

    if name.starts_with('-') || name.starts_with('_') {
        return Err(reject("must start with a letter or digit"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(reject("only letters, digits, '-' and '_' are allowed"));
    }

    Ok(())
}
