//! Workspace-relative path helpers.
//!
//! Paths are `/`-separated and relative to the workspace root, e.g.
//! `src/main.rs`. The root itself is the empty string.

use crate::error::{HistoryError, Result};

/// Path separator used by all entry paths.
pub const SEPARATOR: char = '/';

/// Splits a path into its segments, validating each one.
///
/// Leading and trailing separators are ignored. The root (`""`) yields no
/// segments.
///
/// # Examples
///
/// ```
/// use lh_core::path;
///
/// assert_eq!(path::segments("src/main.rs").unwrap(), vec!["src", "main.rs"]);
/// assert!(path::segments("").unwrap().is_empty());
/// assert!(path::segments("a/../b").is_err());
/// ```
pub fn segments(path: &str) -> Result<Vec<&str>> {
    let trimmed = path.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parts: Vec<&str> = trimmed.split(SEPARATOR).collect();
    for part in &parts {
        if part.is_empty() || *part == "." || *part == ".." {
            return Err(HistoryError::InvalidPath(path.to_string()));
        }
    }
    Ok(parts)
}

/// Splits a non-root path into `(parent, name)`.
///
/// # Examples
///
/// ```
/// use lh_core::path;
///
/// assert_eq!(path::split_last("a/b/c").unwrap(), ("a/b".to_string(), "c".to_string()));
/// assert_eq!(path::split_last("c").unwrap(), (String::new(), "c".to_string()));
/// ```
pub fn split_last(path: &str) -> Result<(String, String)> {
    let mut parts = segments(path)?;
    let name = parts
        .pop()
        .ok_or_else(|| HistoryError::InvalidPath(path.to_string()))?;
    Ok((parts.join("/"), name.to_string()))
}

/// Joins a parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    let parent = parent.trim_matches(SEPARATOR);
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", parent, SEPARATOR, name)
    }
}

/// Normalizes a path to its canonical form (no leading or trailing separator).
pub fn normalize(path: &str) -> Result<String> {
    Ok(segments(path)?.join("/"))
}

/// Validates a single entry name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(SEPARATOR) {
        return Err(HistoryError::InvalidPath(name.to_string()));
    }
    Ok(())
}
