//! Relative path rules shared by the parser, the applier, and the directory adapters.

use thiserror::Error;

/// Why a path may not be written into a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathViolation {
    #[error("path is empty")]
    Empty,
    #[error("absolute paths are not allowed")]
    Absolute,
    #[error("paths with '..' segments are not allowed")]
    ParentTraversal,
    #[error("path contains characters outside the path-safe set")]
    UnsafeCharacters,
}

/// Normalize a model-provided path.
///
/// Backslashes become `/`, repeated separators and `.` segments are dropped. `..`
/// segments are kept on purpose: resolving them here would hide traversal from
/// [`check_relative_path`].
pub fn normalize_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let joined = unified
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Conservative character whitelist: word characters, `-`, `.`, and separators.
pub fn is_path_safe(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '\\'))
}

pub fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return true;
    }
    // Windows drive prefix, e.g. `C:` or `c:\`.
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic()
    )
}

pub fn has_parent_segment(path: &str) -> bool {
    path.split(|c: char| c == '/' || c == '\\').any(|segment| segment == "..")
}

/// Validate a path before it touches a project.
///
/// Runs regardless of what the parser already filtered; operations can be built by
/// hand or deserialized from elsewhere.
pub fn check_relative_path(path: &str) -> Result<(), PathViolation> {
    if path.trim().is_empty() {
        return Err(PathViolation::Empty);
    }
    if is_absolute(path) {
        return Err(PathViolation::Absolute);
    }
    if has_parent_segment(path) {
        return Err(PathViolation::ParentTraversal);
    }
    Ok(())
}
