//! Error taxonomy for the patch engine and the selector.
//!
//! Block and operation errors are recorded as values and never abort the run. Only
//! [`SelectError`] is meant to propagate to callers.

use crate::path::PathViolation;
use serde::Serialize;
use thiserror::Error;

/// A block of the edit description that was discarded.
///
/// Line numbers are 1-based and point at the `<<<< SEARCH` marker that opened the block.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MalformedBlock {
    #[error("line {line}: no file path above the search marker")]
    MissingPath { line: usize },
    #[error("line {line}: invalid file path {path:?}")]
    InvalidPath { line: usize, path: String },
    #[error("line {line}: search section interrupted by {marker:?} before the divider")]
    SearchInterrupted { line: usize, marker: String },
    #[error("line {line}: replace section interrupted by {marker:?} before the end marker")]
    ReplaceInterrupted { line: usize, marker: String },
    #[error("line {line}: block is not terminated")]
    Unterminated { line: usize },
}

impl MalformedBlock {
    pub fn line(&self) -> usize {
        match self {
            MalformedBlock::MissingPath { line }
            | MalformedBlock::InvalidPath { line, .. }
            | MalformedBlock::SearchInterrupted { line, .. }
            | MalformedBlock::ReplaceInterrupted { line, .. }
            | MalformedBlock::Unterminated { line } => *line,
        }
    }
}

/// Why a single file operation was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("invalid path {path:?}: {violation}")]
    InvalidPath {
        path: String,
        violation: PathViolation,
    },
    #[error("no file at {path:?}")]
    MissingTarget { path: String },
    #[error("search block not found in {path:?}")]
    UnmatchedSearch { path: String },
    #[error("search block matches {count} places in {path:?}")]
    AmbiguousMatch { path: String, count: usize },
}

impl OperationError {
    pub fn path(&self) -> &str {
        match self {
            OperationError::InvalidPath { path, .. }
            | OperationError::MissingTarget { path }
            | OperationError::UnmatchedSearch { path }
            | OperationError::AmbiguousMatch { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("cannot pick from an empty candidate list")]
    EmptyCandidateList,
    #[error("no candidate could be verified ({dropped} dropped)")]
    NoVerifiableCandidate { dropped: usize },
}
