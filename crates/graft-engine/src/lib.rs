//! Patch engine and candidate selector for graft.
//!
//! `parse` turns a model's edit description into file operations, `apply` runs them
//! against a copy of a project, `diff` measures what changed, and `select` ranks the
//! tested candidates.

pub mod apply;
pub mod diff;
pub mod format;
pub mod parse;
pub mod select;

pub use apply::{
    apply, apply_candidates, apply_edit_description, Applier, ApplyOptions, ApplyResult,
    FuzzyAmbiguity, MatchTier, OperationOutcome,
};
pub use diff::{count_hunks, diff_projects, render_change_report, render_operations, FileDiff};
pub use format::EDIT_FORMAT_GUIDE;
pub use parse::{parse_edit_description, ParsedBlock, ParsedEdits};
pub use select::{
    pick_best, pick_from_outcomes, CandidateOutcome, FewestFailures, MostChanges, PolicyKind,
    Score, ScorePolicy, Selection, TestSuite, Verdict,
};
