//! Patch application
//!
//! Applies file operations to a private copy of a project. Each operation either
//! succeeds or is recorded as failed; a failure never rolls back anything applied
//! before it and never stops the operations after it.

mod fuzzy;

use crate::parse::parse_edit_description;
use fuzzy::FuzzyMiss;
use graft_core::path::check_relative_path;
use graft_core::{FileOperation, MalformedBlock, OperationError, OperationKind, Project};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Byte-order mark some editors put in front of source files.
pub const BOM: char = '\u{feff}';

/// What to do when the fuzzy matcher finds the search block in more than one place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyAmbiguity {
    /// Use the first match in file order.
    #[default]
    First,
    /// Fail the operation with [`OperationError::AmbiguousMatch`].
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    pub fuzzy_ambiguity: FuzzyAmbiguity,
}

/// Which matcher applied an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Fuzzy,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Fuzzy => "fuzzy",
        }
    }
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one file operation, in operation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Created { path: String },
    Overwritten { path: String },
    Deleted { path: String },
    Updated { path: String, tier: MatchTier },
    Failed(OperationError),
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, OperationOutcome::Failed(_))
    }

    pub fn path(&self) -> &str {
        match self {
            OperationOutcome::Created { path }
            | OperationOutcome::Overwritten { path }
            | OperationOutcome::Deleted { path }
            | OperationOutcome::Updated { path, .. } => path,
            OperationOutcome::Failed(err) => err.path(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            OperationOutcome::Created { path } => format!("created {}", path),
            OperationOutcome::Overwritten { path } => format!("overwrote {}", path),
            OperationOutcome::Deleted { path } => format!("deleted {}", path),
            OperationOutcome::Updated { path, tier } => format!("updated {} ({})", path, tier),
            OperationOutcome::Failed(err) => format!("failed: {}", err),
        }
    }
}

/// Patched project plus bookkeeping.
///
/// `snapshot` holds every operation that succeeded even when `all_succeeded` is false.
#[derive(Debug, Clone)]
pub struct ApplyResult<P> {
    pub snapshot: P,
    pub all_succeeded: bool,
    pub outcomes: Vec<OperationOutcome>,
    /// The operations that were attempted, in order; `outcomes[i]` belongs to `operations[i]`.
    pub operations: Vec<FileOperation>,
    /// Blocks discarded while parsing, when the operations came from an edit description.
    pub malformed: Vec<MalformedBlock>,
}

impl<P> ApplyResult<P> {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count() + self.malformed.len()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Applier {
    options: ApplyOptions,
}

impl Applier {
    pub fn new(options: ApplyOptions) -> Self {
        Self { options }
    }

    /// Apply `operations` in order to a copy of `source`.
    pub fn apply<P: Project>(&self, source: &P, operations: &[FileOperation]) -> ApplyResult<P> {
        let mut target = source.clone();
        info!(
            project = source.display_name(),
            operations = operations.len(),
            "applying file operations"
        );

        let outcomes: Vec<OperationOutcome> = operations
            .iter()
            .map(|op| match self.apply_one(&mut target, op) {
                Ok(outcome) => {
                    info!(path = %op.path, "{}", outcome.describe());
                    outcome
                }
                Err(err) => {
                    warn!(path = %op.path, kind = %op.kind(), error = %err, "file operation dropped");
                    OperationOutcome::Failed(err)
                }
            })
            .collect();

        let all_succeeded = outcomes.iter().all(OperationOutcome::is_success);
        ApplyResult {
            snapshot: target,
            all_succeeded,
            outcomes,
            operations: operations.to_vec(),
            malformed: Vec::new(),
        }
    }

    fn apply_one<P: Project>(
        &self,
        target: &mut P,
        op: &FileOperation,
    ) -> Result<OperationOutcome, OperationError> {
        check_relative_path(&op.path).map_err(|violation| OperationError::InvalidPath {
            path: op.path.clone(),
            violation,
        })?;

        match op.kind() {
            OperationKind::Delete => {
                if target.remove_file(&op.path) {
                    Ok(OperationOutcome::Deleted {
                        path: op.path.clone(),
                    })
                } else {
                    Err(OperationError::MissingTarget {
                        path: op.path.clone(),
                    })
                }
            }
            OperationKind::Create => {
                let path = op.path.clone();
                if target.add_file(&op.path, op.replace.clone()) {
                    Ok(OperationOutcome::Overwritten { path })
                } else {
                    Ok(OperationOutcome::Created { path })
                }
            }
            OperationKind::Update => {
                let current = target
                    .get_file(&op.path)
                    .ok_or_else(|| OperationError::MissingTarget {
                        path: op.path.clone(),
                    })?;
                let (updated, tier) = self
                    .update_content(current, &op.search, &op.replace)
                    .map_err(|miss| match miss {
                        FuzzyMiss::NotFound => OperationError::UnmatchedSearch {
                            path: op.path.clone(),
                        },
                        FuzzyMiss::Ambiguous(count) => OperationError::AmbiguousMatch {
                            path: op.path.clone(),
                            count,
                        },
                    })?;
                target.add_file(&op.path, updated);
                Ok(OperationOutcome::Updated {
                    path: op.path.clone(),
                    tier,
                })
            }
        }
    }

    /// Replace the first occurrence of `search` in `content`, exact match first, then
    /// the whitespace-tolerant fallback. A leading BOM on the file survives.
    fn update_content(
        &self,
        content: &str,
        search: &str,
        replace: &str,
    ) -> Result<(String, MatchTier), FuzzyMiss> {
        let (bom, body) = match content.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, content),
        };
        let search = search.strip_prefix(BOM).unwrap_or(search);
        let replace = replace.strip_prefix(BOM).unwrap_or(replace);
        if search.is_empty() {
            return Err(FuzzyMiss::NotFound);
        }

        let (updated, tier) = match body.find(search) {
            Some(start) => {
                let mut updated = String::with_capacity(body.len() + replace.len());
                updated.push_str(&body[..start]);
                updated.push_str(replace);
                updated.push_str(&body[start + search.len()..]);
                (updated, MatchTier::Exact)
            }
            None => {
                debug!("no exact match, trying whitespace-tolerant match");
                let updated =
                    fuzzy::replace_first(body, search, replace, self.options.fuzzy_ambiguity)?;
                (updated, MatchTier::Fuzzy)
            }
        };

        if bom {
            let mut restored = String::with_capacity(updated.len() + BOM.len_utf8());
            restored.push(BOM);
            restored.push_str(&updated);
            return Ok((restored, tier));
        }
        Ok((updated, tier))
    }
}

/// Apply a list of operations with default options.
pub fn apply<P: Project>(source: &P, operations: &[FileOperation]) -> ApplyResult<P> {
    Applier::default().apply(source, operations)
}

/// Parse an edit description against `source` and apply it.
///
/// `all_succeeded` is false when a block was discarded during parsing, even if every
/// extracted operation applied.
pub fn apply_edit_description<P: Project>(
    source: &P,
    text: &str,
    options: ApplyOptions,
) -> ApplyResult<P> {
    let parsed = parse_edit_description(text, source.display_name());
    let malformed: Vec<MalformedBlock> = parsed.malformed().cloned().collect();
    let operations = parsed.into_operations();

    let mut result = Applier::new(options).apply(source, &operations);
    result.all_succeeded = result.all_succeeded && malformed.is_empty();
    result.malformed = malformed;
    result
}

/// Apply one edit description per candidate, in parallel. Every candidate works on its
/// own copy of `source`; results keep the input order.
pub fn apply_candidates<P>(
    source: &P,
    generations: &[String],
    options: ApplyOptions,
) -> Vec<ApplyResult<P>>
where
    P: Project + Send + Sync,
{
    generations
        .par_iter()
        .map(|text| apply_edit_description(source, text, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::ProjectSnapshot;

    fn project(path: &str, content: &str) -> ProjectSnapshot {
        ProjectSnapshot::new("AdapterPattern").with_file(path, content)
    }

    #[test]
    fn test_exact_update() {
        let source = project("main.py", "a = 1");
        let result = apply(&source, &[FileOperation::new("main.py", "a = 1", "a = 2")]);
        assert!(result.all_succeeded);
        assert_eq!(result.snapshot.get_file("main.py"), Some("a = 2"));
        assert_eq!(
            result.outcomes,
            vec![OperationOutcome::Updated {
                path: "main.py".to_string(),
                tier: MatchTier::Exact
            }]
        );
        // Input untouched.
        assert_eq!(source.get_file("main.py"), Some("a = 1"));
    }

    #[test]
    fn test_replaces_first_occurrence_only() {
        let source = project("P.cs", "class Program {}\nclass Program {}\n");
        let result = apply(
            &source,
            &[FileOperation::new("P.cs", "class Program {}", "class Testing {}")],
        );
        assert_eq!(
            result.snapshot.get_file("P.cs"),
            Some("class Testing {}\nclass Program {}\n")
        );
    }

    #[test]
    fn test_update_missing_file_fails() {
        let source = project("a.txt", "x");
        let result = apply(&source, &[FileOperation::new("b.txt", "x", "y")]);
        assert!(!result.all_succeeded);
        assert_eq!(
            result.outcomes[0],
            OperationOutcome::Failed(OperationError::MissingTarget {
                path: "b.txt".to_string()
            })
        );
    }

    #[test]
    fn test_delete_missing_file_fails() {
        let source = project("a.txt", "x");
        let result = apply(&source, &[FileOperation::delete("b.txt")]);
        assert!(!result.all_succeeded);
        assert_eq!(result.snapshot, source);
    }

    #[test]
    fn test_create_overwrites_existing() {
        let source = project("a.txt", "old");
        let result = apply(&source, &[FileOperation::create("a.txt", "new")]);
        assert!(result.all_succeeded);
        assert_eq!(result.snapshot.get_file("a.txt"), Some("new"));
        assert!(matches!(result.outcomes[0], OperationOutcome::Overwritten { .. }));
    }

    #[test]
    fn test_bom_is_stripped_from_search_and_replace() {
        let source = project("P.cs", "\u{feff}namespace A\n");
        let result = apply(
            &source,
            &[FileOperation::new("P.cs", "\u{feff}namespace A", "\u{feff}namespace B")],
        );
        assert_eq!(result.snapshot.get_file("P.cs"), Some("\u{feff}namespace B\n"));
    }

    #[test]
    fn test_operations_on_same_path_compose() {
        let source = project("a.txt", "one\ntwo\n");
        let ops = vec![
            FileOperation::new("a.txt", "one\n", "uno\n"),
            FileOperation::new("a.txt", "two\n", "dos\n"),
        ];
        let result = apply(&source, &ops);
        assert!(result.all_succeeded);
        assert_eq!(result.snapshot.get_file("a.txt"), Some("uno\ndos\n"));
    }

    #[test]
    fn test_move_is_create_then_delete() {
        let source = project("old/A.java", "class A {}\n");
        let ops = vec![
            FileOperation::create("new/A.java", "class A {}\n"),
            FileOperation::delete("old/A.java"),
        ];
        let result = apply(&source, &ops);
        assert!(result.all_succeeded);
        assert!(!result.snapshot.contains("old/A.java"));
        assert_eq!(result.snapshot.get_file("new/A.java"), Some("class A {}\n"));
    }

    #[test]
    fn test_ambiguous_fuzzy_match_can_be_rejected() {
        let source = project("a.py", "if x:\n    go()\nif y:\n        go()\n");
        // Trailing spaces defeat the exact tier.
        let op = FileOperation::new("a.py", "go()  \n", "stop()\n");
        let strict = Applier::new(ApplyOptions {
            fuzzy_ambiguity: FuzzyAmbiguity::Reject,
        })
        .apply(&source, std::slice::from_ref(&op));
        assert_eq!(
            strict.outcomes[0],
            OperationOutcome::Failed(OperationError::AmbiguousMatch {
                path: "a.py".to_string(),
                count: 2
            })
        );

        let lenient = apply(&source, &[op]);
        assert_eq!(
            lenient.snapshot.get_file("a.py"),
            Some("if x:\n    stop()\nif y:\n        go()\n")
        );
    }

    #[test]
    fn test_edit_description_malformed_block_flips_flag() {
        let source = project("a.txt", "x\n");
        let text = "a.txt\n<<<< SEARCH\nx\n====\ny\n>>>> REPLACE\nb.txt\n<<<< SEARCH\nz\n";
        let result = apply_edit_description(&source, text, ApplyOptions::default());
        assert!(!result.all_succeeded);
        assert_eq!(result.malformed.len(), 1);
        assert_eq!(result.operations.len(), 1);
        assert_eq!(result.operations[0].path, "a.txt");
        assert_eq!(result.snapshot.get_file("a.txt"), Some("y\n"));
        assert_eq!(result.failed_count(), 1);
    }

    #[test]
    fn test_apply_candidates_keeps_order_and_isolation() {
        let source = project("a.txt", "x\n");
        let generations = vec![
            "a.txt\n<<<< SEARCH\nx\n====\none\n>>>> REPLACE\n".to_string(),
            "a.txt\n<<<< SEARCH\nx\n====\ntwo\n>>>> REPLACE\n".to_string(),
        ];
        let results = apply_candidates(&source, &generations, ApplyOptions::default());
        assert_eq!(results[0].snapshot.get_file("a.txt"), Some("one\n"));
        assert_eq!(results[1].snapshot.get_file("a.txt"), Some("two\n"));
        assert_eq!(source.get_file("a.txt"), Some("x\n"));
    }
}
