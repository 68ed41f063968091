//! Line diffs between project snapshots
//!
//! Used to count hunks for the most-changes policy and to render the change report
//! written next to an applied project.

use crate::format::{DIVIDER, REPLACE_MARKER, SEARCH_MARKER};
use graft_core::{FileOperation, Project};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Unchanged lines kept around each hunk.
pub const CONTEXT_LINES: usize = 3;

/// Largest middle section (old lines times new lines) diffed line by line. Bigger
/// rewrites are reported as one remove-all/add-all hunk.
const MAX_TABLE_CELLS: usize = 4_000_000;

/// A single line in a diff hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Add(String),
    Remove(String),
}

impl DiffLine {
    pub fn content(&self) -> &str {
        match self {
            DiffLine::Context(s) | DiffLine::Add(s) | DiffLine::Remove(s) => s,
        }
    }

    fn prefix(&self) -> char {
        match self {
            DiffLine::Context(_) => ' ',
            DiffLine::Add(_) => '+',
            DiffLine::Remove(_) => '-',
        }
    }
}

/// A hunk in a unified diff. Starts are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// (additions, removals) in this hunk
    pub fn summary(&self) -> (usize, usize) {
        let adds = self.lines.iter().filter(|l| matches!(l, DiffLine::Add(_))).count();
        let removes = self.lines.iter().filter(|l| matches!(l, DiffLine::Remove(_))).count();
        (adds, removes)
    }

    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Diff two texts line by line. Line endings are part of a line, so a changed final
/// newline shows up as a change.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffHunk> {
    let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();
    let script = edit_script(&old_lines, &new_lines);
    group_hunks(&script, &old_lines, &new_lines, CONTEXT_LINES)
}

fn edit_script(old: &[&str], new: &[&str]) -> Vec<Edit> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    let mut script: Vec<Edit> = (0..prefix).map(|i| Edit::Equal(i, i)).collect();
    if a.len().saturating_mul(b.len()) <= MAX_TABLE_CELLS {
        middle_lcs(a, b, prefix, &mut script);
    } else {
        script.extend((0..a.len()).map(|i| Edit::Delete(prefix + i)));
        script.extend((0..b.len()).map(|j| Edit::Insert(prefix + j)));
    }
    let old_tail = old.len() - suffix;
    let new_tail = new.len() - suffix;
    script.extend((0..suffix).map(|k| Edit::Equal(old_tail + k, new_tail + k)));
    script
}

/// Longest-common-subsequence walk over the trimmed middle section.
fn middle_lcs(a: &[&str], b: &[&str], offset: usize, script: &mut Vec<Edit>) {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    // table[i * width + j] = LCS length of a[i..] and b[j..]
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            script.push(Edit::Equal(offset + i, offset + j));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            script.push(Edit::Delete(offset + i));
            i += 1;
        } else {
            script.push(Edit::Insert(offset + j));
            j += 1;
        }
    }
    script.extend((i..n).map(|i| Edit::Delete(offset + i)));
    script.extend((j..m).map(|j| Edit::Insert(offset + j)));
}

fn group_hunks(script: &[Edit], old: &[&str], new: &[&str], context: usize) -> Vec<DiffHunk> {
    let changes: Vec<usize> = script
        .iter()
        .enumerate()
        .filter(|(_, edit)| !matches!(edit, Edit::Equal(..)))
        .map(|(idx, _)| idx)
        .collect();
    let Some(&first) = changes.first() else {
        return Vec::new();
    };

    // Split change positions into groups. Up to `2 * context` unchanged lines between
    // two changes still belong to one hunk.
    let mut ranges = Vec::new();
    let (mut group_start, mut group_end) = (first, first);
    for &idx in &changes[1..] {
        if idx - group_end > 2 * context + 1 {
            ranges.push((group_start, group_end));
            group_start = idx;
        }
        group_end = idx;
    }
    ranges.push((group_start, group_end));

    ranges
        .into_iter()
        .map(|(first_change, last_change)| {
            let start = first_change.saturating_sub(context);
            let end = (last_change + 1 + context).min(script.len());
            build_hunk(&script[..end], start, old, new)
        })
        .collect()
}

fn build_hunk(script: &[Edit], start: usize, old: &[&str], new: &[&str]) -> DiffHunk {
    let (mut old_before, mut new_before) = (0, 0);
    for edit in &script[..start] {
        match edit {
            Edit::Equal(..) => {
                old_before += 1;
                new_before += 1;
            }
            Edit::Delete(_) => old_before += 1,
            Edit::Insert(_) => new_before += 1,
        }
    }

    let mut lines = Vec::new();
    let (mut old_count, mut new_count) = (0, 0);
    for edit in &script[start..] {
        match *edit {
            Edit::Equal(i, _) => {
                lines.push(DiffLine::Context(strip_newline(old[i])));
                old_count += 1;
                new_count += 1;
            }
            Edit::Delete(i) => {
                lines.push(DiffLine::Remove(strip_newline(old[i])));
                old_count += 1;
            }
            Edit::Insert(j) => {
                lines.push(DiffLine::Add(strip_newline(new[j])));
                new_count += 1;
            }
        }
    }

    // An empty side points at the line before the hunk, as unified diffs do.
    let old_start = if old_count == 0 { old_before } else { old_before + 1 };
    let new_start = if new_count == 0 { new_before } else { new_before + 1 };
    DiffHunk {
        old_start,
        old_count,
        new_start,
        new_count,
        lines,
    }
}

fn strip_newline(line: &str) -> String {
    line.strip_suffix('\n').unwrap_or(line).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Added,
    Deleted,
    Modified,
}

/// Changes to one path between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub change: FileChange,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    /// Hunks this file contributes to a change count. Adding or removing a whole
    /// file counts once.
    pub fn hunk_count(&self) -> usize {
        match self.change {
            FileChange::Added | FileChange::Deleted => 1,
            FileChange::Modified => self.hunks.len(),
        }
    }

    /// Get total additions and deletions
    pub fn stats(&self) -> (usize, usize) {
        self.hunks.iter().fold((0, 0), |acc, h| {
            let (a, r) = h.summary();
            (acc.0 + a, acc.1 + r)
        })
    }
}

/// Every path that differs between `source` and `target`, sorted by path.
pub fn diff_projects<S: Project, T: Project>(source: &S, target: &T) -> Vec<FileDiff> {
    let before: BTreeMap<&str, &str> = source.files().collect();
    let after: BTreeMap<&str, &str> = target.files().collect();

    let mut paths: Vec<&str> = before.keys().chain(after.keys()).copied().collect();
    paths.sort_unstable();
    paths.dedup();

    paths
        .into_iter()
        .filter_map(|path| {
            let (change, old, new) = match (before.get(path), after.get(path)) {
                (None, Some(new)) => (FileChange::Added, "", *new),
                (Some(old), None) => (FileChange::Deleted, *old, ""),
                (Some(old), Some(new)) if old != new => (FileChange::Modified, *old, *new),
                _ => return None,
            };
            Some(FileDiff {
                path: path.to_string(),
                change,
                hunks: diff_lines(old, new),
            })
        })
        .collect()
}

/// Number of diff hunks needed to turn `source` into `target`.
pub fn count_hunks<S: Project, T: Project>(source: &S, target: &T) -> usize {
    diff_projects(source, target)
        .iter()
        .map(FileDiff::hunk_count)
        .sum()
}

/// Human-readable report of everything that changed: totals, then a unified diff per
/// changed file.
pub fn render_change_report<S: Project, T: Project>(source: &S, target: &T) -> String {
    let diffs = diff_projects(source, target);
    let (adds, removes) = diffs.iter().fold((0, 0), |acc, d| {
        let (a, r) = d.stats();
        (acc.0 + a, acc.1 + r)
    });
    let hunks: usize = diffs.iter().map(FileDiff::hunk_count).sum();

    let mut out = String::new();
    let _ = writeln!(out, "Total changes: {} (+{} -{})", adds + removes, adds, removes);
    let _ = writeln!(out, "Total changed files: {}", diffs.len());
    let _ = writeln!(out, "Total hunks: {}", hunks);

    for diff in &diffs {
        out.push('\n');
        let (old_label, new_label) = match diff.change {
            FileChange::Added => ("/dev/null".to_string(), format!("b/{}", diff.path)),
            FileChange::Deleted => (format!("a/{}", diff.path), "/dev/null".to_string()),
            FileChange::Modified => (format!("a/{}", diff.path), format!("b/{}", diff.path)),
        };
        let _ = writeln!(out, "--- {}", old_label);
        let _ = writeln!(out, "+++ {}", new_label);
        for hunk in &diff.hunks {
            let _ = writeln!(out, "{}", hunk.header());
            for line in &hunk.lines {
                let _ = writeln!(out, "{}{}", line.prefix(), line.content());
            }
        }
    }
    out
}

/// Operations written back in the edit-description format, one block per operation.
pub fn render_operations(operations: &[FileOperation]) -> String {
    let mut out = String::new();
    for (idx, op) in operations.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", op.path);
        let _ = writeln!(out, "{}", SEARCH_MARKER);
        push_section(&mut out, &op.search);
        let _ = writeln!(out, "{}", DIVIDER);
        push_section(&mut out, &op.replace);
        let _ = writeln!(out, "{}", REPLACE_MARKER);
    }
    out
}

fn push_section(out: &mut String, section: &str) {
    out.push_str(section);
    if !section.is_empty() && !section.ends_with('\n') {
        out.push('\n');
    }
}
