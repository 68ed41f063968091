//! Edit description parsing
//!
//! Turns a model's free-form response into file operations. Surrounding prose is
//! ignored; each `<<<< SEARCH` block is parsed on its own so one broken block never
//! hides the rest of the document.

use crate::format::{marker, Marker};
use graft_core::path::{is_path_safe, normalize_path};
use graft_core::{FileOperation, MalformedBlock};
use tracing::{debug, warn};

const QUOTE_CHARS: [char; 3] = ['"', '\'', '`'];

/// Outcome for one block of the edit description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBlock {
    WellFormed(FileOperation),
    Malformed(MalformedBlock),
}

/// Every block found in an edit description, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEdits {
    pub blocks: Vec<ParsedBlock>,
}

impl ParsedEdits {
    pub fn operations(&self) -> impl Iterator<Item = &FileOperation> {
        self.blocks.iter().filter_map(|block| match block {
            ParsedBlock::WellFormed(op) => Some(op),
            ParsedBlock::Malformed(_) => None,
        })
    }

    pub fn malformed(&self) -> impl Iterator<Item = &MalformedBlock> {
        self.blocks.iter().filter_map(|block| match block {
            ParsedBlock::WellFormed(_) => None,
            ParsedBlock::Malformed(reason) => Some(reason),
        })
    }

    pub fn into_operations(self) -> Vec<FileOperation> {
        self.blocks
            .into_iter()
            .filter_map(|block| match block {
                ParsedBlock::WellFormed(op) => Some(op),
                ParsedBlock::Malformed(_) => None,
            })
            .collect()
    }

    /// `true` when no block was discarded.
    pub fn well_formed(&self) -> bool {
        self.blocks
            .iter()
            .all(|block| matches!(block, ParsedBlock::WellFormed(_)))
    }
}

/// Parse an edit description.
///
/// `display_name` is the project's display name; a leading `"<display_name>/"` on a
/// path is removed because models sometimes echo it.
pub fn parse_edit_description(text: &str, display_name: &str) -> ParsedEdits {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if marker(lines[i]) != Some(Marker::Search) {
            i += 1;
            continue;
        }
        match parse_block(&lines, i, display_name) {
            Ok((op, end)) => {
                debug!(path = %op.path, kind = %op.kind(), "parsed edit block");
                blocks.push(ParsedBlock::WellFormed(op));
                i = end + 1;
            }
            Err(reason) => {
                warn!(line = reason.line(), %reason, "discarding malformed edit block");
                blocks.push(ParsedBlock::Malformed(reason));
                // An interrupting start marker opens the next block, so rescan from here.
                i += 1;
            }
        }
    }

    ParsedEdits { blocks }
}

/// Parse the block opened at `start`. Returns the operation and the index of its end
/// marker.
fn parse_block(
    lines: &[&str],
    start: usize,
    display_name: &str,
) -> Result<(FileOperation, usize), MalformedBlock> {
    let line = start + 1;
    let path = block_path(lines, start, display_name)?;

    let mut search = String::new();
    let mut j = start + 1;
    loop {
        let Some(current) = lines.get(j) else {
            return Err(MalformedBlock::Unterminated { line });
        };
        match marker(current) {
            Some(Marker::Divider) => break,
            Some(_) => {
                return Err(MalformedBlock::SearchInterrupted {
                    line,
                    marker: current.trim_end().to_string(),
                })
            }
            None => push_line(&mut search, current),
        }
        j += 1;
    }

    let mut replace = String::new();
    j += 1;
    loop {
        let Some(current) = lines.get(j) else {
            return Err(MalformedBlock::Unterminated { line });
        };
        match marker(current) {
            Some(Marker::Replace) => break,
            Some(_) => {
                return Err(MalformedBlock::ReplaceInterrupted {
                    line,
                    marker: current.trim_end().to_string(),
                })
            }
            None => push_line(&mut replace, current),
        }
        j += 1;
    }

    Ok((FileOperation::new(path, search, replace), j))
}

fn push_line(section: &mut String, line: &str) {
    section.push_str(line);
    section.push('\n');
}

fn block_path(lines: &[&str], start: usize, display_name: &str) -> Result<String, MalformedBlock> {
    let line = start + 1;
    let raw = match start.checked_sub(1).and_then(|idx| lines.get(idx)) {
        Some(raw) if !raw.trim().is_empty() => raw.trim(),
        _ => return Err(MalformedBlock::MissingPath { line }),
    };

    let unquoted = strip_quotes(raw);
    let mut path = normalize_path(unquoted);

    if !display_name.is_empty() {
        if let Some(rest) = path
            .strip_prefix(display_name)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            path = rest.to_string();
        }
    }

    if !is_path_safe(&path) {
        return Err(MalformedBlock::InvalidPath {
            line,
            path: raw.to_string(),
        });
    }
    Ok(path)
}

/// Remove one quote character from each end, independently.
fn strip_quotes(raw: &str) -> &str {
    let raw = raw.strip_prefix(&QUOTE_CHARS[..]).unwrap_or(raw);
    raw.strip_suffix(&QUOTE_CHARS[..]).unwrap_or(raw)
}
