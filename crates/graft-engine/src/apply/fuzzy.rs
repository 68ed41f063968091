//! Whitespace-tolerant fallback matcher.
//!
//! The search block is de-indented and every line is matched on its own line of the
//! file, ignoring leading and trailing horizontal whitespace. The replacement is
//! re-indented to the match site: each relative indentation level of the search block
//! maps to the indentation of the file line it matched.

use super::FuzzyAmbiguity;
use regex::Regex;
use tracing::{debug, warn};

/// Why the fuzzy tier did not produce new content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FuzzyMiss {
    NotFound,
    Ambiguous(usize),
}

/// Replace the first line-anchored match of `search` in `content`.
pub(crate) fn replace_first(
    content: &str,
    search: &str,
    replace: &str,
    ambiguity: FuzzyAmbiguity,
) -> Result<String, FuzzyMiss> {
    let search_block = dedent(search);
    let search_block = trim_blank_edges(&search_block);
    if search_block.is_empty() {
        return Err(FuzzyMiss::NotFound);
    }

    let regex = match build_pattern(search_block) {
        Ok(regex) => regex,
        Err(err) => {
            warn!(error = %err, "could not build fuzzy pattern");
            return Err(FuzzyMiss::NotFound);
        }
    };

    let mut matches = regex.find_iter(content);
    let Some(first) = matches.next() else {
        return Err(FuzzyMiss::NotFound);
    };
    let extra = matches.count();
    if extra > 0 {
        match ambiguity {
            FuzzyAmbiguity::Reject => return Err(FuzzyMiss::Ambiguous(extra + 1)),
            FuzzyAmbiguity::First => {
                debug!(
                    matches = extra + 1,
                    "fuzzy search matches several places, using the first"
                );
            }
        }
    }

    let start = first.start();
    let mut end = first.end();
    // `\r?$` may have swallowed the carriage return of the last matched line.
    if content[start..end].ends_with('\r') {
        end -= 1;
    }
    let line_ending = if content[start..].contains("\r\n")
        && (content[start..end].contains("\r\n") || content[end..].starts_with("\r\n"))
    {
        "\r\n"
    } else {
        "\n"
    };

    let levels = IndentMap::new(search_block, &content[start..end]);
    let replace_block = dedent(replace);
    let replacement = reindent(trim_blank_edges(&replace_block), &levels, line_ending);

    let mut updated = String::with_capacity(content.len() + replacement.len());
    updated.push_str(&content[..start]);
    updated.push_str(&replacement);
    updated.push_str(&content[end..]);
    Ok(updated)
}

/// Build the multi-line pattern: one escaped line per search line, each allowed to carry
/// any leading and trailing spaces or tabs, anchored to line boundaries.
fn build_pattern(search_block: &str) -> Result<Regex, regex::Error> {
    let body = search_block
        .lines()
        .map(|line| regex::escape(line.trim()))
        .collect::<Vec<_>>()
        .join(r"[ \t]*\r?\n[ \t]*");
    Regex::new(&format!(r"(?m)^[ \t]*{}[ \t]*\r?$", body))
}

/// Remove the longest common leading whitespace from every non-blank line.
/// Whitespace-only lines become empty.
pub(crate) fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(leading_whitespace)
        .fold(None, |acc: Option<&str>, ws| {
            Some(match acc {
                None => ws,
                Some(margin) => common_prefix(margin, ws),
            })
        })
        .unwrap_or("");

    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                &line[margin.len()..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop blank lines at the start and trailing whitespace at the end, keeping the
/// first line's relative indentation.
fn trim_blank_edges(text: &str) -> &str {
    let text = text.trim_end();
    let mut start = 0;
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    &text[start..]
}

/// Relative indentation of each search line, paired with the indentation of the file
/// line it matched. Sorted by level; the first line seen at a level wins.
struct IndentMap<'a> {
    levels: Vec<(usize, &'a str)>,
}

impl<'a> IndentMap<'a> {
    /// `matched` holds exactly one file line per line of `search_block`.
    fn new(search_block: &str, matched: &'a str) -> Self {
        let mut levels: Vec<(usize, &'a str)> = Vec::new();
        for (search_line, site_line) in search_block.lines().zip(matched.split('\n')) {
            if search_line.trim().is_empty() {
                continue;
            }
            let level = leading_whitespace(search_line).len();
            if levels.iter().all(|(seen, _)| *seen != level) {
                levels.push((level, leading_whitespace(site_line)));
            }
        }
        levels.sort_by_key(|(level, _)| *level);
        Self { levels }
    }

    /// File indentation for a replacement line whose relative indentation is `relative`.
    /// Levels the search never used extend the closest shallower level.
    fn site_indent(&self, relative: &str) -> String {
        let level = relative.len();
        if let Some((known, site)) = self.levels.iter().rev().find(|(known, _)| *known <= level) {
            return format!("{}{}", site, &relative[*known..]);
        }
        match self.levels.first() {
            Some((known, site)) => site[..site.len().saturating_sub(known - level)].to_string(),
            None => relative.to_string(),
        }
    }
}

fn reindent(block: &str, levels: &IndentMap<'_>, line_ending: &str) -> String {
    block
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                let relative = leading_whitespace(line);
                format!("{}{}", levels.site_indent(relative), &line[relative.len()..])
            }
        })
        .collect::<Vec<_>>()
        .join(line_ending)
}

fn leading_whitespace(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c == ' ' || c == '\t');
    &line[..line.len() - rest.len()]
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}
