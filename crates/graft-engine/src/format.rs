//! Markers of the edit-description wire format and the guide shown to models.

pub const SEARCH_MARKER: &str = "<<<< SEARCH";
pub const DIVIDER: &str = "====";
pub const REPLACE_MARKER: &str = ">>>> REPLACE";

/// Instructions for producing edit descriptions the parser accepts.
pub const EDIT_FORMAT_GUIDE: &str = "\
Edits are made with *SEARCH/REPLACE* blocks. Every block uses this format:
1. The file path relative to the project folder alone on a line, verbatim.
   No bold asterisks, no quotes around it, no escaping of characters.
2. The start of the search block: <<<< SEARCH
3. A contiguous chunk of lines to search for in the existing file
4. The dividing line: ====
5. A contiguous chunk of lines to replace the search block with
6. The end of the replace block: >>>> REPLACE

Example:
Services/MyService.cs
<<<< SEARCH
using System;
using Serilog;
====
using System;
using Microsoft.Extensions.Logging;
>>>> REPLACE

Every SEARCH section must match the existing file content character for character,
including comments and whitespace. Blocks replace the FIRST matching occurrence only,
so include enough lines to make each search unique. Blocks are applied in order.

To move code, use two blocks: one that deletes it, one that inserts it elsewhere.
To create a file, use the new path, an empty SEARCH section, and the full content in
the REPLACE section. To delete a file, use its path with both sections empty.
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Search,
    Divider,
    Replace,
}

/// Classify a line; markers must be alone on their line (trailing whitespace allowed).
pub(crate) fn marker(line: &str) -> Option<Marker> {
    match line.trim_end() {
        SEARCH_MARKER => Some(Marker::Search),
        DIVIDER => Some(Marker::Divider),
        REPLACE_MARKER => Some(Marker::Replace),
        _ => None,
    }
}
