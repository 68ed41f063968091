use anyhow::Context;
use std::fs;
use std::path::Path;

/// Shorten compiler or runner output to at most `max` characters. A cut longer than
/// three characters ends in `...`; the cut never splits a character.
pub fn truncate(s: &str, max: usize) -> String {
    let Some((cut, _)) = s.char_indices().nth(max) else {
        return s.to_string();
    };
    if max <= 3 {
        return s[..cut].to_string();
    }
    let keep = s.char_indices().nth(max - 3).map_or(cut, |(offset, _)| offset);
    format!("{}...", &s[..keep])
}

/// Write through a sibling temp file and rename over `path`.
pub fn write_atomic(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}
