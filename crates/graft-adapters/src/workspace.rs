//! Project directories on disk
//!
//! Loads a directory into a [`ProjectSnapshot`] and writes snapshots back out.

use anyhow::{bail, ensure, Context};
use graft_core::path::check_relative_path;
use graft_core::{Project, ProjectSnapshot};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Tool, dependency and build output directories never loaded into a snapshot.
pub const SKIP_DIRS: &[&str] = &[
    ".vs",
    ".idea",
    ".git",
    ".vscode",
    ".angular",
    "node_modules",
    "bin",
    "obj",
    ".gradle",
    "build",
    "target",
    "dist",
    "venv",
    "__pycache__",
    ".pytest_cache",
];

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIP_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Load every UTF-8 text file under `root`. `display_name` defaults to the directory
/// name.
pub fn load_project(root: &Path, display_name: Option<&str>) -> anyhow::Result<ProjectSnapshot> {
    ensure!(root.is_dir(), "Project directory {} does not exist", root.display());

    let name = match display_name {
        Some(name) => name.to_string(),
        None => root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default(),
    };
    let mut project = ProjectSnapshot::new(name);
    let mut skipped = 0usize;

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let bytes = fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        match String::from_utf8(bytes) {
            Ok(content) => {
                project.add_file(&relative, content);
            }
            Err(_) => {
                debug!(path = %relative, "skipping non-UTF-8 file");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "non-UTF-8 files were left out of the project");
    }
    info!(
        project = project.display_name(),
        files = project.len(),
        "loaded project"
    );
    Ok(project)
}

/// Write every file of `project` under `root`. `root` must be missing or empty so that
/// deleted files cannot linger from an earlier run.
pub fn save_project<P: Project>(project: &P, root: &Path) -> anyhow::Result<usize> {
    if root.exists() {
        let mut entries = fs::read_dir(root)
            .with_context(|| format!("Failed to read output directory {}", root.display()))?;
        ensure!(
            entries.next().is_none(),
            "Output directory {} is not empty",
            root.display()
        );
    }
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create output directory {}", root.display()))?;

    let mut written = 0;
    for (path, content) in project.files() {
        if let Err(violation) = check_relative_path(path) {
            bail!("Refusing to write {:?}: {}", path, violation);
        }
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written += 1;
    }
    info!(files = written, out = %root.display(), "saved project");
    Ok(written)
}
