use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Project boundary used by the applier.
///
/// Implementors are cloned before any mutation, so a `Project` value handed to the
/// engine is never modified in place.
pub trait Project: Clone {
    /// Name the project is shown under. Models sometimes prefix paths with it.
    fn display_name(&self) -> &str;

    /// Enumerate `(path, content)` pairs.
    fn files(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_>;

    fn get_file(&self, path: &str) -> Option<&str>;

    /// Add or overwrite a file. Returns `true` when an existing file was overwritten.
    fn add_file(&mut self, path: &str, content: String) -> bool;

    /// Remove a file. Returns whether it existed.
    fn remove_file(&mut self, path: &str) -> bool;
}

/// Fully materialized copy of a project's text files, keyed by relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub display_name: String,
    #[serde(default)]
    files: BTreeMap<String, String>,
}

impl ProjectSnapshot {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl Project for ProjectSnapshot {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn files(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(
            self.files
                .iter()
                .map(|(path, content)| (path.as_str(), content.as_str())),
        )
    }

    fn get_file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    fn add_file(&mut self, path: &str, content: String) -> bool {
        self.files.insert(path.to_string(), content).is_some()
    }

    fn remove_file(&mut self, path: &str) -> bool {
        self.files.remove(path).is_some()
    }
}
