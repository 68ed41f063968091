use serde::{Deserialize, Serialize};

/// One file-level edit extracted from an edit description.
///
/// The pair of sections decides the kind: both empty deletes, an empty search
/// creates (or overwrites), anything else updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperation {
    pub path: String,
    pub search: String,
    pub replace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Delete,
    Update,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Delete => "delete",
            OperationKind::Update => "update",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FileOperation {
    pub fn new(
        path: impl Into<String>,
        search: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            search: search.into(),
            replace: replace.into(),
        }
    }

    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, "", content)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(path, "", "")
    }

    pub fn kind(&self) -> OperationKind {
        match (self.search.is_empty(), self.replace.is_empty()) {
            (true, true) => OperationKind::Delete,
            (true, false) => OperationKind::Create,
            _ => OperationKind::Update,
        }
    }
}
