//! Candidate execution results
//!
//! The toolchain runner writes a JSON manifest listing each candidate's project
//! directory and either its execution report or the error that stopped execution.

use crate::util::truncate;
use crate::workspace::load_project;
use anyhow::Context;
use graft_core::{CandidateRecord, TestOutcome};
use graft_engine::CandidateOutcome;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub candidates: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub label: String,
    /// Patched project directory, relative to the manifest.
    pub project: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ExecutionReport>,
    /// Set when compilation or test execution raised or timed out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<String>,
}

/// Test results as reported by a language toolchain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    #[serde(default)]
    pub total_tests: u32,
    #[serde(default)]
    pub passed_tests: u32,
    #[serde(default)]
    pub failed_tests: u32,
    /// Compiler output when the build failed.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub test_output: String,
    #[serde(default)]
    pub runtime_ms: Option<u64>,
}

impl ExecutionReport {
    /// Convert to a [`TestOutcome`]. A build error marks the candidate unverified.
    pub fn into_outcome(self, max_error_chars: usize) -> TestOutcome {
        let error = self.error.filter(|e| !e.trim().is_empty());
        let outcome = match error {
            Some(error) => TestOutcome::unverified(truncate(&error, max_error_chars)),
            None => TestOutcome::new(self.total_tests, self.passed_tests, self.failed_tests),
        };
        let mut outcome = outcome.with_raw_output(self.test_output);
        outcome.runtime_ms = self.runtime_ms;
        outcome
    }
}

impl Manifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Resolve every entry into an outcome. Project directories are relative to `base`.
    /// Entries whose project cannot be loaded are dropped, not fatal.
    pub fn into_outcomes(
        self,
        base: &Path,
        display_name: Option<&str>,
        max_error_chars: usize,
    ) -> Vec<CandidateOutcome> {
        self.candidates
            .into_iter()
            .map(|entry| entry.into_outcome(base, display_name, max_error_chars))
            .collect()
    }
}

impl ManifestEntry {
    fn into_outcome(
        self,
        base: &Path,
        display_name: Option<&str>,
        max_error_chars: usize,
    ) -> CandidateOutcome {
        if let Some(reason) = self.execution_error {
            return CandidateOutcome::Dropped {
                label: self.label,
                reason,
            };
        }
        let Some(report) = self.report else {
            return CandidateOutcome::Dropped {
                label: self.label,
                reason: "no execution report".to_string(),
            };
        };

        let dir = base.join(&self.project);
        match load_project(&dir, display_name) {
            Ok(snapshot) => {
                debug!(label = %self.label, dir = %dir.display(), "loaded candidate");
                CandidateRecord::new(self.label, snapshot, report.into_outcome(max_error_chars))
                    .into()
            }
            Err(err) => CandidateOutcome::Dropped {
                label: self.label,
                reason: format!("{:#}", err),
            },
        }
    }
}

/// Read a manifest and resolve its candidates relative to the manifest's directory.
pub fn load_outcomes(
    manifest_path: &Path,
    display_name: Option<&str>,
    max_error_chars: usize,
) -> anyhow::Result<Vec<CandidateOutcome>> {
    let manifest = Manifest::load(manifest_path)?;
    let base = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(manifest.into_outcomes(&base, display_name, max_error_chars))
}
