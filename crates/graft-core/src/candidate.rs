use crate::snapshot::ProjectSnapshot;
use serde::{Deserialize, Serialize};

/// Failure count reserved for "could not be verified": compile errors, runner crashes,
/// and suites that found zero tests. Any genuine smaller failure count beats it.
pub const SENTINEL_FAILED_TESTS: u32 = 100;

/// Test-execution outcome reported by the external toolchain for one candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    /// Compiler output when the build failed.
    #[serde(default)]
    pub compile_error: Option<String>,
    /// Raw test-runner output.
    #[serde(default)]
    pub raw_output: String,
    #[serde(default)]
    pub runtime_ms: Option<u64>,
}

impl TestOutcome {
    pub fn new(total: u32, passed: u32, failed: u32) -> Self {
        Self {
            total,
            passed,
            failed,
            ..Self::default()
        }
    }

    /// Outcome for a candidate that never produced test results.
    pub fn unverified(compile_error: impl Into<String>) -> Self {
        Self {
            total: 0,
            passed: 0,
            failed: SENTINEL_FAILED_TESTS,
            compile_error: Some(compile_error.into()),
            raw_output: String::new(),
            runtime_ms: None,
        }
    }

    pub fn with_raw_output(mut self, output: impl Into<String>) -> Self {
        self.raw_output = output.into();
        self
    }
}

/// A patched project paired with its test outcome.
///
/// Built once after execution and consumed by the selector; fields are read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    label: String,
    snapshot: ProjectSnapshot,
    outcome: TestOutcome,
}

impl CandidateRecord {
    pub fn new(label: impl Into<String>, snapshot: ProjectSnapshot, outcome: TestOutcome) -> Self {
        Self {
            label: label.into(),
            snapshot,
            outcome,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn snapshot(&self) -> &ProjectSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> ProjectSnapshot {
        self.snapshot
    }

    pub fn outcome(&self) -> &TestOutcome {
        &self.outcome
    }

    pub fn test_total(&self) -> u32 {
        self.outcome.total
    }

    pub fn test_passed(&self) -> u32 {
        self.outcome.passed
    }

    pub fn test_failed(&self) -> u32 {
        self.outcome.failed
    }

    pub fn compile_error(&self) -> Option<&str> {
        self.outcome
            .compile_error
            .as_deref()
            .filter(|error| !error.trim().is_empty())
    }

    pub fn raw_output(&self) -> &str {
        &self.outcome.raw_output
    }

    /// Failure count used for ranking. An empty suite proves nothing, so it is
    /// ranked like a candidate that could not run at all.
    pub fn effective_failed(&self) -> u32 {
        if self.outcome.total == 0 {
            SENTINEL_FAILED_TESTS
        } else {
            self.outcome.failed
        }
    }

    /// Passed / total in `[0, 1]`; `0` when no tests ran.
    pub fn pass_ratio(&self) -> f64 {
        if self.outcome.total == 0 {
            return 0.0;
        }
        (self.outcome.passed as f64 / self.outcome.total as f64).min(1.0)
    }

    pub fn is_fully_passing(&self) -> bool {
        self.compile_error().is_none() && self.effective_failed() == 0
    }
}
