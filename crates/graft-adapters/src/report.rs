//! Run reports written as JSON next to CLI output.

use crate::util::write_atomic;
use anyhow::Context;
use chrono::{DateTime, Utc};
use graft_core::MalformedBlock;
use graft_engine::select::{RankedCandidate, SelectionMetrics};
use graft_engine::{ApplyResult, OperationOutcome, Selection, Verdict};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationEntry {
    pub path: String,
    pub status: &'static str,
    pub detail: String,
}

impl From<&OperationOutcome> for OperationEntry {
    fn from(outcome: &OperationOutcome) -> Self {
        let status = match outcome {
            OperationOutcome::Created { .. } => "created",
            OperationOutcome::Overwritten { .. } => "overwritten",
            OperationOutcome::Deleted { .. } => "deleted",
            OperationOutcome::Updated { .. } => "updated",
            OperationOutcome::Failed(_) => "failed",
        };
        Self {
            path: outcome.path().to_string(),
            status,
            detail: outcome.describe(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub project: String,
    pub all_succeeded: bool,
    pub operations: Vec<OperationEntry>,
    pub malformed: Vec<MalformedBlock>,
}

impl ApplyReport {
    pub fn new<P>(project: &str, result: &ApplyResult<P>) -> Self {
        Self {
            run_id: new_run_id(),
            created_at: Utc::now(),
            project: project.to_string(),
            all_succeeded: result.all_succeeded,
            operations: result.outcomes.iter().map(OperationEntry::from).collect(),
            malformed: result.malformed.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedCandidate {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub policy: String,
    pub winner: String,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_error: Option<String>,
    pub ranking: Vec<RankedCandidate>,
    pub dropped: Vec<DroppedCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SelectionMetrics>,
}

impl SelectionReport {
    pub fn new(selection: &Selection, dropped: Vec<DroppedCandidate>) -> Self {
        Self {
            run_id: new_run_id(),
            created_at: Utc::now(),
            policy: selection.policy.to_string(),
            winner: selection.winner.label().to_string(),
            verdict: selection.verdict,
            compile_error: selection.winner.compile_error().map(str::to_string),
            ranking: selection.ranking.clone(),
            dropped,
            metrics: selection.metrics.clone(),
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    write_atomic(path, &content)
}
