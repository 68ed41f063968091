//! Aggregate quality metrics over one selection.
//!
//! Metrics are informational. They are computed behind a failure boundary so a bad
//! record can never change which candidate wins.

use anyhow::{ensure, Result};
use graft_core::CandidateRecord;
use serde::Serialize;
use tracing::{info, warn};

/// Log target for metric events.
pub const METRICS_TARGET: &str = "graft::metrics";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionMetrics {
    pub candidates: usize,
    pub avg_passed: f64,
    pub avg_failed: f64,
    /// Mean pass percentage, rounded to 2 decimals. Candidates without tests count as 0%.
    pub avg_pass_percent: f64,
    pub winner_passed: u32,
    pub fully_passing: usize,
    pub fully_passing_percent: f64,
    /// Mean passed count among fully-passing candidates, if there are any.
    pub avg_passed_fully_passing: Option<f64>,
}

impl SelectionMetrics {
    pub fn log(&self) {
        info!(target: METRICS_TARGET, metric = "n_candidates", value = self.candidates);
        info!(target: METRICS_TARGET, metric = "avg_passed", value = self.avg_passed);
        info!(target: METRICS_TARGET, metric = "avg_failed", value = self.avg_failed);
        info!(target: METRICS_TARGET, metric = "avg_pass_percent", value = self.avg_pass_percent);
        info!(target: METRICS_TARGET, metric = "best_passed", value = self.winner_passed);
        info!(target: METRICS_TARGET, metric = "n_fully_passing", value = self.fully_passing);
        info!(
            target: METRICS_TARGET,
            metric = "fully_passing_percent",
            value = self.fully_passing_percent
        );
        if let Some(avg) = self.avg_passed_fully_passing {
            info!(target: METRICS_TARGET, metric = "avg_passed_fully_passing", value = avg);
        }
    }
}

pub fn compute_metrics(
    candidates: &[CandidateRecord],
    winner: &CandidateRecord,
) -> Result<SelectionMetrics> {
    ensure!(!candidates.is_empty(), "no candidates to aggregate");
    let n = candidates.len() as f64;

    let passed_sum: u64 = candidates.iter().map(|c| u64::from(c.test_passed())).sum();
    let failed_sum: u64 = candidates.iter().map(|c| u64::from(c.test_failed())).sum();
    let percent_sum: f64 = candidates.iter().map(|c| c.pass_ratio() * 100.0).sum();

    let fully: Vec<&CandidateRecord> = candidates.iter().filter(|c| c.is_fully_passing()).collect();
    let avg_passed_fully_passing = if fully.is_empty() {
        None
    } else {
        let sum: u64 = fully.iter().map(|c| u64::from(c.test_passed())).sum();
        Some(sum as f64 / fully.len() as f64)
    };

    let metrics = SelectionMetrics {
        candidates: candidates.len(),
        avg_passed: passed_sum as f64 / n,
        avg_failed: failed_sum as f64 / n,
        avg_pass_percent: round2(percent_sum / n),
        winner_passed: winner.test_passed(),
        fully_passing: fully.len(),
        fully_passing_percent: round2(fully.len() as f64 * 100.0 / n),
        avg_passed_fully_passing,
    };
    ensure!(
        metrics.avg_passed.is_finite()
            && metrics.avg_failed.is_finite()
            && metrics.avg_pass_percent.is_finite(),
        "non-finite metric over {} candidates",
        metrics.candidates
    );
    Ok(metrics)
}

/// Compute and log metrics; errors are logged and swallowed.
pub fn compute_guarded(
    candidates: &[CandidateRecord],
    winner: &CandidateRecord,
) -> Option<SelectionMetrics> {
    match compute_metrics(candidates, winner) {
        Ok(metrics) => {
            metrics.log();
            Some(metrics)
        }
        Err(err) => {
            warn!(error = %err, "could not compute selection metrics");
            None
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
