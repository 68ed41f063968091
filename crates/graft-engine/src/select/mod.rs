//! Candidate selection
//!
//! Ranks (patched project, test outcome) pairs with a pluggable scoring policy and
//! returns the best one. Ranking is deterministic: a stable sort on the score, so
//! among equal scores the earliest candidate wins.

pub mod metrics;

use crate::diff::count_hunks;
use graft_core::{CandidateRecord, ProjectSnapshot, SelectError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

pub use metrics::{compute_guarded, compute_metrics, SelectionMetrics, METRICS_TARGET};

/// Weight of one failing test against one extra hunk in [`MostChanges`].
pub const FAILURE_PENALTY: i64 = 1000;

/// Ordering key; higher is better. `secondary` only breaks ties on `primary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Score {
    pub primary: i64,
    pub secondary: i64,
}

impl Score {
    pub fn new(primary: i64) -> Self {
        Self {
            primary,
            secondary: 0,
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.secondary == 0 {
            write!(f, "{}", self.primary)
        } else {
            write!(f, "{}/{}", self.primary, self.secondary)
        }
    }
}

pub trait ScorePolicy {
    fn name(&self) -> &'static str;
    fn score(&self, candidate: &CandidateRecord) -> Score;
}

/// Fewest failing tests wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FewestFailures;

impl ScorePolicy for FewestFailures {
    fn name(&self) -> &'static str {
        "fewest-failures"
    }

    fn score(&self, candidate: &CandidateRecord) -> Score {
        Score::new(-i64::from(candidate.effective_failed()))
    }
}

/// Prefer the candidate that changed the most, as long as its tests pass. One failing
/// test outweighs a thousand hunks.
#[derive(Debug, Clone, Copy)]
pub struct MostChanges<'a> {
    source: &'a ProjectSnapshot,
}

impl<'a> MostChanges<'a> {
    pub fn new(source: &'a ProjectSnapshot) -> Self {
        Self { source }
    }
}

impl ScorePolicy for MostChanges<'_> {
    fn name(&self) -> &'static str {
        "most-changes"
    }

    fn score(&self, candidate: &CandidateRecord) -> Score {
        let hunks = i64::try_from(count_hunks(self.source, candidate.snapshot())).unwrap_or(i64::MAX);
        let penalty = FAILURE_PENALTY * i64::from(candidate.effective_failed());
        Score::new(hunks.saturating_sub(penalty))
    }
}

/// For generated test suites: fewest failures, then the most passing tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestSuite;

impl ScorePolicy for TestSuite {
    fn name(&self) -> &'static str {
        "test-suite"
    }

    fn score(&self, candidate: &CandidateRecord) -> Score {
        Score {
            primary: -i64::from(candidate.effective_failed()),
            secondary: i64::from(candidate.test_passed()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    FewestFailures,
    MostChanges,
    TestSuite,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::FewestFailures => "fewest-failures",
            PolicyKind::MostChanges => "most-changes",
            PolicyKind::TestSuite => "test-suite",
        }
    }

    /// Instantiate the policy; `source` is the unpatched project the candidates came from.
    pub fn build<'a>(self, source: &'a ProjectSnapshot) -> Box<dyn ScorePolicy + 'a> {
        match self {
            PolicyKind::FewestFailures => Box::new(FewestFailures),
            PolicyKind::MostChanges => Box::new(MostChanges::new(source)),
            PolicyKind::TestSuite => Box::new(TestSuite),
        }
    }

    /// Built-in policy for a migration target: .NET targets use fewest failures, Java
    /// targets prefer larger diffs.
    pub fn for_target(target: &str) -> Option<PolicyKind> {
        let target = target.to_ascii_lowercase();
        if ["dotnet", "csharp"].iter().any(|p| target.starts_with(p)) {
            Some(PolicyKind::FewestFailures)
        } else if target.starts_with("java") {
            Some(PolicyKind::MostChanges)
        } else {
            None
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fewest-failures" | "default" => Ok(PolicyKind::FewestFailures),
            "most-changes" => Ok(PolicyKind::MostChanges),
            "test-suite" => Ok(PolicyKind::TestSuite),
            other => Err(format!(
                "unknown policy '{}' (expected fewest-failures, most-changes or test-suite)",
                other
            )),
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How much the winner can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Compiled and every test passed.
    Verified,
    CompileFailed,
    TestsFailed,
    /// Compiled but no tests ran.
    Unverified,
}

impl Verdict {
    pub fn of(candidate: &CandidateRecord) -> Self {
        if candidate.compile_error().is_some() {
            Verdict::CompileFailed
        } else if candidate.test_total() == 0 {
            Verdict::Unverified
        } else if candidate.test_failed() > 0 {
            Verdict::TestsFailed
        } else {
            Verdict::Verified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Verified => "verified",
            Verdict::CompileFailed => "compile_failed",
            Verdict::TestsFailed => "tests_failed",
            Verdict::Unverified => "unverified",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCandidate {
    pub label: String,
    /// Position in the input list.
    pub index: usize,
    pub score: Score,
    pub passed: u32,
    pub failed: u32,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub winner: CandidateRecord,
    /// Every candidate, best first.
    pub ranking: Vec<RankedCandidate>,
    pub metrics: Option<SelectionMetrics>,
    pub verdict: Verdict,
    pub policy: &'static str,
}

impl Selection {
    pub fn into_winner(self) -> CandidateRecord {
        self.winner
    }
}

/// Pick the best candidate under `policy`.
pub fn pick_best(
    mut candidates: Vec<CandidateRecord>,
    policy: &dyn ScorePolicy,
) -> Result<Selection, SelectError> {
    if candidates.is_empty() {
        return Err(SelectError::EmptyCandidateList);
    }

    let mut ranking: Vec<RankedCandidate> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let score = policy.score(candidate);
            debug!(
                label = candidate.label(),
                policy = policy.name(),
                score = %score,
                failed = candidate.effective_failed(),
                "scored candidate"
            );
            RankedCandidate {
                label: candidate.label().to_string(),
                index,
                score,
                passed: candidate.test_passed(),
                failed: candidate.test_failed(),
            }
        })
        .collect();
    // Stable: equal scores keep input order.
    ranking.sort_by(|a, b| b.score.cmp(&a.score));

    let best = ranking[0].index;
    let metrics = compute_guarded(&candidates, &candidates[best]);
    let winner = candidates.swap_remove(best);
    let verdict = Verdict::of(&winner);
    info!(
        winner = winner.label(),
        policy = policy.name(),
        score = %ranking[0].score,
        verdict = %verdict,
        "selected candidate"
    );

    Ok(Selection {
        winner,
        ranking,
        metrics,
        verdict,
        policy: policy.name(),
    })
}

/// Execution result for one candidate, as reported by the toolchain runner.
#[derive(Debug, Clone)]
pub enum CandidateOutcome {
    Executed(CandidateRecord),
    /// Execution raised or timed out; the candidate cannot be ranked.
    Dropped { label: String, reason: String },
}

impl From<CandidateRecord> for CandidateOutcome {
    fn from(record: CandidateRecord) -> Self {
        CandidateOutcome::Executed(record)
    }
}

/// Drop candidates whose execution failed, then pick among the rest.
pub fn pick_from_outcomes(
    outcomes: Vec<CandidateOutcome>,
    policy: &dyn ScorePolicy,
) -> Result<Selection, SelectError> {
    if outcomes.is_empty() {
        return Err(SelectError::EmptyCandidateList);
    }

    let mut dropped = 0;
    let mut candidates = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            CandidateOutcome::Executed(record) => candidates.push(record),
            CandidateOutcome::Dropped { label, reason } => {
                warn!(label = %label, reason = %reason, "candidate dropped before selection");
                dropped += 1;
            }
        }
    }

    if candidates.is_empty() {
        return Err(SelectError::NoVerifiableCandidate { dropped });
    }
    pick_best(candidates, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::TestOutcome;

    fn record(label: &str, total: u32, passed: u32, failed: u32) -> CandidateRecord {
        CandidateRecord::new(
            label,
            ProjectSnapshot::new("Demo"),
            TestOutcome::new(total, passed, failed),
        )
    }

    #[test]
    fn test_fewest_failures_wins() {
        let candidates = vec![
            record("a", 5, 2, 3),
            record("b", 5, 5, 0),
            record("c", 5, 4, 1),
        ];
        let selection = pick_best(candidates, &FewestFailures).unwrap();
        assert_eq!(selection.winner.label(), "b");
        assert_eq!(selection.verdict, Verdict::Verified);
        let order: Vec<&str> = selection.ranking.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates = vec![record("first", 2, 2, 0), record("second", 2, 2, 0)];
        let selection = pick_best(candidates, &FewestFailures).unwrap();
        assert_eq!(selection.winner.label(), "first");
    }

    #[test]
    fn test_empty_list_is_an_error() {
        let err = pick_best(Vec::new(), &FewestFailures).unwrap_err();
        assert_eq!(err, SelectError::EmptyCandidateList);
    }

    #[test]
    fn test_zero_tests_ranks_like_sentinel() {
        // 99 genuine failures still beat a suite that found nothing.
        let candidates = vec![record("empty", 0, 0, 0), record("bad", 120, 21, 99)];
        let selection = pick_best(candidates, &FewestFailures).unwrap();
        assert_eq!(selection.winner.label(), "bad");
    }

    #[test]
    fn test_most_changes_prefers_larger_diff() {
        let source = ProjectSnapshot::new("Demo").with_file("a.txt", "x\n");
        let small = source.clone().with_file("b.txt", "b\n");
        let large = small.clone().with_file("c.txt", "c\n");
        let candidates = vec![
            CandidateRecord::new("small", small, TestOutcome::new(1, 1, 0)),
            CandidateRecord::new("large", large.clone(), TestOutcome::new(1, 1, 0)),
            CandidateRecord::new("failing", large.with_file("d.txt", "d\n"), TestOutcome::new(2, 1, 1)),
        ];
        let policy = MostChanges::new(&source);
        let selection = pick_best(candidates, &policy).unwrap();
        assert_eq!(selection.winner.label(), "large");
        assert_eq!(selection.ranking[0].score, Score::new(2));
        assert_eq!(selection.ranking[2].score, Score::new(3 - FAILURE_PENALTY));
    }

    #[test]
    fn test_test_suite_breaks_ties_on_passed() {
        let candidates = vec![record("few", 3, 3, 0), record("many", 8, 8, 0)];
        let selection = pick_best(candidates, &TestSuite).unwrap();
        assert_eq!(selection.winner.label(), "many");
    }

    #[test]
    fn test_verdicts() {
        assert_eq!(Verdict::of(&record("a", 0, 0, 0)), Verdict::Unverified);
        assert_eq!(Verdict::of(&record("a", 3, 2, 1)), Verdict::TestsFailed);
        let broken = CandidateRecord::new(
            "b",
            ProjectSnapshot::new("Demo"),
            TestOutcome::unverified("error CS1002: ; expected"),
        );
        assert_eq!(Verdict::of(&broken), Verdict::CompileFailed);
    }

    #[test]
    fn test_all_dropped_is_not_verifiable() {
        let outcomes = vec![
            CandidateOutcome::Dropped {
                label: "a".into(),
                reason: "timeout".into(),
            },
            CandidateOutcome::Dropped {
                label: "b".into(),
                reason: "runner crashed".into(),
            },
        ];
        let err = pick_from_outcomes(outcomes, &FewestFailures).unwrap_err();
        assert_eq!(err, SelectError::NoVerifiableCandidate { dropped: 2 });
    }

    #[test]
    fn test_dropped_candidates_are_skipped() {
        let outcomes = vec![
            CandidateOutcome::Dropped {
                label: "a".into(),
                reason: "timeout".into(),
            },
            CandidateOutcome::Executed(record("b", 1, 0, 1)),
        ];
        let selection = pick_from_outcomes(outcomes, &FewestFailures).unwrap();
        assert_eq!(selection.winner.label(), "b");
        assert_eq!(selection.ranking.len(), 1);
    }

    #[test]
    fn test_policy_kind_parsing() {
        assert_eq!("most_changes".parse::<PolicyKind>(), Ok(PolicyKind::MostChanges));
        assert_eq!(" Test-Suite ".parse::<PolicyKind>(), Ok(PolicyKind::TestSuite));
        assert!("biggest".parse::<PolicyKind>().is_err());
        assert_eq!(PolicyKind::for_target("java21"), Some(PolicyKind::MostChanges));
        assert_eq!(PolicyKind::for_target("dotnet8"), Some(PolicyKind::FewestFailures));
        assert_eq!(PolicyKind::for_target("cobol"), None);
    }
}
