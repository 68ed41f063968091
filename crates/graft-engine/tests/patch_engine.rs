//! End-to-end behavior of parse, apply and select.

use graft_core::{
    CandidateRecord, FileOperation, OperationError, Project, ProjectSnapshot, SelectError,
    TestOutcome,
};
use graft_engine::select::compute_metrics;
use graft_engine::{
    apply, apply_edit_description, parse_edit_description, pick_best, ApplyOptions, FewestFailures,
    MatchTier, OperationOutcome,
};

fn project() -> ProjectSnapshot {
    ProjectSnapshot::new("Hashids.net")
        .with_file(
            "src/Hashids.cs",
            "namespace HashidsNet\n{\n    public class Hashids\n    {\n        public int Length => 0;\n    }\n}\n",
        )
        .with_file("main.py", "a = 1")
}

#[test]
fn test_simple_update_succeeds() {
    let text = "main.py\n<<<< SEARCH\na = 1\n====\na = 2\n>>>> REPLACE\n";
    let result = apply_edit_description(&project(), text, ApplyOptions::default());
    assert!(result.all_succeeded);
    assert_eq!(result.snapshot.get_file("main.py"), Some("a = 2"));
}

#[test]
fn test_reapplying_update_fails_without_corruption() {
    let source = project();
    let op = FileOperation::new(
        "src/Hashids.cs",
        "public int Length => 0;\n",
        "public int Length => 8;\n",
    );
    let once = apply(&source, std::slice::from_ref(&op));
    assert!(once.all_succeeded);

    let twice = apply(&once.snapshot, &[op]);
    assert!(!twice.all_succeeded);
    assert_eq!(
        twice.outcomes[0],
        OperationOutcome::Failed(OperationError::UnmatchedSearch {
            path: "src/Hashids.cs".to_string()
        })
    );
    assert_eq!(twice.snapshot, once.snapshot);
}

#[test]
fn test_first_occurrence_only() {
    let source = ProjectSnapshot::new("Demo").with_file("a.cs", "x();\nx();\nx();\n");
    let result = apply(&source, &[FileOperation::new("a.cs", "x();\n", "y();\n")]);
    assert_eq!(result.snapshot.get_file("a.cs"), Some("y();\nx();\nx();\n"));
}

#[test]
fn test_whitespace_tolerant_update_reindents() {
    let text = "\
src/Hashids.cs
<<<< SEARCH
public class Hashids
{
    public int Length => 0;
}
====
public class Hashids
{
    public int Length => 0;
    public int Salt => 1;
}
>>>> REPLACE
";
    let result = apply_edit_description(&project(), text, ApplyOptions::default());
    assert!(result.all_succeeded);
    assert_eq!(
        result.outcomes[0],
        OperationOutcome::Updated {
            path: "src/Hashids.cs".to_string(),
            tier: MatchTier::Fuzzy
        }
    );
    assert_eq!(
        result.snapshot.get_file("src/Hashids.cs"),
        Some("namespace HashidsNet\n{\n    public class Hashids\n    {\n        public int Length => 0;\n        public int Salt => 1;\n    }\n}\n")
    );
}

#[test]
fn test_search_starting_inside_a_block_reindents_each_level() {
    let text = "\
src/Hashids.cs
<<<< SEARCH
    public int Length => 0;
}
====
    public int Length => 8;
    public int Salt => 1;
}
>>>> REPLACE
";
    let result = apply_edit_description(&project(), text, ApplyOptions::default());
    assert!(result.all_succeeded);
    assert_eq!(
        result.outcomes[0],
        OperationOutcome::Updated {
            path: "src/Hashids.cs".to_string(),
            tier: MatchTier::Fuzzy
        }
    );
    assert_eq!(
        result.snapshot.get_file("src/Hashids.cs"),
        Some("namespace HashidsNet\n{\n    public class Hashids\n    {\n        public int Length => 8;\n        public int Salt => 1;\n    }\n}\n")
    );
}

#[test]
fn test_search_starting_inside_a_block_keeps_crlf() {
    let source = ProjectSnapshot::new("Demo").with_file(
        "A.java",
        "class A {\r\n    void f() {\r\n        x();\r\n    }\r\n}\r\n",
    );
    let result = apply(
        &source,
        &[FileOperation::new("A.java", "  x();\n}\n", "  y();\n}\n")],
    );
    assert!(result.all_succeeded);
    assert_eq!(
        result.snapshot.get_file("A.java"),
        Some("class A {\r\n    void f() {\r\n        y();\r\n    }\r\n}\r\n")
    );
}

#[test]
fn test_bom_is_preserved() {
    let source = ProjectSnapshot::new("Demo").with_file("P.cs", "\u{feff}using System;\nclass P {}\n");
    let result = apply(
        &source,
        &[FileOperation::new("P.cs", "using System;\n", "using System.IO;\n")],
    );
    assert!(result.all_succeeded);
    assert_eq!(
        result.snapshot.get_file("P.cs"),
        Some("\u{feff}using System.IO;\nclass P {}\n")
    );
}

#[test]
fn test_partial_batch_success() {
    let source = ProjectSnapshot::new("Demo")
        .with_file("a.txt", "a\n")
        .with_file("c.txt", "c\n");
    let ops = vec![
        FileOperation::new("a.txt", "a\n", "A\n"),
        FileOperation::new("b.txt", "b\n", "B\n"),
        FileOperation::new("c.txt", "c\n", "C\n"),
    ];
    let result = apply(&source, &ops);
    assert!(!result.all_succeeded);
    assert_eq!(result.snapshot.get_file("a.txt"), Some("A\n"));
    assert_eq!(result.snapshot.get_file("c.txt"), Some("C\n"));
    assert!(!result.snapshot.contains("b.txt"));
    assert_eq!(result.failed_count(), 1);
}

#[test]
fn test_traversal_and_absolute_paths_never_land() {
    let text = "\
../../etc/passwd
<<<< SEARCH
====
root::0:0::/root:/bin/sh
>>>> REPLACE
/etc/hosts
<<<< SEARCH
====
127.0.0.1 evil
>>>> REPLACE
";
    let parsed = parse_edit_description(text, "Demo");
    assert_eq!(parsed.operations().count(), 2);

    let result = apply_edit_description(&project(), text, ApplyOptions::default());
    assert!(!result.all_succeeded);
    assert!(result.outcomes.iter().all(|o| !o.is_success()));
    assert!(result.snapshot.paths().all(|p| !p.contains("etc")));

    // Operations built by hand are still checked by the applier.
    let direct = apply(
        &project(),
        &[
            FileOperation::create("../../etc/passwd", "x"),
            FileOperation::create("/etc/hosts", "x"),
            FileOperation::create("C:\\Windows\\win.ini", "x"),
        ],
    );
    assert!(direct
        .outcomes
        .iter()
        .all(|o| matches!(o, OperationOutcome::Failed(OperationError::InvalidPath { .. }))));
    assert_eq!(direct.snapshot, project());
}

#[test]
fn test_display_name_prefix_and_quotes_are_stripped() {
    let text = "`Hashids.net/main.py`\n<<<< SEARCH\na = 1\n====\na = 3\n>>>> REPLACE\n";
    let result = apply_edit_description(&project(), text, ApplyOptions::default());
    assert!(result.all_succeeded);
    assert_eq!(result.snapshot.get_file("main.py"), Some("a = 3"));
}

#[test]
fn test_malformed_block_does_not_hide_the_rest() {
    let text = "\
Some prose first.
main.py
<<<< SEARCH
a = 1
<<<< SEARCH
a = 1
====
a = 5
>>>> REPLACE
";
    let result = apply_edit_description(&project(), text, ApplyOptions::default());
    // The first block is interrupted and the line above the second marker is not a path.
    assert!(!result.all_succeeded);
    assert_eq!(result.snapshot, project());

    let text = "\
new file path: log4net.config
<<<< SEARCH
====
<log4net />
>>>> REPLACE
main.py
<<<< SEARCH
a = 1
====
a = 5
>>>> REPLACE
";
    let result = apply_edit_description(&project(), text, ApplyOptions::default());
    assert!(!result.all_succeeded);
    assert_eq!(result.malformed.len(), 1);
    assert_eq!(result.snapshot.get_file("main.py"), Some("a = 5"));
}

fn candidate(label: &str, total: u32, passed: u32, failed: u32) -> CandidateRecord {
    CandidateRecord::new(label, project(), TestOutcome::new(total, passed, failed))
}

#[test]
fn test_selector_default_policy() {
    let candidates = vec![
        candidate("one", 10, 7, 3),
        candidate("two", 10, 10, 0),
        candidate("three", 10, 9, 1),
    ];
    let selection = pick_best(candidates, &FewestFailures).unwrap();
    assert_eq!(selection.winner.test_failed(), 0);
    assert_eq!(selection.winner.label(), "two");
}

#[test]
fn test_selector_tie_break_is_input_order() {
    let candidates = vec![candidate("first", 4, 3, 1), candidate("second", 4, 3, 1)];
    let selection = pick_best(candidates, &FewestFailures).unwrap();
    assert_eq!(selection.winner.label(), "first");
}

#[test]
fn test_selector_survives_zero_total() {
    let candidates = vec![candidate("empty", 0, 0, 0), candidate("ok", 2, 1, 1)];
    let selection = pick_best(candidates.clone(), &FewestFailures).unwrap();
    assert_eq!(selection.winner.label(), "ok");
    let metrics = selection.metrics.expect("metrics computed");
    assert_eq!(metrics.avg_pass_percent, 25.0);

    let only_empty = compute_metrics(&candidates[..1], &candidates[0]).unwrap();
    assert_eq!(only_empty.avg_pass_percent, 0.0);
}

#[test]
fn test_selector_rejects_empty_input() {
    assert_eq!(
        pick_best(Vec::new(), &FewestFailures).unwrap_err(),
        SelectError::EmptyCandidateList
    );
}
