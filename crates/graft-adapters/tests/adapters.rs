use graft_adapters::config::Config;
use graft_adapters::{load_outcomes, load_project, save_project};
use graft_core::Project;
use graft_engine::{
    apply_edit_description, pick_from_outcomes, ApplyOptions, CandidateOutcome, FewestFailures,
};
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_load_skips_build_dirs_and_binary_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Hashids.net");
    write(&root, "src/Hashids.cs", b"class Hashids {}\n");
    write(&root, "Hashids.net.csproj", b"<Project />\n");
    write(&root, "bin/Debug/Hashids.dll", b"MZ");
    write(&root, "node_modules/x/index.js", b"x");
    write(&root, ".git/HEAD", b"ref: refs/heads/main\n");
    write(&root, "logo.png", &[0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe]);

    let project = load_project(&root, None).unwrap();
    assert_eq!(project.display_name(), "Hashids.net");
    let paths: Vec<&str> = project.paths().collect();
    assert_eq!(paths, vec!["Hashids.net.csproj", "src/Hashids.cs"]);
}

#[test]
fn test_apply_and_save_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Demo");
    write(&root, "src/a.py", b"a = 1\n");
    write(&root, "old.txt", b"bye\n");

    let project = load_project(&root, None).unwrap();
    let edits = "Demo/src/a.py\n<<<< SEARCH\na = 1\n====\na = 2\n>>>> REPLACE\nold.txt\n<<<< SEARCH\n====\n>>>> REPLACE\n";
    let result = apply_edit_description(&project, edits, ApplyOptions::default());
    assert!(result.all_succeeded);

    let out = dir.path().join("out");
    assert_eq!(save_project(&result.snapshot, &out).unwrap(), 1);
    assert_eq!(fs::read_to_string(out.join("src/a.py")).unwrap(), "a = 2\n");
    assert!(!out.join("old.txt").exists());

    // A second save into the same directory is refused.
    assert!(save_project(&result.snapshot, &out).is_err());
}

#[test]
fn test_manifest_to_selection() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "c1/Program.cs", b"class A {}\n");
    write(dir.path(), "c2/Program.cs", b"class B {}\n");
    let manifest = r#"{
        "candidates": [
            {"label": "c1", "project": "c1",
             "report": {"total_tests": 4, "passed_tests": 3, "failed_tests": 1}},
            {"label": "c2", "project": "c2",
             "report": {"total_tests": 4, "passed_tests": 4, "failed_tests": 0, "runtime_ms": 1200}},
            {"label": "c3", "project": "c3", "execution_error": "dotnet test timed out"},
            {"label": "c4", "project": "missing",
             "report": {"total_tests": 4, "passed_tests": 4, "failed_tests": 0}}
        ]
    }"#;
    let manifest_path = dir.path().join("manifest.json");
    fs::write(&manifest_path, manifest).unwrap();

    let outcomes = load_outcomes(&manifest_path, Some("Demo"), 10_000).unwrap();
    assert_eq!(outcomes.len(), 4);
    assert!(matches!(&outcomes[2], CandidateOutcome::Dropped { label, .. } if label == "c3"));
    assert!(matches!(&outcomes[3], CandidateOutcome::Dropped { label, .. } if label == "c4"));

    let selection = pick_from_outcomes(outcomes, &FewestFailures).unwrap();
    assert_eq!(selection.winner.label(), "c2");
    assert_eq!(
        selection.winner.snapshot().get_file("Program.cs"),
        Some("class B {}\n")
    );
    assert_eq!(selection.winner.outcome().runtime_ms, Some(1200));

    let out = dir.path().join("winner");
    let winner = selection.into_winner().into_snapshot();
    assert_eq!(save_project(&winner, &out).unwrap(), 1);
    assert_eq!(fs::read_to_string(out.join("Program.cs")).unwrap(), "class B {}\n");
}

#[test]
fn test_corrupt_config_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graft.toml");
    fs::write(&path, "[selection\npolicy = ").unwrap();

    let config = Config::load_first(&[path.clone()]);
    assert_eq!(config, Config::default());
    assert!(!path.exists());
    assert!(dir.path().join("graft.toml.corrupt").exists());
}

#[test]
fn test_explicit_config_errors_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    assert!(Config::load(Some(&path)).is_err());

    fs::write(&path, "[apply]\nfuzzy_ambiguity = \"reject\"\n").unwrap();
    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(
        config.apply_options().fuzzy_ambiguity,
        graft_engine::FuzzyAmbiguity::Reject
    );
}

#[test]
fn test_config_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/config.toml");
    let mut config = Config::default();
    config.parse.display_name = Some("Demo".to_string());
    config.save(&path).unwrap();
    assert_eq!(Config::load_from(&path).unwrap(), config);
}
