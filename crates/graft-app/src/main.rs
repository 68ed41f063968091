//! graft - apply model-generated edits and pick the best verified candidate
//!
//! `parse` and `apply` work on one edit description; `pick` ranks candidates that
//! were already compiled and tested by an external toolchain runner.

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use graft_adapters::config::Config;
use graft_adapters::report::{write_json, ApplyReport, DroppedCandidate, SelectionReport};
use graft_adapters::util::write_atomic;
use graft_adapters::{load_outcomes, load_project, save_project};
use graft_core::Project;
use graft_engine::{
    apply_edit_description, parse_edit_description, pick_from_outcomes, render_change_report,
    render_operations, CandidateOutcome, ParsedBlock, PolicyKind, Verdict, EDIT_FORMAT_GUIDE,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit status when an edit description applied only partially.
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "graft",
    about = "Apply search/replace edits to projects and pick the best verified candidate",
    version
)]
struct Args {
    /// Config file (defaults to ./graft.toml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse an edit description and list the operations it contains
    Parse {
        /// File holding the edit description
        edits: PathBuf,

        /// Project name stripped from the front of paths
        #[arg(long)]
        display_name: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Apply an edit description to a project directory
    Apply {
        /// Project directory to patch
        #[arg(long)]
        project: PathBuf,

        /// File holding the edit description
        #[arg(long)]
        edits: PathBuf,

        /// Empty or missing directory receiving the patched project
        #[arg(long)]
        out: PathBuf,

        /// Write a change report (totals, per-file diffs, parsed operations)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Project name stripped from the front of paths
        #[arg(long)]
        display_name: Option<String>,

        /// Print a JSON summary to stdout
        #[arg(long)]
        json: bool,
    },

    /// Pick the best candidate from a toolchain result manifest
    Pick {
        /// Manifest written by the toolchain runner
        #[arg(long)]
        manifest: PathBuf,

        /// Unpatched project directory the candidates were generated from
        #[arg(long)]
        source: PathBuf,

        /// Scoring policy (fewest-failures, most-changes, test-suite)
        #[arg(long)]
        policy: Option<PolicyKind>,

        /// Target language used to choose the policy
        #[arg(long, conflicts_with = "policy")]
        target: Option<String>,

        /// Write the selection report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Empty or missing directory receiving the winning project
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the selection report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the edit description format guide
    Format,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("  Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Parse {
            edits,
            display_name,
            json,
        } => {
            let name = display_name
                .or_else(|| config.parse.display_name.clone())
                .unwrap_or_default();
            parse_command(&edits, &name, json)
        }
        Command::Apply {
            project,
            edits,
            out,
            report,
            display_name,
            json,
        } => {
            let name = display_name.or_else(|| config.parse.display_name.clone());
            apply_command(&config, &project, &edits, &out, report.as_deref(), name, json)
        }
        Command::Pick {
            manifest,
            source,
            policy,
            target,
            report,
            out,
            json,
        } => {
            let policy = match policy {
                Some(policy) => policy,
                None => config.policy_for(target.as_deref())?,
            };
            let paths = PickPaths {
                manifest: &manifest,
                source: &source,
                report: report.as_deref(),
                out: out.as_deref(),
            };
            pick_command(&config, paths, policy, json)
        }
        Command::Format => {
            print!("{}", EDIT_FORMAT_GUIDE);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_edits(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read edits {}", path.display()))
}

fn parse_command(edits: &Path, display_name: &str, json: bool) -> Result<ExitCode> {
    let text = read_edits(edits)?;
    let parsed = parse_edit_description(&text, display_name);

    if json {
        let operations: Vec<_> = parsed.operations().collect();
        let malformed: Vec<_> = parsed.malformed().collect();
        let value = serde_json::json!({
            "well_formed": parsed.well_formed(),
            "operations": operations,
            "malformed": malformed,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for block in &parsed.blocks {
            match block {
                ParsedBlock::WellFormed(op) => println!("  {:<7} {}", op.kind().as_str(), op.path),
                ParsedBlock::Malformed(reason) => println!("  ! {}", reason),
            }
        }
        println!(
            "  {} operations, {} malformed blocks",
            parsed.operations().count(),
            parsed.malformed().count()
        );
    }

    if parsed.well_formed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}

fn apply_command(
    config: &Config,
    project_dir: &Path,
    edits: &Path,
    out: &Path,
    report: Option<&Path>,
    display_name: Option<String>,
    json: bool,
) -> Result<ExitCode> {
    let project = load_project(project_dir, display_name.as_deref())?;
    let text = read_edits(edits)?;
    let result = apply_edit_description(&project, &text, config.apply_options());

    let written = save_project(&result.snapshot, out)?;

    if let Some(path) = report {
        let mut content = render_change_report(&project, &result.snapshot);
        content.push_str("\nOperations:\n");
        content.push_str(&render_operations(&result.operations));
        write_atomic(path, &content)?;
    }

    if json {
        let summary = ApplyReport::new(project.display_name(), &result);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for outcome in &result.outcomes {
            let mark = if outcome.is_success() { "+" } else { "!" };
            println!("  {} {}", mark, outcome.describe());
        }
        for reason in &result.malformed {
            println!("  ! discarded block: {}", reason);
        }
        println!("  Wrote {} files to {}", written, out.display());
    }

    if result.all_succeeded {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "  Warning: {} of the edits could not be applied",
            result.failed_count()
        );
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}

/// Files read and written by `graft pick`.
struct PickPaths<'a> {
    manifest: &'a Path,
    source: &'a Path,
    report: Option<&'a Path>,
    out: Option<&'a Path>,
}

fn pick_command(
    config: &Config,
    paths: PickPaths<'_>,
    policy: PolicyKind,
    json: bool,
) -> Result<ExitCode> {
    let display_name = config.parse.display_name.as_deref();
    let source = load_project(paths.source, display_name)?;
    let outcomes = load_outcomes(paths.manifest, display_name, config.selection.max_error_chars)?;

    let dropped: Vec<DroppedCandidate> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            CandidateOutcome::Dropped { label, reason } => Some(DroppedCandidate {
                label: label.clone(),
                reason: reason.clone(),
            }),
            CandidateOutcome::Executed(_) => None,
        })
        .collect();

    let scorer = policy.build(&source);
    let selection = pick_from_outcomes(outcomes, scorer.as_ref())?;
    let summary = SelectionReport::new(&selection, dropped);

    if let Some(path) = paths.report {
        write_json(path, &summary)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "  Winner: {} ({}, policy {})",
            selection.winner.label(),
            selection.verdict,
            selection.policy
        );
        for (rank, entry) in selection.ranking.iter().enumerate() {
            println!(
                "  {:>2}. {:<20} score {:>8}  passed {:>4}  failed {:>4}",
                rank + 1,
                entry.label,
                entry.score.to_string(),
                entry.passed,
                entry.failed
            );
        }
        for entry in &summary.dropped {
            println!("   -  {:<20} dropped: {}", entry.label, entry.reason);
        }
        if let Some(error) = selection.winner.compile_error() {
            println!("  Compile error:\n{}", error);
        }
    }

    if selection.verdict == Verdict::CompileFailed {
        eprintln!("  Warning: the best candidate does not compile");
    }

    if let Some(out) = paths.out {
        let winner = selection.into_winner().into_snapshot();
        let written = save_project(&winner, out)?;
        if !json {
            println!("  Wrote {} files to {}", written, out.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}
