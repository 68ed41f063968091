//! Diagnostic tracing for the CLI.
//!
//! Diagnostics go to stderr so stdout stays clean for `--json` output. Library crates
//! only emit events; this is the one place a subscriber is installed.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn`, or `info` with `--verbose`.
///
/// # Example
/// ```bash
/// RUST_LOG=graft_engine=debug,graft::metrics=info graft apply ...
/// ```
pub fn init(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
