//! Runtime adapters for graft (config, project directories, execution results, reports).

pub mod config;
pub mod report;
pub mod results;
pub mod util;
pub mod workspace;

pub use config::Config;
pub use results::{load_outcomes, ExecutionReport, Manifest, ManifestEntry};
pub use workspace::{load_project, save_project};
