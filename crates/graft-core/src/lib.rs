//! Core domain model and contracts for graft.
//!
//! Everything here is plain data plus the rules that data has to obey. Parsing,
//! matching, and ranking live in `graft-engine`.

pub mod candidate;
pub mod error;
pub mod operation;
pub mod path;
pub mod snapshot;

pub use candidate::{CandidateRecord, TestOutcome, SENTINEL_FAILED_TESTS};
pub use error::{MalformedBlock, OperationError, SelectError};
pub use operation::{FileOperation, OperationKind};
pub use snapshot::{Project, ProjectSnapshot};
