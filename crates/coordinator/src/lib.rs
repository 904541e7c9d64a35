//! # Coordinator
//!
//! Run state machine:
//!
//! ```text
//! Init -> ValidateInputs -> EnsureWorkspace -> Preprocess | SkipPreprocess -> RunBackends -> Done
//! ```
//!
//! No backend starts before preprocessing has completed or has been found
//! complete. A failing backend is recorded and the remaining backends still
//! run, unless fail-fast is requested.

mod coordinator;
mod error;
mod report;
mod state;

pub use coordinator::{Coordinator, RunPlan, RunRequest};
pub use error::{CoordinatorError, Result};
pub use report::RunReport;
pub use state::RunState;
