//! # Contracts
//!
//! Shared interface contracts for the WMH segmentation pipeline: backend
//! identifiers, volume references, the tool-invocation seam, pipeline
//! settings and the unified error type.
//! Every other crate depends on this one; reverse dependencies are prohibited.
//!
//! ## Path model
//! - All paths crossing a crate boundary are absolute.
//! - No operation depends on the process working directory; each tool
//!   invocation carries its own explicit working directory.

mod backend;
mod error;
pub mod layout;
mod record;
mod settings;
mod stage;
mod tool;
mod volume;

pub use backend::{Backend, BackendKind, BackendSelection};
pub use error::{ContractError, Result};
pub use record::{BackendOutcome, BackendRunRecord};
pub use settings::*;
pub use stage::Stage;
pub use tool::{verify_outputs, LocalToolRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use volume::{Geometry, Orientation, Spacing, VolumeName, VolumeRef};
