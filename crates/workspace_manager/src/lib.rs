//! # Workspace Manager
//!
//! On-disk layout under the output root and the published artifact registry.
//!
//! Responsibilities:
//! - Resolve input and output paths against an explicit base directory
//! - Create `proc/orig`, `proc/pre`, `proc/seg` and the input reference links
//! - Name every canonical path, so no other crate formats layout paths
//! - Publish stable names at the workspace root (symlink or copy)

mod registry;
mod workspace;

pub use registry::ArtifactRegistry;
pub use workspace::Workspace;
