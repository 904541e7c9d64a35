//! # Toolkit
//!
//! External tool execution module.
//!
//! Responsibilities:
//! - Execute `ToolInvocation`s as child processes with a time budget
//! - Provide a mock runner with canned outputs and failure injection
//! - Wrap the imaging suites (AFNI, FSL, ANTs, FreeSurfer, nifti_tool),
//!   MATLAB and container runtimes behind typed operations
//!
//! ## Usage
//!
//! ```ignore
//! use toolkit::{ProcessRunner, Toolbox, ToolContext};
//!
//! let runner = ProcessRunner::new();
//! let tools = Toolbox::new(&runner, &settings, ToolContext::preprocess(&root, 4, None));
//! if tools.is_oblique(&t1).await? {
//!     tools.deoblique(&t1).await?;
//! }
//! ```

pub mod mock_runner;
pub mod runner;
pub mod toolbox;
pub mod tools;

pub use contracts::{ToolInvocation, ToolOutput, ToolRunner};
pub use mock_runner::{MockConfig, MockToolRunner};
pub use runner::ProcessRunner;
pub use toolbox::{ToolContext, Toolbox};
pub use tools::container::Mount;
pub use tools::fsl::DimSwap;
