//! Coordinator error types

use std::path::PathBuf;

use contracts::{Backend, ContractError};
use thiserror::Error;

use crate::RunReport;

/// Terminal failure of a run
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Required argument missing or invalid
    #[error("missing required argument: {message}")]
    MissingRequiredArgument { message: String },

    /// Input does not resolve to a regular file
    #[error("input not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    /// Workspace layout could not be established
    #[error("workspace setup failed: {0}")]
    Workspace(#[source] ContractError),

    /// Preprocessing aborted; no backend ran
    #[error("preprocessing failed: {0}")]
    PreprocessingFailed(#[source] ContractError),

    /// Backend failed with fail-fast enabled
    #[error("backend {backend} failed: {source}")]
    BackendFailed {
        backend: Backend,
        #[source]
        source: ContractError,
        /// Backends that finished before the failing one
        report: Box<RunReport>,
    },
}

impl CoordinatorError {
    /// Caller errors (exit code 1) as opposed to pipeline failures
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredArgument { .. } | Self::InputNotFound { .. }
        )
    }

    /// Partial report of a run stopped by fail-fast
    pub fn partial_report(&self) -> Option<&RunReport> {
        match self {
            Self::BackendFailed { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Map a workspace-stage contract error
    pub(crate) fn from_workspace(error: ContractError) -> Self {
        match error {
            ContractError::InputNotFound { path } => Self::InputNotFound { path },
            ContractError::Usage { message } => Self::MissingRequiredArgument { message },
            other => Self::Workspace(other),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, CoordinatorError>;
