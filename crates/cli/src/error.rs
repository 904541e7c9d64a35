//! Error types for CLI operations.

use coordinator::CoordinatorError;
use thiserror::Error;

/// Exit code for usage errors and missing inputs
pub const EXIT_USAGE: u8 = 1;
/// Exit code when preprocessing or any backend failed
pub const EXIT_FAILURE: u8 = 2;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Required option absent
    #[error("missing required argument: {flag}")]
    MissingArgument { flag: &'static str },

    /// Settings file not found
    #[error("settings file not found: {path}")]
    ConfigNotFound { path: String },

    /// Run finished but some backends failed
    #[error("{failed} of {total} backend(s) failed")]
    BackendsFailed { failed: usize, total: usize },
}

impl CliError {
    pub fn missing_argument(flag: &'static str) -> Self {
        Self::MissingArgument { flag }
    }

    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Process exit code for an error that reached `main`
pub fn exit_code(error: &anyhow::Error) -> u8 {
    if let Some(cli) = error.downcast_ref::<CliError>() {
        return match cli {
            CliError::MissingArgument { .. } | CliError::ConfigNotFound { .. } => EXIT_USAGE,
            CliError::BackendsFailed { .. } => EXIT_FAILURE,
        };
    }
    if let Some(coordinator) = error.downcast_ref::<CoordinatorError>() {
        return if coordinator.is_usage() { EXIT_USAGE } else { EXIT_FAILURE };
    }
    if let Some(contract) = error.downcast_ref::<contracts::ContractError>() {
        return if contract.is_usage() { EXIT_USAGE } else { EXIT_FAILURE };
    }
    EXIT_FAILURE
}
