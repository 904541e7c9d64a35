//! Layered error definitions
//!
//! Categorized by source: usage / input / tool / workspace / config

use std::path::PathBuf;

use thiserror::Error;

use crate::{Backend, Stage};

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Caller Errors =====
    /// Bad or missing command-line arguments
    #[error("usage error: {message}")]
    Usage { message: String },

    /// Input path does not resolve to a regular file
    #[error("input not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    // ===== External Tool Errors =====
    /// Tool exited non-zero, could not be launched, or produced no expected output
    #[error(
        "{stage}{} failed: `{program}` ({}): {message}",
        backend_label(.backend),
        status_label(.status)
    )]
    ExternalToolFailure {
        stage: Stage,
        backend: Option<Backend>,
        program: String,
        status: Option<i32>,
        message: String,
    },

    /// Tool did not finish within its time budget and was killed
    #[error(
        "{stage}{} failed: `{program}` timed out after {timeout_secs}s",
        backend_label(.backend)
    )]
    ToolTimeout {
        stage: Stage,
        backend: Option<Backend>,
        program: String,
        timeout_secs: u64,
    },

    /// Tool stdout could not be interpreted
    #[error("unexpected output from `{program}`: {output:?}")]
    ToolOutputParse { program: String, output: String },

    // ===== Workspace Errors =====
    /// An artifact expected from an earlier stage is absent
    #[error("{stage} workspace error at {}: {message}", .path.display())]
    WorkspaceState {
        stage: Stage,
        path: PathBuf,
        message: String,
    },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn backend_label(backend: &Option<Backend>) -> String {
    backend.map(|b| format!(" [{b}]")).unwrap_or_default()
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "no exit status".to_string(),
    }
}

impl ContractError {
    /// Create usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create workspace state error
    pub fn workspace_state(
        stage: Stage,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::WorkspaceState {
            stage,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create tool output parse error
    pub fn tool_output(program: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ToolOutputParse {
            program: program.into(),
            output: output.into(),
        }
    }

    /// Backend the error belongs to, if any
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Self::ExternalToolFailure { backend, .. } | Self::ToolTimeout { backend, .. } => {
                *backend
            }
            _ => None,
        }
    }

    /// Exit status of the failed tool, if it ran to completion
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Self::ExternalToolFailure { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the error is caused by the caller rather than the pipeline
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. } | Self::InputNotFound { .. })
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ContractError>;
