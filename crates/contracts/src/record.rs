//! Backend run records - Segmentation output
//!
//! Recreated from scratch on every run of a backend.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::Backend;

/// Result of one successful backend run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRunRecord {
    pub backend: Backend,

    /// `proc/seg/<Backend>`
    pub output_dir: PathBuf,

    /// Raw backend output before normalization
    pub raw_output: PathBuf,

    /// Binarized lesion mask
    pub mask: PathBuf,

    /// Lesion volume in ml
    pub volume_ml: f64,

    /// Whole minutes between backend start and volume computation
    pub elapsed_minutes: u64,

    /// Wall-clock time of the whole backend run
    pub elapsed: Duration,

    /// `WMH_<Backend>.txt` at the workspace root
    pub result_file: PathBuf,

    /// `WMH_<Backend>.nii` at the workspace root
    pub published_mask: PathBuf,
}

/// Outcome of a backend branch
#[derive(Debug)]
pub enum BackendOutcome {
    Succeeded(BackendRunRecord),
    Failed {
        backend: Backend,
        error: crate::ContractError,
        elapsed: Duration,
    },
}

impl BackendOutcome {
    pub fn backend(&self) -> Backend {
        match self {
            BackendOutcome::Succeeded(record) => record.backend,
            BackendOutcome::Failed { backend, .. } => *backend,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BackendOutcome::Succeeded(_))
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            BackendOutcome::Succeeded(record) => record.elapsed,
            BackendOutcome::Failed { elapsed, .. } => *elapsed,
        }
    }

    pub fn error(&self) -> Option<&crate::ContractError> {
        match self {
            BackendOutcome::Succeeded(_) => None,
            BackendOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn record(&self) -> Option<&BackendRunRecord> {
        match self {
            BackendOutcome::Succeeded(record) => Some(record),
            BackendOutcome::Failed { .. } => None,
        }
    }
}
