//! Pipeline stage identifiers, used for error context and logging.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Input validation and workspace layout
    Workspace,
    /// T1/FLAIR alignment
    Preprocess,
    /// A segmentation backend run
    Segmentation,
    /// Volume measurement and publishing
    Report,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Workspace => "workspace",
            Stage::Preprocess => "preprocess",
            Stage::Segmentation => "segmentation",
            Stage::Report => "report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
