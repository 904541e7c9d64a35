//! Segmentation backend identifiers and the caller's selection set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// WMH segmentation backend
///
/// Declaration order is the canonical run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Backend {
    /// Lesion Prediction Algorithm (SPM/LST toolbox, run in MATLAB)
    #[serde(rename = "LPA")]
    Lpa,
    #[serde(rename = "PGS")]
    Pgs,
    #[serde(rename = "SYSU")]
    Sysu,
    #[serde(rename = "FMRIB")]
    Fmrib,
    #[serde(rename = "UCD")]
    Ucd,
    #[serde(rename = "LSTAI", alias = "LST-AI")]
    LstAi,
    /// FreeSurfer WMH-SynthSeg
    #[serde(rename = "WMHsynthseg")]
    WmhSynthSeg,
}

/// How a backend is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process statistical toolbox driven through MATLAB
    Matlab,
    /// Containerized batch tool
    Container,
    /// FreeSurfer command-line tool
    FreeSurfer,
}

impl Backend {
    /// All backends, in canonical order
    pub const ALL: [Backend; 7] = [
        Backend::Lpa,
        Backend::Pgs,
        Backend::Sysu,
        Backend::Fmrib,
        Backend::Ucd,
        Backend::LstAi,
        Backend::WmhSynthSeg,
    ];

    /// Name used in file names and on the command line
    pub fn name(self) -> &'static str {
        match self {
            Backend::Lpa => "LPA",
            Backend::Pgs => "PGS",
            Backend::Sysu => "SYSU",
            Backend::Fmrib => "FMRIB",
            Backend::Ucd => "UCD",
            Backend::LstAi => "LSTAI",
            Backend::WmhSynthSeg => "WMHsynthseg",
        }
    }

    pub fn kind(self) -> BackendKind {
        match self {
            Backend::Lpa => BackendKind::Matlab,
            Backend::WmhSynthSeg => BackendKind::FreeSurfer,
            _ => BackendKind::Container,
        }
    }

    /// Look up a backend by name (case-insensitive, `LST-AI` accepted)
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.replace('-', "").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|b| b.name().to_ascii_lowercase() == normalized)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ContractError::usage(format!("unknown backend '{s}'")))
    }
}

/// Set of backends chosen by the caller
///
/// Iterates in canonical order regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSelection(BTreeSet<Backend>);

impl BackendSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection containing every backend
    pub fn all() -> Self {
        Self(Backend::ALL.into_iter().collect())
    }

    pub fn insert(&mut self, backend: Backend) -> bool {
        self.0.insert(backend)
    }

    pub fn contains(&self, backend: Backend) -> bool {
        self.0.contains(&backend)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Backend> + '_ {
        self.0.iter().copied()
    }

    /// An empty selection is invalid input
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.is_empty() {
            return Err(ContractError::usage(
                "no segmentation backend selected (use -doLPA, -doPGS, -doSYSU, -doFMRIB, \
                 -doUCD, -doLSTAI, -doWMHsynthseg or -doALL)",
            ));
        }
        Ok(())
    }
}

impl FromIterator<Backend> for BackendSelection {
    fn from_iter<I: IntoIterator<Item = Backend>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Backend::name).collect();
        write!(f, "{}", names.join(","))
    }
}
