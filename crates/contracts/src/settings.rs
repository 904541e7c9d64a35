//! Pipeline settings shared across crates.
//!
//! Every field has a default so an empty settings file (or none at all)
//! yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

use crate::Backend;

/// Complete pipeline settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineSettings {
    /// Install locations of the image-processing suites
    pub tools: ToolPaths,

    /// Container runtime and per-backend images
    #[validate(nested)]
    pub container: ContainerSettings,

    /// MATLAB session for LPA
    #[validate(nested)]
    pub matlab: MatlabSettings,

    /// FreeSurfer installs
    #[validate(nested)]
    pub freesurfer: FreeSurferSettings,

    /// Time budgets for external tools
    pub timeouts: TimeoutSettings,

    /// How results are published at the workspace root
    pub publish: PublishSettings,

    /// Preprocessing options
    pub preprocess: PreprocessSettings,

    /// Backend-specific options
    #[validate(nested)]
    pub segmentation: SegmentationSettings,
}

/// Image-processing tool suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSuite {
    Afni,
    Fsl,
    Ants,
    NiftiTools,
}

/// Optional `bin` directories; programs are looked up on `PATH` when unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub afni: Option<PathBuf>,
    pub fsl: Option<PathBuf>,
    pub ants: Option<PathBuf>,
    pub nifti_tools: Option<PathBuf>,
}

impl ToolPaths {
    /// Resolve a program name for the given suite
    pub fn program(&self, suite: ToolSuite, name: &str) -> String {
        let dir = match suite {
            ToolSuite::Afni => self.afni.as_deref(),
            ToolSuite::Fsl => self.fsl.as_deref(),
            ToolSuite::Ants => self.ants.as_deref(),
            ToolSuite::NiftiTools => self.nifti_tools.as_deref(),
        };
        resolve_program(dir, name)
    }
}

fn resolve_program(bin_dir: Option<&Path>, name: &str) -> String {
    match bin_dir {
        Some(dir) => dir.join(name).to_string_lossy().into_owned(),
        None => name.to_string(),
    }
}

/// Container runtime flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRuntime {
    #[default]
    Docker,
    Podman,
    Apptainer,
}

impl ContainerRuntime {
    pub fn default_binary(self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
            ContainerRuntime::Apptainer => "apptainer",
        }
    }
}

/// Container image for one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerImage {
    /// Image reference (registry name, or `.sif` path for apptainer)
    pub image: String,

    /// Extra arguments appended after the backend's own arguments
    #[serde(default)]
    pub args: Vec<String>,
}

impl ContainerImage {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            args: Vec::new(),
        }
    }
}

/// Container settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ContainerSettings {
    pub runtime: ContainerRuntime,

    /// Override for the runtime binary
    #[validate(length(min = 1))]
    pub binary: Option<String>,

    /// Backend -> image
    pub images: BTreeMap<Backend, ContainerImage>,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        let images = [
            (Backend::Pgs, "wmhchallenge/pgs"),
            (Backend::Sysu, "wmhchallenge/sysu_media"),
            (Backend::Fmrib, "wmhchallenge/fmrib-truenet"),
            (Backend::Ucd, "wmhchallenge/ucd"),
            (Backend::LstAi, "jqmcginnis/lst-ai"),
        ]
        .into_iter()
        .map(|(backend, image)| (backend, ContainerImage::new(image)))
        .collect();

        Self {
            runtime: ContainerRuntime::default(),
            binary: None,
            images,
        }
    }
}

impl ContainerSettings {
    pub fn runtime_binary(&self) -> String {
        self.binary
            .clone()
            .unwrap_or_else(|| self.runtime.default_binary().to_string())
    }

    pub fn image(&self, backend: Backend) -> Option<&ContainerImage> {
        self.images.get(&backend)
    }
}

/// MATLAB settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MatlabSettings {
    /// MATLAB executable
    #[validate(length(min = 1))]
    pub binary: String,

    /// SPM12 install added to the MATLAB path
    pub spm_dir: Option<PathBuf>,

    /// LST toolbox install added to the MATLAB path
    pub lst_dir: Option<PathBuf>,
}

impl Default for MatlabSettings {
    fn default() -> Self {
        Self {
            binary: "matlab".to_string(),
            spm_dir: None,
            lst_dir: None,
        }
    }
}

/// FreeSurfer settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FreeSurferSettings {
    /// Install used for SynthSR during preprocessing
    pub home: Option<PathBuf>,

    /// Install providing `mri_WMHsynthseg` (typically a newer release)
    pub wmh_home: Option<PathBuf>,

    /// Label value of the WMH class in the SynthSeg output
    #[validate(range(min = 1))]
    pub wmh_label: u32,

    /// Inference device passed to WMH-SynthSeg
    #[validate(length(min = 1))]
    pub device: String,
}

impl Default for FreeSurferSettings {
    fn default() -> Self {
        Self {
            home: None,
            wmh_home: None,
            wmh_label: 77,
            device: "cpu".to_string(),
        }
    }
}

impl FreeSurferSettings {
    /// Program inside the preprocessing install
    pub fn program(&self, name: &str) -> String {
        resolve_program(self.home.as_ref().map(|h| h.join("bin")).as_deref(), name)
    }

    /// Install used by WMH-SynthSeg, falling back to the main one
    pub fn wmh_install(&self) -> Option<&Path> {
        self.wmh_home.as_deref().or(self.home.as_deref())
    }

    pub fn wmh_program(&self, name: &str) -> String {
        resolve_program(self.wmh_install().map(|h| h.join("bin")).as_deref(), name)
    }
}

/// Time budgets in seconds (0 = no limit)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Applied to every invocation without a more specific budget
    pub default_secs: u64,

    /// Budget for each preprocessing tool
    pub preprocess_secs: Option<u64>,

    /// Per-backend budget for each of the backend's tool runs
    pub backends: BTreeMap<Backend, u64>,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            default_secs: 4 * 60 * 60,
            preprocess_secs: None,
            backends: BTreeMap::new(),
        }
    }
}

impl TimeoutSettings {
    fn to_duration(secs: u64) -> Option<Duration> {
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    pub fn preprocess(&self) -> Option<Duration> {
        Self::to_duration(self.preprocess_secs.unwrap_or(self.default_secs))
    }

    pub fn backend(&self, backend: Backend) -> Option<Duration> {
        Self::to_duration(
            self.backends
                .get(&backend)
                .copied()
                .unwrap_or(self.default_secs),
        )
    }
}

/// Mechanism behind published artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Relative symbolic link (falls back to copy where unsupported)
    #[default]
    Symlink,
    /// Full copy of the artifact
    Copy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    pub mode: PublishMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    /// Keep `FLAIR_to_T1.nii.gz` (registration check) at the workspace root
    pub keep_diagnostics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SegmentationSettings {
    /// Fractional intensity threshold for the UCD brain mask (`bet -f`)
    #[validate(range(min = 0.0, max = 1.0))]
    pub brain_extraction_fraction: f64,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        Self {
            brain_extraction_fraction: 0.5,
        }
    }
}
