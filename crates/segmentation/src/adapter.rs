//! Backend adapter trait

use std::path::PathBuf;

use contracts::{Backend, PipelineSettings};
use workspace_manager::Workspace;

use crate::rules::{BinarizeRule, GeometryFix};

/// How a backend is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// MATLAB batch session on uncompressed copies of the inputs
    Matlab,
    /// Container run; `brain_mask` adds a locally computed brain mask
    Container { brain_mask: bool },
    /// `mri_WMHsynthseg` from the WMH FreeSurfer install
    FreeSurfer,
}

/// What a backend run may read
pub struct BackendContext<'a> {
    pub backend: Backend,
    pub workspace: &'a Workspace,
    pub settings: &'a PipelineSettings,
    pub threads: usize,
}

impl BackendContext<'_> {
    /// `proc/seg/<Backend>`
    pub fn output_dir(&self) -> PathBuf {
        self.workspace.backend_dir(self.backend)
    }

    /// File inside the backend directory
    pub fn output(&self, name: &str) -> PathBuf {
        self.output_dir().join(name)
    }
}

/// Backend adapter
///
/// Implement this trait per backend. It only describes the backend; the
/// shared run sequence lives in [`crate::SegmentationRunner`].
pub trait BackendAdapter: Send + Sync {
    fn backend(&self) -> Backend;

    fn launch(&self) -> Launch;

    /// Raw outputs inside the backend directory; the first one is binarized
    fn raw_outputs(&self) -> &'static [&'static str];

    fn geometry_fix(&self) -> GeometryFix;

    fn binarize_rule(&self, settings: &PipelineSettings) -> BinarizeRule;

    /// Arguments after the image name for containerized backends
    fn container_args(&self, _ctx: &BackendContext<'_>) -> Vec<String> {
        Vec::new()
    }
}
