//! FreeSurfer WMH-SynthSeg

use contracts::{Backend, PipelineSettings};

use crate::adapter::{BackendAdapter, Launch};
use crate::rules::{BinarizeRule, GeometryFix};

/// Output stem inside the backend directory
pub const OUTPUT_STEM: &str = "seg";

#[derive(Debug, Clone, Copy, Default)]
pub struct WmhSynthSegAdapter;

impl BackendAdapter for WmhSynthSegAdapter {
    fn backend(&self) -> Backend {
        Backend::WmhSynthSeg
    }

    fn launch(&self) -> Launch {
        Launch::FreeSurfer
    }

    fn raw_outputs(&self) -> &'static [&'static str] {
        &["seg.nii.gz", "seg.lesion_probs.nii.gz"]
    }

    fn geometry_fix(&self) -> GeometryFix {
        GeometryFix::Deoblique
    }

    fn binarize_rule(&self, settings: &PipelineSettings) -> BinarizeRule {
        BinarizeRule::Label(settings.freesurfer.wmh_label)
    }
}
