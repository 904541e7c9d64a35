//! LST lesion prediction algorithm (MATLAB / SPM)

use contracts::{Backend, PipelineSettings};

use crate::adapter::{BackendAdapter, Launch};
use crate::rules::{BinarizeRule, GeometryFix};

/// Uncompressed input copies in the backend directory
pub const FLAIR_INPUT: &str = "FLAIR.nii";
pub const T1_INPUT: &str = "T1.nii";
/// Lesion probability map written next to the FLAIR copy
pub const PROBABILITY_MAP: &str = "ples_lpa_mFLAIR.nii";

#[derive(Debug, Clone, Copy, Default)]
pub struct LpaAdapter;

impl BackendAdapter for LpaAdapter {
    fn backend(&self) -> Backend {
        Backend::Lpa
    }

    fn launch(&self) -> Launch {
        Launch::Matlab
    }

    fn raw_outputs(&self) -> &'static [&'static str] {
        &[PROBABILITY_MAP]
    }

    fn geometry_fix(&self) -> GeometryFix {
        GeometryFix::Deoblique
    }

    fn binarize_rule(&self, _settings: &PipelineSettings) -> BinarizeRule {
        BinarizeRule::Threshold(0.5)
    }
}
