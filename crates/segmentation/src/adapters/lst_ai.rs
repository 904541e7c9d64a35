//! LST-AI container

use contracts::{Backend, PipelineSettings};

use crate::adapter::{BackendAdapter, BackendContext, Launch};
use crate::rules::{BinarizeRule, GeometryFix};

/// Probability map in FLAIR space
pub const PROBABILITY_MAP: &str = "space-flair_probmap.nii.gz";

#[derive(Debug, Clone, Copy, Default)]
pub struct LstAiAdapter;

impl BackendAdapter for LstAiAdapter {
    fn backend(&self) -> Backend {
        Backend::LstAi
    }

    fn launch(&self) -> Launch {
        Launch::Container { brain_mask: false }
    }

    fn raw_outputs(&self) -> &'static [&'static str] {
        &[PROBABILITY_MAP]
    }

    fn geometry_fix(&self) -> GeometryFix {
        GeometryFix::None
    }

    fn binarize_rule(&self, _settings: &PipelineSettings) -> BinarizeRule {
        BinarizeRule::Threshold(0.5)
    }

    fn container_args(&self, ctx: &BackendContext<'_>) -> Vec<String> {
        vec![
            "--t1".into(),
            "/input/pre/T1.nii.gz".into(),
            "--flair".into(),
            "/input/pre/FLAIR.nii.gz".into(),
            "--output".into(),
            "/output".into(),
            "--temp".into(),
            "/output/tmp".into(),
            "--device".into(),
            "cpu".into(),
            "--threads".into(),
            ctx.threads.to_string(),
            "--probability_map".into(),
        ]
    }
}
