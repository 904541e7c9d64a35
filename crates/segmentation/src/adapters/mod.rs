//! Backend adapters
//!
//! | Backend | Raw output | Binarize | Geometry |
//! |---|---|---|---|
//! | LPA | `ples_lpa_mFLAIR.nii` | >= 0.5 | deoblique |
//! | LSTAI | `space-flair_probmap.nii.gz` | >= 0.5 | none |
//! | PGS | `result.nii.gz` | copy | reorient + FLAIR header |
//! | SYSU | `result.nii.gz` | >= 0.9999 | reorient + FLAIR header |
//! | FMRIB | `result.nii.gz` | copy | flip x/y + FLAIR header |
//! | UCD | `result.nii.gz` | >= 0.5 | none |
//! | WMHsynthseg | `seg.nii.gz`, `seg.lesion_probs.nii.gz` | label 77 | deoblique |

#[macro_use]
mod macros;

pub mod challenge;
pub mod lpa;
pub mod lst_ai;
pub mod wmh_synthseg;

use contracts::Backend;

use crate::adapter::BackendAdapter;

pub use challenge::{FmribAdapter, PgsAdapter, SysuAdapter, UcdAdapter};
pub use lpa::LpaAdapter;
pub use lst_ai::LstAiAdapter;
pub use wmh_synthseg::WmhSynthSegAdapter;

/// Adapter for a backend
pub fn adapter_for(backend: Backend) -> &'static dyn BackendAdapter {
    match backend {
        Backend::Lpa => &LpaAdapter,
        Backend::Pgs => &PgsAdapter,
        Backend::Sysu => &SysuAdapter,
        Backend::Fmrib => &FmribAdapter,
        Backend::Ucd => &UcdAdapter,
        Backend::LstAi => &LstAiAdapter,
        Backend::WmhSynthSeg => &WmhSynthSegAdapter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Launch;
    use crate::rules::{BinarizeRule, GeometryFix};
    use contracts::PipelineSettings;

    #[test]
    fn test_every_backend_has_its_adapter() {
        for backend in Backend::ALL {
            assert_eq!(adapter_for(backend).backend(), backend);
        }
    }

    #[test]
    fn test_normalization_table() {
        let settings = PipelineSettings::default();
        let row = |b| {
            let a = adapter_for(b);
            (a.raw_outputs()[0], a.binarize_rule(&settings), a.geometry_fix())
        };

        assert_eq!(
            row(Backend::Lpa),
            ("ples_lpa_mFLAIR.nii", BinarizeRule::Threshold(0.5), GeometryFix::Deoblique)
        );
        assert_eq!(
            row(Backend::LstAi),
            ("space-flair_probmap.nii.gz", BinarizeRule::Threshold(0.5), GeometryFix::None)
        );
        assert_eq!(
            row(Backend::Pgs),
            ("result.nii.gz", BinarizeRule::Copy, GeometryFix::ReorientToFlair)
        );
        assert_eq!(
            row(Backend::Sysu),
            ("result.nii.gz", BinarizeRule::Threshold(0.9999), GeometryFix::ReorientToFlair)
        );
        assert_eq!(
            row(Backend::Fmrib),
            ("result.nii.gz", BinarizeRule::Copy, GeometryFix::FlipXY)
        );
        assert_eq!(
            row(Backend::Ucd),
            ("result.nii.gz", BinarizeRule::Threshold(0.5), GeometryFix::None)
        );
        assert_eq!(
            row(Backend::WmhSynthSeg),
            ("seg.nii.gz", BinarizeRule::Label(77), GeometryFix::Deoblique)
        );
    }

    #[test]
    fn test_launch_kinds() {
        assert_eq!(adapter_for(Backend::Lpa).launch(), Launch::Matlab);
        assert_eq!(adapter_for(Backend::WmhSynthSeg).launch(), Launch::FreeSurfer);
        assert_eq!(
            adapter_for(Backend::Ucd).launch(),
            Launch::Container { brain_mask: true }
        );
        assert_eq!(
            adapter_for(Backend::Sysu).launch(),
            Launch::Container { brain_mask: false }
        );
        assert_eq!(adapter_for(Backend::WmhSynthSeg).raw_outputs().len(), 2);
    }
}
