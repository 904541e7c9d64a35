//! FreeSurfer: SynthSR contrast synthesis and WMH-SynthSeg
//!
//! The two programs may come from different installs; each invocation
//! points `FREESURFER_HOME` at the install its program lives in.

use std::path::{Path, PathBuf};

use contracts::{ContractError, ToolRunner};

use crate::toolbox::Toolbox;

/// Outputs of `mri_WMHsynthseg`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmhSynthSegOutputs {
    /// Label volume
    pub labels: PathBuf,
    /// Lesion probability volume
    pub lesion_probs: PathBuf,
}

impl WmhSynthSegOutputs {
    /// `<stem>.nii.gz` and `<stem>.lesion_probs.nii.gz` in `dir`
    pub fn in_dir(dir: &Path, stem: &str) -> Self {
        Self {
            labels: dir.join(format!("{stem}.nii.gz")),
            lesion_probs: dir.join(format!("{stem}.lesion_probs.nii.gz")),
        }
    }
}

impl<R: ToolRunner + Sync> Toolbox<'_, R> {
    /// `mri_synthsr --i <input> --o <output>`
    pub async fn synthesize_t1(&self, input: &Path, output: &Path) -> Result<(), ContractError> {
        let freesurfer = &self.settings().freesurfer;
        let mut inv = self
            .invocation(freesurfer.program("mri_synthsr"))
            .arg("--i")
            .arg(input)
            .arg("--o")
            .arg(output)
            .arg("--threads")
            .arg(self.context().threads.to_string())
            .output(output);
        if let Some(home) = &freesurfer.home {
            inv = inv.env("FREESURFER_HOME", home);
        }
        self.run(inv).await.map(|_| ())
    }

    /// `mri_WMHsynthseg --i <input> --o <labels> --save_lesion_probabilities`
    pub async fn wmh_synthseg(
        &self,
        input: &Path,
        outputs: &WmhSynthSegOutputs,
    ) -> Result<(), ContractError> {
        let freesurfer = &self.settings().freesurfer;
        let mut inv = self
            .invocation(freesurfer.wmh_program("mri_WMHsynthseg"))
            .arg("--i")
            .arg(input)
            .arg("--o")
            .arg(&outputs.labels)
            .arg("--device")
            .arg(&freesurfer.device)
            .arg("--threads")
            .arg(self.context().threads.to_string())
            .arg("--save_lesion_probabilities")
            .output(&outputs.labels)
            .output(&outputs.lesion_probs);
        if let Some(home) = freesurfer.wmh_install() {
            inv = inv.env("FREESURFER_HOME", home);
        }
        self.run(inv).await.map(|_| ())
    }
}
