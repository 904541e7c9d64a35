//! Output normalization rules

use std::fmt;
use std::path::PathBuf;

use contracts::{ContractError, ToolRunner};
use toolkit::{DimSwap, Toolbox};
use tracing::debug;

use crate::adapter::BackendContext;

/// Reduction of a raw result to a strict lesion/no-lesion mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinarizeRule {
    /// Keep voxels with value >= threshold
    Threshold(f64),
    /// Keep voxels equal to the label
    Label(u32),
    /// Result is already binary; format conversion only
    Copy,
}

impl BinarizeRule {
    /// `fslmaths` operations between input and output
    pub fn fslmaths_ops(&self) -> Vec<String> {
        match self {
            BinarizeRule::Threshold(t) => vec!["-thr".into(), t.to_string(), "-bin".into()],
            BinarizeRule::Label(label) => vec![
                "-thr".into(),
                label.to_string(),
                "-uthr".into(),
                label.to_string(),
                "-bin".into(),
            ],
            BinarizeRule::Copy => Vec::new(),
        }
    }

    /// Whether a voxel with this value is a lesion voxel
    pub fn keeps(&self, value: f64) -> bool {
        match self {
            BinarizeRule::Threshold(t) => value >= *t,
            BinarizeRule::Label(label) => value == f64::from(*label),
            BinarizeRule::Copy => value != 0.0,
        }
    }
}

impl fmt::Display for BinarizeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinarizeRule::Threshold(t) => write!(f, "threshold >= {t}"),
            BinarizeRule::Label(label) => write!(f, "label == {label}"),
            BinarizeRule::Copy => f.write_str("copy"),
        }
    }
}

/// Header / orientation repair applied to the raw result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFix {
    None,
    /// `3drefit -deoblique` on every raw output
    Deoblique,
    /// Reorient to FLAIR's orientation code, then copy FLAIR's header geometry
    ReorientToFlair,
    /// Mirror x and y, then copy FLAIR's header geometry
    FlipXY,
}

const REORIENTED: &str = "result_reoriented.nii.gz";
const FLIPPED: &str = "result_flipped.nii.gz";

impl GeometryFix {
    /// Apply to the raw outputs, returning the volume to binarize
    pub async fn apply<R: ToolRunner + Sync>(
        &self,
        tools: &Toolbox<'_, R>,
        ctx: &BackendContext<'_>,
        raw: &[PathBuf],
    ) -> Result<PathBuf, ContractError> {
        let primary = raw.first().cloned().ok_or_else(|| {
            ContractError::workspace_state(
                contracts::Stage::Segmentation,
                ctx.output_dir(),
                "backend declares no raw output",
            )
        })?;
        let flair = ctx.workspace.pre_flair();

        match self {
            GeometryFix::None => Ok(primary),
            GeometryFix::Deoblique => {
                for path in raw {
                    tools.deoblique(path).await?;
                }
                Ok(primary)
            }
            GeometryFix::ReorientToFlair => {
                let orientation = tools.orientation(&flair).await?;
                debug!(%orientation, "reorienting result to FLAIR");
                let fixed = ctx.output(REORIENTED);
                tools.reorient(&primary, orientation, &fixed).await?;
                tools.copy_geometry(&flair, &fixed).await?;
                Ok(fixed)
            }
            GeometryFix::FlipXY => {
                let fixed = ctx.output(FLIPPED);
                tools.swap_dims(&primary, DimSwap::FLIP_XY, &fixed).await?;
                tools.copy_geometry(&flair, &fixed).await?;
                Ok(fixed)
            }
        }
    }
}
