//! FSL: voxel arithmetic, header geometry, registration, brain extraction

use std::fmt;
use std::path::{Path, PathBuf};

use contracts::{ContractError, ToolRunner, ToolSuite};

use crate::toolbox::{fsl_output_type, parse_stdout, Toolbox};

/// Axis permutation / flip for `fslswapdim`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimSwap(pub [&'static str; 3]);

impl DimSwap {
    /// Mirror left-right and anterior-posterior, keep superior-inferior
    pub const FLIP_XY: DimSwap = DimSwap(["-x", "-y", "z"]);
}

impl fmt::Display for DimSwap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

impl<R: ToolRunner + Sync> Toolbox<'_, R> {
    /// `fslmaths <input> <ops...> <output>`
    pub async fn fslmaths<S: AsRef<str>>(
        &self,
        input: &Path,
        ops: &[S],
        output: &Path,
    ) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Fsl, "fslmaths")
            .env("FSLOUTPUTTYPE", fsl_output_type(output))
            .arg(input)
            .args(ops.iter().map(|op| op.as_ref()))
            .arg(output)
            .output(output);
        self.run(inv).await.map(|_| ())
    }

    /// `fslswapdim <input> <a> <b> <c> <output>`
    pub async fn swap_dims(
        &self,
        input: &Path,
        swap: DimSwap,
        output: &Path,
    ) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Fsl, "fslswapdim")
            .env("FSLOUTPUTTYPE", fsl_output_type(output))
            .arg(input)
            .args(swap.0)
            .arg(output)
            .output(output);
        self.run(inv).await.map(|_| ())
    }

    /// `fslcpgeom <source> <target>`: copy header geometry onto `target`
    pub async fn copy_geometry(&self, source: &Path, target: &Path) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Fsl, "fslcpgeom")
            .arg(source)
            .arg(target)
            .output(target);
        self.run(inv).await.map(|_| ())
    }

    /// `fslstats <mask> -V`: number of non-zero voxels
    pub async fn voxel_count(&self, mask: &Path) -> Result<u64, ContractError> {
        let inv = self.suite(ToolSuite::Fsl, "fslstats").arg(mask).arg("-V");
        let program = inv.program.clone();
        let out = self.run(inv).await?;
        parse_stdout(&program, &out, |s| {
            let first = s.split_whitespace().next()?;
            // Some FSL builds print the count as a float
            first
                .parse::<u64>()
                .ok()
                .or_else(|| first.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
        })
    }

    /// `fslchfiletype NIFTI`: uncompressed copy
    pub async fn to_uncompressed(&self, input: &Path, output: &Path) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Fsl, "fslchfiletype")
            .arg("NIFTI")
            .arg(input)
            .arg(output)
            .output(output);
        self.run(inv).await.map(|_| ())
    }

    /// `bet <input> <prefix> -m -f <fraction>`, returns `<prefix>_mask.nii.gz`
    pub async fn brain_mask(
        &self,
        input: &Path,
        prefix: &Path,
        fraction: f64,
    ) -> Result<PathBuf, ContractError> {
        let mask = PathBuf::from(format!("{}_mask.nii.gz", prefix.display()));
        let inv = self
            .suite(ToolSuite::Fsl, "bet")
            .env("FSLOUTPUTTYPE", "NIFTI_GZ")
            .arg(input)
            .arg(prefix)
            .arg("-m")
            .arg("-f")
            .arg(fraction.to_string())
            .output(&mask);
        self.run(inv).await?;
        Ok(mask)
    }

    /// `flirt -dof 6`: rigid registration, writes the transform to `matrix`
    pub async fn register_rigid(
        &self,
        input: &Path,
        reference: &Path,
        output: &Path,
        matrix: &Path,
    ) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Fsl, "flirt")
            .env("FSLOUTPUTTYPE", fsl_output_type(output))
            .arg("-in")
            .arg(input)
            .arg("-ref")
            .arg(reference)
            .arg("-out")
            .arg(output)
            .arg("-omat")
            .arg(matrix)
            .args(["-dof", "6"])
            .output(output)
            .output(matrix);
        self.run(inv).await.map(|_| ())
    }

    /// `flirt -applyxfm -init <matrix>`: resample `input` onto `reference`'s grid
    pub async fn apply_transform(
        &self,
        input: &Path,
        reference: &Path,
        matrix: &Path,
        output: &Path,
    ) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Fsl, "flirt")
            .env("FSLOUTPUTTYPE", fsl_output_type(output))
            .arg("-in")
            .arg(input)
            .arg("-ref")
            .arg(reference)
            .arg("-out")
            .arg(output)
            .arg("-applyxfm")
            .arg("-init")
            .arg(matrix)
            .output(output);
        self.run(inv).await.map(|_| ())
    }

    /// `convert_xfm -omat <output> -inverse <matrix>`
    pub async fn invert_transform(&self, matrix: &Path, output: &Path) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Fsl, "convert_xfm")
            .arg("-omat")
            .arg(output)
            .arg("-inverse")
            .arg(matrix)
            .output(output);
        self.run(inv).await.map(|_| ())
    }
}
