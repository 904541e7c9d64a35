//! AFNI: geometry queries, reorientation and resampling

use std::path::Path;

use contracts::{ContractError, Geometry, Orientation, Spacing, ToolRunner, ToolSuite};

use crate::toolbox::{parse_stdout, Toolbox};

impl<R: ToolRunner + Sync> Toolbox<'_, R> {
    /// `3dinfo -is_oblique`
    pub async fn is_oblique(&self, volume: &Path) -> Result<bool, ContractError> {
        let inv = self.suite(ToolSuite::Afni, "3dinfo").arg("-is_oblique").arg(volume);
        let program = inv.program.clone();
        let out = self.run(inv).await?;
        parse_stdout(&program, &out, |s| match s {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        })
    }

    /// `3dinfo -orient`
    pub async fn orientation(&self, volume: &Path) -> Result<Orientation, ContractError> {
        let inv = self.suite(ToolSuite::Afni, "3dinfo").arg("-orient").arg(volume);
        let program = inv.program.clone();
        let out = self.run(inv).await?;
        parse_stdout(&program, &out, |s| s.parse().ok())
    }

    /// `3dinfo -ad3` (absolute voxel sizes in mm)
    pub async fn spacing(&self, volume: &Path) -> Result<Spacing, ContractError> {
        let inv = self.suite(ToolSuite::Afni, "3dinfo").arg("-ad3").arg(volume);
        let program = inv.program.clone();
        let out = self.run(inv).await?;
        parse_stdout(&program, &out, |s| s.parse().ok())
    }

    pub async fn geometry(&self, volume: &Path) -> Result<Geometry, ContractError> {
        Ok(Geometry {
            orientation: self.orientation(volume).await?,
            spacing: self.spacing(volume).await?,
        })
    }

    /// `3dresample -orient <code>`
    pub async fn reorient(
        &self,
        input: &Path,
        orientation: Orientation,
        output: &Path,
    ) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Afni, "3dresample")
            .arg("-orient")
            .arg(orientation.to_string())
            .arg("-prefix")
            .arg(output)
            .arg("-input")
            .arg(input)
            .output(output);
        self.run(inv).await.map(|_| ())
    }

    /// `3dresample -orient <code> -dxyz <sx> <sy> <sz>`
    pub async fn resample_to_grid(
        &self,
        input: &Path,
        geometry: &Geometry,
        output: &Path,
    ) -> Result<(), ContractError> {
        let Spacing { x, y, z } = geometry.spacing;
        let inv = self
            .suite(ToolSuite::Afni, "3dresample")
            .arg("-orient")
            .arg(geometry.orientation.to_string())
            .arg("-dxyz")
            .args([x, y, z].map(|v| v.to_string()))
            .arg("-prefix")
            .arg(output)
            .arg("-input")
            .arg(input)
            .output(output);
        self.run(inv).await.map(|_| ())
    }

    /// `3drefit -deoblique` (in place)
    pub async fn deoblique(&self, volume: &Path) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Afni, "3drefit")
            .arg("-deoblique")
            .arg(volume)
            .output(volume);
        self.run(inv).await.map(|_| ())
    }
}
