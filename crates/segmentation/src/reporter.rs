//! Volume reporter
//!
//! Volume (ml) = voxel count x voxel volume (µl) / 1000, always printed with
//! six decimals so results compare byte for byte.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{Backend, ContractError, Spacing, ToolRunner};
use toolkit::Toolbox;
use tracing::debug;
use workspace_manager::Workspace;

/// Lesion volume in ml
pub fn volume_ml(voxels: u64, spacing: Spacing) -> f64 {
    voxels as f64 * spacing.voxel_volume_ul() / 1000.0
}

/// `%.6f`
pub fn format_volume(volume_ml: f64) -> String {
    format!("{volume_ml:.6}")
}

/// Whole minutes, rounded down
pub fn elapsed_minutes(elapsed: Duration) -> u64 {
    elapsed.as_secs() / 60
}

/// Measure a binary mask with `fslstats -V` and `3dinfo -ad3`
pub async fn measure<R: ToolRunner + Sync>(
    tools: &Toolbox<'_, R>,
    mask: &Path,
) -> Result<f64, ContractError> {
    let voxels = tools.voxel_count(mask).await?;
    let spacing = tools.spacing(mask).await?;
    let volume = volume_ml(voxels, spacing);
    debug!(voxels, voxel_ul = spacing.voxel_volume_ul(), volume_ml = volume, "mask measured");
    Ok(volume)
}

/// Measured volume and elapsed time of one backend run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeReport {
    pub volume_ml: f64,
    pub elapsed_minutes: u64,
}

impl VolumeReport {
    pub fn new(volume_ml: f64, elapsed: Duration) -> Self {
        Self {
            volume_ml,
            elapsed_minutes: elapsed_minutes(elapsed),
        }
    }

    /// Contents of `proc/seg/<Backend>/WMHvolume.txt`
    pub fn volume_file(&self) -> String {
        format!("{}\n", format_volume(self.volume_ml))
    }

    /// Contents of `<root>/WMH_<Backend>.txt`
    pub fn result_file(&self) -> String {
        format!(
            "WMH Volume: {} ml\nProcessing time: {} minutes\n",
            format_volume(self.volume_ml),
            self.elapsed_minutes
        )
    }

    /// Write both files, returning the root-level result file
    pub fn write(&self, workspace: &Workspace, backend: Backend) -> Result<PathBuf, ContractError> {
        fs::write(workspace.backend_volume_file(backend), self.volume_file())?;
        let result = workspace.result_file(backend);
        fs::write(&result, self.result_file())?;
        Ok(result)
    }
}
