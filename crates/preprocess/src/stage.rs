//! Preprocessing stage
//!
//! Canonical orientation, grid matching, bias correction, FLAIR-derived
//! synthetic T1, rigid registration, then relocation into `proc/pre`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use contracts::layout;
use contracts::{ContractError, Orientation, PipelineSettings, Stage, ToolRunner};
use toolkit::{ToolContext, Toolbox};
use tracing::{debug, info, instrument};
use workspace_manager::Workspace;

/// T1 resampled to FLAIR orientation and voxel size
const T1_FLAIR_GRID: &str = "T1_FLgrid.nii.gz";
const T1_BIAS_CORRECTED: &str = "T1_bc.nii.gz";
/// Bias-corrected T1 at its own resolution, source of `3DT1`
const T1_NATIVE_BIAS_CORRECTED: &str = "T1_native_bc.nii.gz";
const FLAIR_BIAS_CORRECTED: &str = "FLAIR_bc.nii.gz";
/// Resampled output of the synthetic-T1 registration
const SYNTH_REGISTERED: &str = "FLAIR_synthT1_to_T1.nii.gz";
/// Staging names inside `proc/orig` before relocation
const STAGED_T1_NATIVE: &str = "3DT1.nii.gz";
const STAGED_T1: &str = "T1.nii.gz";

/// What the stage did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessOutcome {
    /// Earlier run found complete
    Skipped,
    /// Ran to completion
    Completed { elapsed: Duration },
}

impl PreprocessOutcome {
    pub fn skipped(&self) -> bool {
        matches!(self, PreprocessOutcome::Skipped)
    }
}

/// Preprocessing stage
pub struct PreprocessStage<'a, R> {
    runner: &'a R,
    settings: &'a PipelineSettings,
    threads: usize,
}

impl<'a, R: ToolRunner + Sync> PreprocessStage<'a, R> {
    pub fn new(runner: &'a R, settings: &'a PipelineSettings, threads: usize) -> Self {
        Self {
            runner,
            settings,
            threads,
        }
    }

    /// Run unless the workspace is already preprocessed
    ///
    /// # Errors
    /// The first failing tool aborts the stage; `proc/pre/FLAIR.nii.gz` is
    /// then absent and the next run starts over.
    #[instrument(name = "preprocess", skip_all, fields(root = %workspace.root().display()))]
    pub async fn run(&self, workspace: &Workspace) -> Result<PreprocessOutcome, ContractError> {
        if workspace.is_preprocessed() {
            info!(
                flair = %workspace.pre_flair().display(),
                "found existing preprocessed files, skipping preprocessing"
            );
            observability::record_preprocess(true, Duration::ZERO);
            return Ok(PreprocessOutcome::Skipped);
        }

        let started = Instant::now();
        let tools = Toolbox::new(
            self.runner,
            self.settings,
            ToolContext::preprocess(workspace.orig_dir(), self.threads, self.settings.timeouts.preprocess()),
        );

        clear_stale(&self.planned_outputs(workspace))?;

        let t1 = workspace.orig_t1();
        let flair = workspace.orig_flair();
        canonicalize(&tools, workspace.t1_input(), Orientation::LPI, &t1).await?;
        canonicalize(&tools, workspace.flair_input(), Orientation::RPI, &flair).await?;

        let flair_geometry = tools.geometry(&flair).await?;
        debug!(
            orientation = %flair_geometry.orientation,
            spacing = ?flair_geometry.spacing,
            "FLAIR geometry"
        );
        let t1_grid = workspace.orig_file(T1_FLAIR_GRID);
        tools.resample_to_grid(&t1, &flair_geometry, &t1_grid).await?;

        let t1_bc = workspace.orig_file(T1_BIAS_CORRECTED);
        let flair_bc = workspace.orig_file(FLAIR_BIAS_CORRECTED);
        let t1_native_bc = workspace.orig_file(T1_NATIVE_BIAS_CORRECTED);
        tools.bias_correct(&t1_grid, &t1_bc).await?;
        tools.bias_correct(&flair, &flair_bc).await?;
        tools.bias_correct(&t1, &t1_native_bc).await?;

        let synth = workspace.flair_synth_t1();
        tools.synthesize_t1(&flair_bc, &synth).await?;
        tools.strip_extensions(&synth).await?;
        tools.deoblique(&synth).await?;

        let forward = workspace.reg_flair_to_t1();
        let inverse = workspace.reg_t1_to_flair();
        let synth_registered = workspace.orig_file(SYNTH_REGISTERED);
        tools
            .register_rigid(&synth, &t1_bc, &synth_registered, &forward)
            .await?;
        tools.invert_transform(&forward, &inverse).await?;

        if self.settings.preprocess.keep_diagnostics {
            tools
                .apply_transform(&flair_bc, &t1_bc, &forward, &workspace.flair_to_t1())
                .await?;
        }

        let staged_native = workspace.orig_file(STAGED_T1_NATIVE);
        let staged_t1 = workspace.orig_file(STAGED_T1);
        tools
            .apply_transform(&t1_native_bc, &t1_native_bc, &inverse, &staged_native)
            .await?;
        tools
            .apply_transform(&t1_bc, &flair_bc, &inverse, &staged_t1)
            .await?;

        // FLAIR last: it marks the stage complete
        relocate(&staged_native, &workspace.pre_t1_native())?;
        relocate(&staged_t1, &workspace.pre_t1())?;
        relocate(&flair_bc, &workspace.pre_flair())?;

        remove_quietly(&[t1_grid, t1_bc, t1_native_bc, synth_registered]);

        let registry = workspace.registry();
        registry.publish(Stage::Preprocess, layout::FLAIR_PREPROCESSED, &workspace.pre_flair())?;
        registry.publish(Stage::Preprocess, layout::T1_ALIGNED, &workspace.pre_t1())?;

        let elapsed = started.elapsed();
        observability::record_preprocess(false, elapsed);
        info!(elapsed_ms = elapsed.as_millis() as u64, "preprocessing completed");
        Ok(PreprocessOutcome::Completed { elapsed })
    }

    /// Files a previous interrupted run may have left behind
    fn planned_outputs(&self, workspace: &Workspace) -> Vec<PathBuf> {
        let mut outputs = vec![
            workspace.orig_t1(),
            workspace.orig_flair(),
            workspace.orig_file(T1_FLAIR_GRID),
            workspace.orig_file(T1_BIAS_CORRECTED),
            workspace.orig_file(FLAIR_BIAS_CORRECTED),
            workspace.orig_file(T1_NATIVE_BIAS_CORRECTED),
            workspace.orig_file(SYNTH_REGISTERED),
            workspace.orig_file(STAGED_T1_NATIVE),
            workspace.orig_file(STAGED_T1),
            workspace.flair_synth_t1(),
            workspace.reg_flair_to_t1(),
            workspace.reg_t1_to_flair(),
            workspace.pre_t1_native(),
            workspace.pre_t1(),
        ];
        if self.settings.preprocess.keep_diagnostics {
            outputs.push(workspace.flair_to_t1());
        }
        outputs
    }
}

/// Reorient to `orientation`, then strip obliquity when the input has it
async fn canonicalize<R: ToolRunner + Sync>(
    tools: &Toolbox<'_, R>,
    input: &Path,
    orientation: Orientation,
    output: &Path,
) -> Result<(), ContractError> {
    let oblique = tools.is_oblique(input).await?;
    tools.reorient(input, orientation, output).await?;
    if oblique {
        debug!(input = %input.display(), "oblique input, removing obliquity");
        tools.deoblique(output).await?;
    }
    Ok(())
}

fn clear_stale(paths: &[PathBuf]) -> Result<(), ContractError> {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed stale artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn relocate(from: &Path, to: &Path) -> Result<(), ContractError> {
    if !from.is_file() {
        return Err(ContractError::workspace_state(
            Stage::Preprocess,
            from,
            "expected intermediate is missing",
        ));
    }
    fs::rename(from, to)?;
    Ok(())
}

fn remove_quietly(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "intermediate not removed");
        }
    }
}
