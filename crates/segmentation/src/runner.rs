//! Shared backend run sequence

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use contracts::{
    layout, BackendOutcome, BackendRunRecord, ContractError, PipelineSettings, Stage, ToolRunner,
};
use toolkit::tools::freesurfer::WmhSynthSegOutputs;
use toolkit::{Mount, ToolContext, Toolbox};
use tracing::{info, instrument, warn};
use workspace_manager::Workspace;

use crate::adapter::{BackendAdapter, BackendContext, Launch};
use crate::adapters::{lpa, wmh_synthseg};
use crate::reporter::{self, VolumeReport};

/// Brain mask subdirectory for backends that take one
const BRAIN_MASK_DIR: &str = "brainmask";

/// Runs adapters against a preprocessed workspace
pub struct SegmentationRunner<'a, R> {
    runner: &'a R,
    settings: &'a PipelineSettings,
    workspace: &'a Workspace,
    threads: usize,
}

impl<'a, R: ToolRunner + Sync> SegmentationRunner<'a, R> {
    pub fn new(
        runner: &'a R,
        settings: &'a PipelineSettings,
        workspace: &'a Workspace,
        threads: usize,
    ) -> Self {
        Self {
            runner,
            settings,
            workspace,
            threads,
        }
    }

    /// Run one backend to completion; failures become `BackendOutcome::Failed`
    #[instrument(name = "backend_run", skip_all, fields(backend = %adapter.backend()))]
    pub async fn run(&self, adapter: &dyn BackendAdapter) -> BackendOutcome {
        let backend = adapter.backend();
        let started = Instant::now();

        match self.try_run(adapter, started).await {
            Ok(record) => {
                observability::record_backend_run(backend, true, record.elapsed);
                observability::record_lesion_volume(backend, record.volume_ml);
                info!(
                    volume_ml = %reporter::format_volume(record.volume_ml),
                    elapsed_ms = record.elapsed.as_millis() as u64,
                    "backend finished"
                );
                BackendOutcome::Succeeded(record)
            }
            Err(error) => {
                let elapsed = started.elapsed();
                observability::record_backend_run(backend, false, elapsed);
                warn!(error = %error, "backend failed");
                BackendOutcome::Failed {
                    backend,
                    error,
                    elapsed,
                }
            }
        }
    }

    async fn try_run(
        &self,
        adapter: &dyn BackendAdapter,
        started: Instant,
    ) -> Result<BackendRunRecord, ContractError> {
        let backend = adapter.backend();
        let ctx = BackendContext {
            backend,
            workspace: self.workspace,
            settings: self.settings,
            threads: self.threads,
        };
        let output_dir = ctx.output_dir();

        self.require_preprocessed()?;
        recreate_dir(&output_dir)?;

        let tools = Toolbox::new(
            self.runner,
            self.settings,
            ToolContext::backend(
                backend,
                &output_dir,
                self.threads,
                self.settings.timeouts.backend(backend),
            ),
        );

        let raw: Vec<PathBuf> = adapter
            .raw_outputs()
            .iter()
            .map(|name| ctx.output(name))
            .collect();
        self.launch(adapter, &tools, &ctx, &raw).await?;

        let normalized = adapter.geometry_fix().apply(&tools, &ctx, &raw).await?;

        let rule = adapter.binarize_rule(self.settings);
        let mask = self.workspace.binary_mask(backend);
        tools.fslmaths(&normalized, &rule.fslmaths_ops(), &mask).await?;

        let volume = reporter::measure(&tools, &mask).await?;
        let elapsed = started.elapsed();
        let report = VolumeReport::new(volume, elapsed);
        let result_file = report.write(self.workspace, backend)?;

        let published_mask = self.workspace.registry().publish(
            Stage::Report,
            &layout::published_mask(backend),
            &mask,
        )?;

        Ok(BackendRunRecord {
            backend,
            output_dir,
            raw_output: raw[0].clone(),
            mask,
            volume_ml: volume,
            elapsed_minutes: report.elapsed_minutes,
            elapsed,
            result_file,
            published_mask,
        })
    }

    async fn launch(
        &self,
        adapter: &dyn BackendAdapter,
        tools: &Toolbox<'_, R>,
        ctx: &BackendContext<'_>,
        raw: &[PathBuf],
    ) -> Result<(), ContractError> {
        let backend = adapter.backend();
        let outputs: Vec<&std::path::Path> = raw.iter().map(PathBuf::as_path).collect();

        match adapter.launch() {
            Launch::Matlab => {
                let flair = ctx.output(lpa::FLAIR_INPUT);
                let t1 = ctx.output(lpa::T1_INPUT);
                tools.to_uncompressed(&self.workspace.pre_flair(), &flair).await?;
                tools.to_uncompressed(&self.workspace.pre_t1(), &t1).await?;
                let script = tools.lpa_script(&flair, &t1);
                tools.matlab_batch(&script, &outputs).await
            }
            Launch::Container { brain_mask } => {
                let mut mounts = vec![
                    Mount::read_only(self.workspace.orig_dir(), "/input/orig"),
                    Mount::read_only(self.workspace.pre_dir(), "/input/pre"),
                    Mount::writable(ctx.output_dir(), "/output"),
                ];
                if brain_mask {
                    let mask_dir = ctx.output(BRAIN_MASK_DIR);
                    fs::create_dir_all(&mask_dir)?;
                    tools
                        .brain_mask(
                            &self.workspace.pre_flair(),
                            &mask_dir.join("FLAIR_brain"),
                            self.settings.segmentation.brain_extraction_fraction,
                        )
                        .await?;
                    mounts.push(Mount::read_only(mask_dir, "/input/brainmask"));
                }
                let args = adapter.container_args(ctx);
                tools.run_container(backend, &mounts, &args, &outputs).await
            }
            Launch::FreeSurfer => {
                let outputs = WmhSynthSegOutputs::in_dir(&ctx.output_dir(), wmh_synthseg::OUTPUT_STEM);
                tools.wmh_synthseg(&self.workspace.pre_flair(), &outputs).await
            }
        }
    }

    fn require_preprocessed(&self) -> Result<(), ContractError> {
        for path in [self.workspace.pre_flair(), self.workspace.pre_t1()] {
            if !path.is_file() {
                return Err(ContractError::workspace_state(
                    Stage::Segmentation,
                    path,
                    "preprocessed volume missing",
                ));
            }
        }
        Ok(())
    }
}

/// Delete and recreate a backend directory
fn recreate_dir(dir: &std::path::Path) -> Result<(), ContractError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    fs::create_dir_all(dir)?;
    Ok(())
}
