//! Pipeline coordinator

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use contracts::{Backend, BackendOutcome, BackendSelection, PipelineSettings, ToolRunner};
use preprocess::PreprocessStage;
use segmentation::{adapter_for, SegmentationRunner};
use tracing::{debug, info, instrument, warn};
use workspace_manager::Workspace;

use crate::error::{CoordinatorError, Result};
use crate::report::RunReport;
use crate::state::RunState;

/// One pipeline invocation
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,
    pub output_root: PathBuf,
    pub t1: PathBuf,
    pub flair: PathBuf,
    /// Thread budget exported to every tool
    pub threads: usize,
    pub selection: BackendSelection,
    /// Abort on the first backend failure
    pub fail_fast: bool,
}

impl RunRequest {
    fn validate(&self) -> Result<()> {
        for (flag, path) in [
            ("-inT1", &self.t1),
            ("-inFLAIR", &self.flair),
            ("-outFolder", &self.output_root),
        ] {
            if path.as_os_str().is_empty() {
                return Err(CoordinatorError::MissingRequiredArgument {
                    message: format!("{flag} is required"),
                });
            }
        }
        if self.threads == 0 {
            return Err(CoordinatorError::MissingRequiredArgument {
                message: "-threads must be at least 1".into(),
            });
        }
        self.selection
            .validate()
            .map_err(CoordinatorError::from_workspace)
    }

    fn resolve(&self, settings: &PipelineSettings) -> Result<Workspace> {
        Workspace::resolve(
            &self.base_dir,
            &self.output_root,
            &self.t1,
            &self.flair,
            settings.publish.mode,
        )
        .map_err(CoordinatorError::from_workspace)
    }
}

/// What a run would do, computed without side effects
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub root: PathBuf,
    pub t1: PathBuf,
    pub flair: PathBuf,
    pub threads: usize,
    pub preprocess: bool,
    pub backends: Vec<Backend>,
}

impl fmt::Display for RunPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Workspace:     {}", self.root.display())?;
        writeln!(f, "T1:            {}", self.t1.display())?;
        writeln!(f, "FLAIR:         {}", self.flair.display())?;
        writeln!(f, "Threads:       {}", self.threads)?;
        writeln!(
            f,
            "Preprocessing: {}",
            if self.preprocess { "run" } else { "skip (already complete)" }
        )?;
        for (i, backend) in self.backends.iter().enumerate() {
            writeln!(f, "Backend {}:     {}", i + 1, backend)?;
        }
        Ok(())
    }
}

/// Drives preprocessing and the selected backends
pub struct Coordinator<'a, R> {
    runner: &'a R,
    settings: &'a PipelineSettings,
}

impl<'a, R: ToolRunner + Sync> Coordinator<'a, R> {
    pub fn new(runner: &'a R, settings: &'a PipelineSettings) -> Self {
        Self { runner, settings }
    }

    /// Validate the request and describe the run without touching the disk
    pub fn plan(&self, request: &RunRequest) -> Result<RunPlan> {
        request.validate()?;
        let workspace = request.resolve(self.settings)?;

        Ok(RunPlan {
            root: workspace.root().to_path_buf(),
            t1: workspace.t1_input().to_path_buf(),
            flair: workspace.flair_input().to_path_buf(),
            threads: request.threads,
            preprocess: !workspace.is_preprocessed(),
            backends: request.selection.iter().collect(),
        })
    }

    /// Run the pipeline
    ///
    /// Backend failures are collected in the report unless
    /// `request.fail_fast` is set, in which case the first one is returned.
    #[instrument(name = "pipeline_run", skip_all, fields(root = %request.output_root.display()))]
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let started = Instant::now();
        let mut state = RunState::Init;

        advance(&mut state, RunState::ValidateInputs);
        let workspace = match request.validate().and_then(|()| request.resolve(self.settings)) {
            Ok(workspace) => workspace,
            Err(error) => {
                let failed = match error {
                    CoordinatorError::InputNotFound { .. } => RunState::InputNotFound,
                    _ => RunState::MissingRequiredArgument,
                };
                advance(&mut state, failed);
                return Err(error);
            }
        };

        advance(&mut state, RunState::EnsureWorkspace);
        workspace.ensure().map_err(CoordinatorError::Workspace)?;
        info!(
            root = %workspace.root().display(),
            backends = %request.selection,
            threads = request.threads,
            "workspace ready"
        );

        if workspace.is_preprocessed() {
            advance(&mut state, RunState::SkipPreprocess);
        } else {
            advance(&mut state, RunState::Preprocess);
        }
        let preprocess = PreprocessStage::new(self.runner, self.settings, request.threads)
            .run(&workspace)
            .await
            .map_err(|error| {
                advance(&mut state, RunState::PreprocessingFailed);
                CoordinatorError::PreprocessingFailed(error)
            })?;

        advance(&mut state, RunState::RunBackends);
        let mut report = RunReport::new(workspace.root().to_path_buf(), preprocess);
        let segmentation =
            SegmentationRunner::new(self.runner, self.settings, &workspace, request.threads);
        let total = request.selection.len();

        for (index, backend) in request.selection.iter().enumerate() {
            info!(backend = %backend, "running backend {}/{}", index + 1, total);

            match segmentation.run(adapter_for(backend)).await {
                BackendOutcome::Failed { backend, error, .. } if request.fail_fast => {
                    advance(&mut state, RunState::BackendFailed(backend));
                    warn!(backend = %backend, "fail-fast: skipping remaining backends");
                    report.duration = started.elapsed();
                    return Err(CoordinatorError::BackendFailed {
                        backend,
                        source: error,
                        report: Box::new(report),
                    });
                }
                outcome => report.push(outcome),
            }
        }

        advance(&mut state, RunState::Done);
        report.duration = started.elapsed();
        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            duration_ms = report.duration.as_millis() as u64,
            "pipeline finished"
        );
        Ok(report)
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug_assert!(state.allows(next), "illegal transition {state} -> {next}");
    debug!(from = %state, to = %next, "state transition");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use contracts::ContractError;
    use preprocess::PreprocessOutcome;
    use toolkit::{MockConfig, MockToolRunner};

    fn request(dir: &Path, selection: &[Backend]) -> RunRequest {
        fs::write(dir.join("T1.nii.gz"), "t1").unwrap();
        fs::write(dir.join("FLAIR.nii.gz"), "flair").unwrap();
        RunRequest {
            base_dir: dir.to_path_buf(),
            output_root: PathBuf::from("out"),
            t1: PathBuf::from("T1.nii.gz"),
            flair: PathBuf::from("FLAIR.nii.gz"),
            threads: 2,
            selection: selection.iter().copied().collect(),
            fail_fast: false,
        }
    }

    #[tokio::test]
    async fn test_empty_selection_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockToolRunner::new();
        let settings = PipelineSettings::default();

        let err = Coordinator::new(&runner, &settings)
            .run(&request(dir.path(), &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, CoordinatorError::MissingRequiredArgument { .. }));
        assert!(err.is_usage());
        assert_eq!(runner.invocation_count(), 0);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_missing_input_stops_before_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockToolRunner::new();
        let settings = PipelineSettings::default();
        let mut req = request(dir.path(), &[Backend::Sysu]);
        req.flair = PathBuf::from("missing.nii.gz");

        let err = Coordinator::new(&runner, &settings).run(&req).await.unwrap_err();

        assert!(matches!(err, CoordinatorError::InputNotFound { .. }));
        assert!(err.is_usage());
        assert!(!dir.path().join("out").exists());
        assert_eq!(runner.invocation_count(), 0);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockToolRunner::new();
        let settings = PipelineSettings::default();
        let mut req = request(dir.path(), &[Backend::Sysu]);
        req.threads = 0;

        let err = Coordinator::new(&runner, &settings).plan(&req).unwrap_err();
        assert!(matches!(err, CoordinatorError::MissingRequiredArgument { .. }));
    }

    #[tokio::test]
    async fn test_backends_run_in_canonical_order_after_preprocessing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockToolRunner::new();
        let settings = PipelineSettings::default();
        let req = request(dir.path(), &[Backend::Ucd, Backend::Sysu]);

        let report = Coordinator::new(&runner, &settings).run(&req).await.unwrap();

        assert!(!report.preprocess.skipped());
        assert!(!report.has_failures());
        let order: Vec<Backend> = report.outcomes.iter().map(BackendOutcome::backend).collect();
        assert_eq!(order, [Backend::Sysu, Backend::Ucd]);
        assert!(report.root.join("WMH_SYSU.txt").is_file());
        assert!(report.root.join("WMH_UCD.txt").is_file());
        assert!(!report.root.join("WMH_PGS.txt").exists());

        // every backend invocation comes after the last preprocessing one
        let invocations = runner.invocations();
        let first_backend = invocations.iter().position(|i| i.backend.is_some()).unwrap();
        assert!(invocations[first_backend..].iter().all(|i| i.backend.is_some()));
    }

    #[tokio::test]
    async fn test_second_run_skips_preprocessing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockToolRunner::new();
        let settings = PipelineSettings::default();
        let req = request(dir.path(), &[Backend::Sysu]);
        let coordinator = Coordinator::new(&runner, &settings);

        coordinator.run(&req).await.unwrap();
        runner.clear();
        let report = coordinator.run(&req).await.unwrap();

        assert_eq!(report.preprocess, PreprocessOutcome::Skipped);
        assert!(runner.invocations().iter().all(|i| i.backend == Some(Backend::Sysu)));
    }

    #[tokio::test]
    async fn test_backend_failure_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockToolRunner::with_config(MockConfig {
            fail_backends: vec![Backend::Pgs],
            ..Default::default()
        });
        let settings = PipelineSettings::default();
        let req = request(dir.path(), &[Backend::Pgs, Backend::Sysu]);

        let report = Coordinator::new(&runner, &settings).run(&req).await.unwrap();

        assert!(report.has_failures());
        assert_eq!(report.failed().collect::<Vec<_>>(), [Backend::Pgs]);
        assert_eq!(report.succeeded().collect::<Vec<_>>(), [Backend::Sysu]);
        assert!(!report.root.join("WMH_PGS.txt").exists());
        assert!(report.root.join("WMH_SYSU.txt").is_file());
    }

    #[tokio::test]
    async fn test_fail_fast_returns_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockToolRunner::with_config(MockConfig {
            fail_backends: vec![Backend::Sysu],
            ..Default::default()
        });
        let settings = PipelineSettings::default();
        let mut req = request(dir.path(), &[Backend::Pgs, Backend::Sysu, Backend::Fmrib]);
        req.fail_fast = true;

        let err = Coordinator::new(&runner, &settings).run(&req).await.unwrap_err();

        match err {
            CoordinatorError::BackendFailed { backend, source, report } => {
                assert_eq!(backend, Backend::Sysu);
                assert!(matches!(source, ContractError::ExternalToolFailure { .. }));
                assert_eq!(report.succeeded().collect::<Vec<_>>(), [Backend::Pgs]);
                assert_eq!(report.failed().count(), 0);
                assert!(report.render().contains("PGS"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(runner.invocations().iter().all(|i| i.backend != Some(Backend::Fmrib)));
    }

    #[tokio::test]
    async fn test_preprocessing_failure_runs_no_backend() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockToolRunner::with_config(MockConfig {
            fail_programs: vec!["mri_synthsr".into()],
            ..Default::default()
        });
        let settings = PipelineSettings::default();
        let req = request(dir.path(), &[Backend::Sysu]);

        let err = Coordinator::new(&runner, &settings).run(&req).await.unwrap_err();

        assert!(matches!(err, CoordinatorError::PreprocessingFailed(_)));
        assert!(!err.is_usage());
        assert!(runner.invocations().iter().all(|i| i.backend.is_none()));
    }

    #[test]
    fn test_plan_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockToolRunner::new();
        let settings = PipelineSettings::default();
        let req = request(dir.path(), &BackendSelection::all().iter().collect::<Vec<_>>());

        let plan = Coordinator::new(&runner, &settings).plan(&req).unwrap();

        assert!(plan.preprocess);
        assert_eq!(plan.backends, Backend::ALL);
        assert!(!dir.path().join("out").exists());
        assert!(plan.to_string().contains("Backend 7:     WMHsynthseg"));
    }
}
