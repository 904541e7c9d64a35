//! Toolbox - typed access to the external programs
//!
//! A [`Toolbox`] binds a runner, the settings and a [`ToolContext`] (working
//! directory, stage, backend, time budget, thread budget). The per-suite
//! operations live in [`crate::tools`] as `impl Toolbox` blocks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{
    Backend, ContractError, PipelineSettings, Stage, ToolInvocation, ToolOutput, ToolRunner,
    ToolSuite,
};
use tracing::debug;

/// Where and on whose behalf tools run
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Explicit working directory for every invocation
    pub working_dir: PathBuf,
    pub stage: Stage,
    pub backend: Option<Backend>,
    /// Time budget per invocation
    pub timeout: Option<Duration>,
    /// Thread budget propagated to the tools
    pub threads: usize,
}

impl ToolContext {
    /// Context for the preprocessing stage
    pub fn preprocess(working_dir: impl Into<PathBuf>, threads: usize, timeout: Option<Duration>) -> Self {
        Self {
            working_dir: working_dir.into(),
            stage: Stage::Preprocess,
            backend: None,
            timeout,
            threads,
        }
    }

    /// Context for one backend's segmentation run
    pub fn backend(
        backend: Backend,
        working_dir: impl Into<PathBuf>,
        threads: usize,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            working_dir: working_dir.into(),
            stage: Stage::Segmentation,
            backend: Some(backend),
            timeout,
            threads,
        }
    }
}

/// Runner + settings + context
pub struct Toolbox<'a, R> {
    runner: &'a R,
    settings: &'a PipelineSettings,
    ctx: ToolContext,
}

impl<'a, R: ToolRunner + Sync> Toolbox<'a, R> {
    pub fn new(runner: &'a R, settings: &'a PipelineSettings, ctx: ToolContext) -> Self {
        Self {
            runner,
            settings,
            ctx,
        }
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    pub fn settings(&self) -> &PipelineSettings {
        self.settings
    }

    /// Same runner and settings, different context
    pub fn with_context(&self, ctx: ToolContext) -> Toolbox<'a, R> {
        Toolbox {
            runner: self.runner,
            settings: self.settings,
            ctx,
        }
    }

    /// Invocation of a program from one of the configured suites
    pub(crate) fn suite(&self, suite: ToolSuite, name: &str) -> ToolInvocation {
        self.invocation(self.settings.tools.program(suite, name))
    }

    /// Invocation with the context applied
    pub(crate) fn invocation(&self, program: impl Into<String>) -> ToolInvocation {
        let threads = self.ctx.threads.to_string();
        let mut invocation = ToolInvocation::new(program, &self.ctx.working_dir, self.ctx.stage)
            .env("OMP_NUM_THREADS", &threads)
            .env("ITK_GLOBAL_DEFAULT_NUMBER_OF_THREADS", &threads)
            .timeout(self.ctx.timeout);
        if let Some(backend) = self.ctx.backend {
            invocation = invocation.for_backend(backend);
        }
        invocation
    }

    /// Run an invocation through the runner
    pub async fn run(&self, invocation: ToolInvocation) -> Result<ToolOutput, ContractError> {
        debug!(command = %invocation.command_line(), "tool invocation");
        self.runner.run(&invocation).await
    }
}

/// `FSLOUTPUTTYPE` matching the extension of the requested output
pub(crate) fn fsl_output_type(output: &Path) -> &'static str {
    if output.to_string_lossy().ends_with(".nii") {
        "NIFTI"
    } else {
        "NIFTI_GZ"
    }
}

/// Parse tool stdout, mapping failures to `ToolOutputParse`
pub(crate) fn parse_stdout<T, F>(program: &str, output: &ToolOutput, parse: F) -> Result<T, ContractError>
where
    F: FnOnce(&str) -> Option<T>,
{
    let text = output.stdout_trimmed();
    parse(text).ok_or_else(|| ContractError::tool_output(program, text))
}
