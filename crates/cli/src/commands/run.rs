//! Pipeline run (default command).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::PipelineSettings;
use coordinator::{Coordinator, RunRequest};
use toolkit::ProcessRunner;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute a pipeline run
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let settings = load_settings(args)?;
    let request = build_request(args)?;

    let runner = ProcessRunner::new();
    let coordinator = Coordinator::new(&runner, &settings);

    if args.dry_run {
        let plan = coordinator.plan(&request).context("invalid run request")?;
        info!("Dry run mode - nothing will be executed");
        println!("\n=== Run Plan ===\n");
        println!("{plan}");
        return Ok(());
    }

    info!(
        t1 = %request.t1.display(),
        flair = %request.flair.display(),
        backends = %request.selection,
        "Starting pipeline"
    );

    let report = match coordinator.run(&request).await {
        Ok(report) => report,
        Err(error) => {
            if let Some(partial) = error.partial_report() {
                partial.print_summary();
            }
            return Err(anyhow::Error::new(error).context("pipeline run failed"));
        }
    };
    report.print_summary();

    let failed = report.failed().count();
    if failed > 0 {
        warn!(failed, "some backends failed");
        return Err(CliError::BackendsFailed {
            failed,
            total: report.outcomes.len(),
        }
        .into());
    }

    info!("WMH pipeline finished");
    Ok(())
}

/// Settings file (or defaults) with CLI overrides applied
fn load_settings(args: &RunArgs) -> Result<PipelineSettings> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()).into());
        }
        info!(config = %path.display(), "Loading settings");
    }

    let mut settings = ConfigLoader::load_or_default(args.config.as_deref())
        .context("failed to load settings")?;

    if let Some(timeout) = args.timeout {
        info!(timeout_secs = timeout, "Overriding tool timeout from CLI");
        settings.timeouts.default_secs = timeout;
        settings.timeouts.preprocess_secs = None;
        settings.timeouts.backends.clear();
    }

    Ok(settings)
}

fn build_request(args: &RunArgs) -> Result<RunRequest> {
    let t1 = required(&args.t1, "-inT1")?;
    let flair = required(&args.flair, "-inFLAIR")?;
    let output_root = required(&args.output, "-outFolder")?;
    let threads = args.threads.ok_or(CliError::missing_argument("-threads"))?;
    let base_dir = std::env::current_dir().context("cannot determine current directory")?;

    Ok(RunRequest {
        base_dir,
        output_root,
        t1,
        flair,
        threads,
        selection: args.selection(),
        fail_fast: args.fail_fast,
    })
}

fn required(value: &Option<PathBuf>, flag: &'static str) -> Result<PathBuf> {
    value
        .as_deref()
        .map(Path::to_path_buf)
        .ok_or_else(|| CliError::missing_argument(flag).into())
}
