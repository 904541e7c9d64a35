//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{Backend, BackendKind, PipelineSettings};
use segmentation::adapter_for;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

#[derive(Serialize)]
struct BackendInfo {
    name: &'static str,
    kind: String,
    /// Container image or executable
    runs: String,
    binarize: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()).into());
        }
        info!(config = %path.display(), "Loading settings");
    }

    let settings = ConfigLoader::load_or_default(args.config.as_deref())
        .context("failed to load settings")?;
    let backends = backend_info(&settings);

    if args.json {
        let json =
            serde_json::to_string_pretty(&backends).context("Failed to serialize backend info")?;
        println!("{json}");
    } else {
        println!("\n=== Backends ===\n");
        println!("{:<14} {:<11} {:<18} Runs", "Backend", "Kind", "Binarize");
        for b in &backends {
            println!("{:<14} {:<11} {:<18} {}", b.name, b.kind, b.binarize, b.runs);
        }
        println!();
    }

    if args.settings {
        let toml = ConfigLoader::to_toml(&settings).context("Failed to serialize settings")?;
        println!("=== Effective settings ===\n\n{toml}");
    }

    Ok(())
}

fn backend_info(settings: &PipelineSettings) -> Vec<BackendInfo> {
    Backend::ALL
        .into_iter()
        .map(|backend| {
            let runs = match backend.kind() {
                BackendKind::Matlab => settings.matlab.binary.clone(),
                BackendKind::Container => settings
                    .container
                    .image(backend)
                    .map(|image| format!("{} {}", settings.container.runtime_binary(), image.image))
                    .unwrap_or_else(|| "<no image>".to_string()),
                BackendKind::FreeSurfer => settings.freesurfer.wmh_program("mri_WMHsynthseg"),
            };

            BackendInfo {
                name: backend.name(),
                kind: format!("{:?}", backend.kind()).to_lowercase(),
                runs,
                binarize: adapter_for(backend).binarize_rule(settings).to_string(),
                timeout_secs: settings.timeouts.backend(backend).map(|t| t.as_secs()),
            }
        })
        .collect()
}
