//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::{missing_images, ConfigLoader};
use contracts::PipelineSettings;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SettingsSummary>,
}

#[derive(Serialize)]
struct SettingsSummary {
    container_runtime: String,
    images: usize,
    default_timeout_secs: u64,
    publish_mode: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating settings");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let result = match ConfigLoader::load_from_path(&args.config) {
        Ok(settings) => ValidationResult {
            valid: true,
            config_path: args.config.display().to_string(),
            error: None,
            warnings: collect_warnings(&settings),
            summary: Some(SettingsSummary {
                container_runtime: settings.container.runtime_binary(),
                images: settings.container.images.len(),
                default_timeout_secs: settings.timeouts.default_secs,
                publish_mode: format!("{:?}", settings.publish.mode).to_lowercase(),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path: args.config.display().to_string(),
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Settings validation failed")
    }
}

/// Non-fatal issues
fn collect_warnings(settings: &PipelineSettings) -> Vec<String> {
    let mut warnings: Vec<String> = missing_images(settings)
        .into_iter()
        .map(|backend| format!("no container image for {backend}; it cannot be selected"))
        .collect();

    if settings.timeouts.default_secs == 0 {
        warnings.push("timeouts.default_secs is 0 - a hung tool blocks the run".to_string());
    }
    if settings.freesurfer.home.is_none() {
        warnings.push("freesurfer.home unset - tools are resolved from PATH".to_string());
    }
    if settings.matlab.spm_dir.is_none() || settings.matlab.lst_dir.is_none() {
        warnings.push("matlab.spm_dir / matlab.lst_dir unset - LPA relies on the MATLAB path".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Settings are valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Container runtime: {}", summary.container_runtime);
            println!("  Images: {}", summary.images);
            println!("  Default timeout (s): {}", summary.default_timeout_secs);
            println!("  Publish mode: {}", summary.publish_mode);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Settings are invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}
