//! Settings validation
//!
//! Rules:
//! - field ranges declared on the settings types (`validator` derive)
//! - container images are non-empty references
//! - only containerized backends get a container image

use ::validator::Validate;

use contracts::{Backend, BackendKind, ContractError, PipelineSettings};

/// Validate settings
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(settings: &PipelineSettings) -> Result<(), ContractError> {
    validate_fields(settings)?;
    validate_images(settings)?;
    Ok(())
}

/// Declarative field rules
fn validate_fields(settings: &PipelineSettings) -> Result<(), ContractError> {
    settings.validate().map_err(|errors| {
        let field = errors
            .errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "settings".to_string());
        ContractError::config_validation(field, errors.to_string())
    })
}

/// Container image references
fn validate_images(settings: &PipelineSettings) -> Result<(), ContractError> {
    for (backend, image) in &settings.container.images {
        if image.image.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("container.images.{backend}"),
                "image reference cannot be empty",
            ));
        }
        if backend.kind() != BackendKind::Container {
            return Err(ContractError::config_validation(
                format!("container.images.{backend}"),
                format!("{backend} does not run in a container"),
            ));
        }
    }
    Ok(())
}

/// Backends that will need an image but have none configured
pub fn missing_images(settings: &PipelineSettings) -> Vec<Backend> {
    Backend::ALL
        .into_iter()
        .filter(|b| b.kind() == BackendKind::Container)
        .filter(|b| settings.container.image(*b).is_none())
        .collect()
}
