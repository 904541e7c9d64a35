//! Persisted workspace layout
//!
//! These names are read by downstream consumers and must not change.

/// Processing area below the output root
pub const PROC_DIR: &str = "proc";
/// Raw-oriented intermediates
pub const ORIG_DIR: &str = "orig";
/// Canonical aligned volumes
pub const PRE_DIR: &str = "pre";
/// One work directory per backend
pub const SEG_DIR: &str = "seg";

/// Published reference to `proc/pre/FLAIR.nii.gz`
pub const FLAIR_PREPROCESSED: &str = "FLAIR_preprocessed.nii.gz";
/// Published reference to `proc/pre/T1.nii.gz`
pub const T1_ALIGNED: &str = "T1Volume_aligned.nii.gz";

/// Synthetic T1 derived from FLAIR
pub const FLAIR_SYNTH_T1: &str = "FLAIR_synthT1.nii";
/// Rigid transform, synthetic T1 (FLAIR space) to T1
pub const REG_FLAIR_TO_T1: &str = "reg_FLAIR_to_3DT1.txt";
/// Inverse rigid transform, T1 to FLAIR space
pub const REG_T1_TO_FLAIR: &str = "reg_3DT1_to_FLAIR.txt";
/// Optional alignment diagnostic
pub const FLAIR_TO_T1: &str = "FLAIR_to_T1.nii.gz";

/// Raw-oriented inputs in `proc/orig`
pub const ORIG_T1: &str = "T1_LPI.nii.gz";
pub const ORIG_FLAIR: &str = "FLAIR_RPI.nii.gz";

/// Per-backend volume file inside `proc/seg/<Backend>`
pub const VOLUME_FILE: &str = "WMHvolume.txt";

/// Published mask name at the workspace root
pub fn published_mask(backend: crate::Backend) -> String {
    format!("WMH_{}.nii", backend.name())
}

/// Human-readable result file at the workspace root
pub fn result_file(backend: crate::Backend) -> String {
    format!("WMH_{}.txt", backend.name())
}

/// Binarized mask inside `proc/seg/<Backend>`
pub fn binary_mask(backend: crate::Backend) -> String {
    format!("WMH_{}_bin.nii", backend.name())
}
