//! # Preprocess
//!
//! One-time alignment of T1 and FLAIR into FLAIR space.
//!
//! The stage runs only when `proc/pre/FLAIR.nii.gz` is absent. That file is
//! moved into place last, so its presence means every other preprocessed
//! artifact exists.

mod stage;

pub use stage::{PreprocessOutcome, PreprocessStage};
