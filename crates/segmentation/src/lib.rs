//! # Segmentation
//!
//! Backend adapters and the volume reporter.
//!
//! Each adapter describes how its backend is launched, where the raw result
//! lands, how the result's geometry is repaired and how it is binarized.
//! [`SegmentationRunner`] drives any adapter through the same sequence:
//!
//! 1. recreate `proc/seg/<Backend>`
//! 2. launch the backend
//! 3. repair geometry
//! 4. binarize into `WMH_<Backend>_bin.nii`
//! 5. measure and write `WMHvolume.txt` / `WMH_<Backend>.txt`
//! 6. publish `WMH_<Backend>.nii`

mod adapter;
pub mod adapters;
pub mod reporter;
mod rules;
mod runner;

pub use adapter::{BackendAdapter, BackendContext, Launch};
pub use adapters::adapter_for;
pub use reporter::VolumeReport;
pub use rules::{BinarizeRule, GeometryFix};
pub use runner::SegmentationRunner;
