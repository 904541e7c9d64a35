//! Typed operations per tool suite
//!
//! Each module adds an `impl Toolbox` block. Operations that rewrite a file
//! in place declare that file as their output.

pub mod afni;
pub mod ants;
pub mod container;
pub mod freesurfer;
pub mod fsl;
pub mod matlab;
pub mod nifti;
