//! WMH segmentation challenge containers
//!
//! Read `/input/pre/{FLAIR,T1}.nii.gz`, write `/output/result.nii.gz`.

use contracts::Backend;

use crate::rules::{BinarizeRule, GeometryFix};

/// Container result file
pub const RESULT: &str = "result.nii.gz";

define_container_adapter!(
    PgsAdapter,
    Backend::Pgs,
    RESULT,
    BinarizeRule::Copy,
    GeometryFix::ReorientToFlair,
    false
);

define_container_adapter!(
    SysuAdapter,
    Backend::Sysu,
    RESULT,
    BinarizeRule::Threshold(0.9999),
    GeometryFix::ReorientToFlair,
    false
);

define_container_adapter!(
    FmribAdapter,
    Backend::Fmrib,
    RESULT,
    BinarizeRule::Copy,
    GeometryFix::FlipXY,
    false
);

define_container_adapter!(
    UcdAdapter,
    Backend::Ucd,
    RESULT,
    BinarizeRule::Threshold(0.5),
    GeometryFix::None,
    true
);
