//! # Integration Tests
//!
//! End-to-end scenarios against a simulated toolkit.
//!
//! Covers:
//! - threshold, flip and volume properties on actual voxel data
//! - selection completeness and idempotent reruns
//! - backend isolation, failure isolation and fail-fast

pub mod simulated;

pub use simulated::{SimVolume, SimulatedToolkit};

#[cfg(test)]
mod e2e_tests;

#[cfg(test)]
mod contract_tests {
    use contracts::{layout, Backend};

    #[test]
    fn test_published_names_are_stable() {
        let names: Vec<String> = Backend::ALL.into_iter().map(layout::published_mask).collect();
        assert_eq!(
            names,
            [
                "WMH_LPA.nii",
                "WMH_PGS.nii",
                "WMH_SYSU.nii",
                "WMH_FMRIB.nii",
                "WMH_UCD.nii",
                "WMH_LSTAI.nii",
                "WMH_WMHsynthseg.nii",
            ]
        );
        assert_eq!(layout::result_file(Backend::Ucd), "WMH_UCD.txt");
    }
}
