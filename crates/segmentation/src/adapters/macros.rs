//! Backend adapter macros
//!
//! The challenge containers share one shape: fixed image contract, a single
//! raw result file and no extra arguments.

/// Define a containerized backend adapter
///
/// # Usage
/// ```ignore
/// define_container_adapter!(
///     SysuAdapter,                    // Adapter name
///     Backend::Sysu,                  // Backend id
///     "result.nii.gz",                // Raw output
///     BinarizeRule::Threshold(0.9999),
///     GeometryFix::ReorientToFlair,
///     false                           // Needs brain mask
/// );
/// ```
macro_rules! define_container_adapter {
    (
        $adapter_name:ident,
        $backend:expr,
        $raw_output:expr,
        $rule:expr,
        $fix:expr,
        $brain_mask:expr
    ) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $adapter_name;

        impl $crate::adapter::BackendAdapter for $adapter_name {
            fn backend(&self) -> contracts::Backend {
                $backend
            }

            fn launch(&self) -> $crate::adapter::Launch {
                $crate::adapter::Launch::Container {
                    brain_mask: $brain_mask,
                }
            }

            fn raw_outputs(&self) -> &'static [&'static str] {
                &[$raw_output]
            }

            fn geometry_fix(&self) -> $crate::rules::GeometryFix {
                $fix
            }

            fn binarize_rule(&self, _settings: &contracts::PipelineSettings) -> $crate::rules::BinarizeRule {
                $rule
            }
        }
    };
}
