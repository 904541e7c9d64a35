//! nifti_tool: header cleanup

use std::path::Path;

use contracts::{ContractError, ToolRunner, ToolSuite};

use crate::toolbox::Toolbox;

impl<R: ToolRunner + Sync> Toolbox<'_, R> {
    /// `nifti_tool -strip_extras -overwrite -infiles <volume>` (in place)
    pub async fn strip_extensions(&self, volume: &Path) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::NiftiTools, "nifti_tool")
            .args(["-strip_extras", "-overwrite", "-infiles"])
            .arg(volume)
            .output(volume);
        self.run(inv).await.map(|_| ())
    }
}
