//! ANTs: bias-field correction

use std::path::Path;

use contracts::{ContractError, ToolRunner, ToolSuite};

use crate::toolbox::Toolbox;

impl<R: ToolRunner + Sync> Toolbox<'_, R> {
    /// `N4BiasFieldCorrection -d 3 -i <input> -o <output>`
    pub async fn bias_correct(&self, input: &Path, output: &Path) -> Result<(), ContractError> {
        let inv = self
            .suite(ToolSuite::Ants, "N4BiasFieldCorrection")
            .args(["-d", "3"])
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .output(output);
        self.run(inv).await.map(|_| ())
    }
}
