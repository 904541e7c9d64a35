//! MATLAB batch sessions (SPM + LST)

use std::path::Path;

use contracts::{ContractError, ToolRunner};

use crate::toolbox::Toolbox;

/// MATLAB string literal with embedded quotes doubled
fn quoted(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

impl<R: ToolRunner + Sync> Toolbox<'_, R> {
    /// Batch script running `ps_LST_lpa(flair, t1)` with the toolboxes on the path
    pub fn lpa_script(&self, flair: &Path, t1: &Path) -> String {
        let matlab = &self.settings().matlab;
        let mut script = format!("maxNumCompThreads({});", self.context().threads);
        for dir in [&matlab.spm_dir, &matlab.lst_dir].into_iter().flatten() {
            script.push_str(&format!(" addpath(genpath({}));", quoted(dir)));
        }
        script.push_str(&format!(
            " spm('defaults', 'fmri'); spm_jobman('initcfg'); ps_LST_lpa({}, {}, 0);",
            quoted(flair),
            quoted(t1)
        ));
        script
    }

    /// `matlab -nodisplay -nosplash -batch <script>` in the context directory
    pub async fn matlab_batch(&self, script: &str, outputs: &[&Path]) -> Result<(), ContractError> {
        let mut inv = self
            .invocation(&self.settings().matlab.binary)
            .args(["-nodisplay", "-nosplash", "-batch"])
            .arg(script);
        for output in outputs {
            inv = inv.output(*output);
        }
        self.run(inv).await.map(|_| ())
    }
}
