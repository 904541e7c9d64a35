//! Mock tool runner
//!
//! Records every invocation, answers with canned stdout and creates the
//! declared outputs, with injectable failures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use contracts::{verify_outputs, Backend, ContractError, ToolInvocation, ToolOutput, ToolRunner};
use tracing::instrument;

/// Canned response: program + argument marker -> stdout
#[derive(Debug, Clone)]
struct Response {
    program: String,
    marker: String,
    stdout: String,
}

/// Mock runner configuration
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Programs (base names) that exit with status 1
    pub fail_programs: Vec<String>,
    /// Backends whose every invocation exits with status 1
    pub fail_backends: Vec<Backend>,
    /// Programs that run but do not create their declared outputs
    pub skip_outputs: Vec<String>,
    /// Command-line prefixes (`"docker run"`) that run out of time
    pub timeouts: Vec<String>,
}

/// Mock runner
pub struct MockToolRunner {
    config: MockConfig,
    responses: Vec<Response>,
    invocations: Mutex<Vec<ToolInvocation>>,
}

impl MockToolRunner {
    /// Runner answering imaging queries for an axis-aligned 1mm FLAIR in RPI
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            responses: Vec::new(),
            invocations: Mutex::new(Vec::new()),
        }
        .respond("3dinfo", "-is_oblique", "0")
        .respond("3dinfo", "-orient", "RPI")
        .respond("3dinfo", "-ad3", "1.000000\t1.000000\t1.000000")
        .respond("fslstats", "-V", "0 0.000000")
    }

    /// Answer invocations of `program` containing argument `marker`
    ///
    /// Later registrations take precedence.
    pub fn respond(mut self, program: &str, marker: &str, stdout: &str) -> Self {
        self.responses.insert(
            0,
            Response {
                program: program.to_string(),
                marker: marker.to_string(),
                stdout: stdout.to_string(),
            },
        );
        self
    }

    /// All invocations so far, in order
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Invocations of one program (base name)
    pub fn invocations_of(&self, program: &str) -> Vec<ToolInvocation> {
        self.invocations()
            .into_iter()
            .filter(|inv| base_name(&inv.program) == program)
            .collect()
    }

    /// Distinct program base names invoked
    pub fn programs(&self) -> HashSet<String> {
        self.invocations()
            .iter()
            .map(|inv| base_name(&inv.program).to_string())
            .collect()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.invocations.lock().unwrap().clear();
    }

    fn stdout_for(&self, invocation: &ToolInvocation) -> String {
        let program = base_name(&invocation.program);
        let args = invocation.args_lossy();
        self.responses
            .iter()
            .find(|r| r.program == program && args.iter().any(|a| a == &r.marker))
            .map(|r| r.stdout.clone())
            .unwrap_or_default()
    }

    fn should_fail(&self, invocation: &ToolInvocation) -> bool {
        let program = base_name(&invocation.program);
        self.config.fail_programs.iter().any(|p| p == program)
            || invocation
                .backend
                .is_some_and(|b| self.config.fail_backends.contains(&b))
    }
}

impl MockToolRunner {
    fn should_time_out(&self, invocation: &ToolInvocation) -> bool {
        let mut line = base_name(&invocation.program).to_string();
        for arg in invocation.args_lossy() {
            line.push(' ');
            line.push_str(&arg);
        }
        self.config.timeouts.iter().any(|prefix| line.starts_with(prefix.as_str()))
    }
}

impl Default for MockToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Program name without directory
fn base_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
}

/// Deterministic content so repeated runs produce identical files
fn touch(path: &Path, invocation: &ToolInvocation) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{}\n", invocation.command_line()))
}

impl ToolRunner for MockToolRunner {
    #[instrument(name = "mock_tool_run", skip(self, invocation), fields(program = %invocation.program))]
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ContractError> {
        self.invocations.lock().unwrap().push(invocation.clone());

        if self.should_fail(invocation) {
            return Err(invocation.failure(Some(1), "mock failure"));
        }
        if self.should_time_out(invocation) {
            return Err(invocation.timed_out());
        }

        let program = base_name(&invocation.program);
        if !self.config.skip_outputs.iter().any(|p| p == program) {
            for output in &invocation.outputs {
                touch(output, invocation)
                    .map_err(|e| invocation.failure(Some(1), format!("mock write: {e}")))?;
            }
        }
        verify_outputs(invocation)?;

        Ok(ToolOutput::ok(self.stdout_for(invocation)))
    }
}
