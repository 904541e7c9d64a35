//! Child-process tool runner
//!
//! Runs each invocation with an explicit working directory, captures
//! stdout/stderr and kills the child when its time budget runs out.

use std::process::Stdio;
use std::time::Instant;

use contracts::{verify_outputs, ContractError, ToolInvocation, ToolOutput, ToolRunner};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Number of stderr lines kept in failure messages
const STDERR_TAIL_LINES: usize = 20;

/// Runner backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &ToolInvocation) -> Command {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(&invocation.env)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl ToolRunner for ProcessRunner {
    #[instrument(
        name = "tool_run",
        skip(self, invocation),
        fields(
            program = %invocation.program,
            stage = %invocation.stage,
            backend = ?invocation.backend
        )
    )]
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ContractError> {
        debug!(command = %invocation.command_line(), cwd = %invocation.working_dir.display(), "launching tool");
        let started = Instant::now();

        let child = Self::command(invocation)
            .spawn()
            .map_err(|e| invocation.failure(None, format!("failed to launch: {e}")))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let waited = match invocation.timeout {
            Some(budget) => match tokio::time::timeout(budget, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_secs = budget.as_secs(), "tool exceeded its time budget, killed");
                    observability::record_tool_invocation(
                        &invocation.program,
                        "timeout",
                        started.elapsed(),
                    );
                    return Err(invocation.timed_out());
                }
            },
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|e| invocation.failure(None, format!("wait failed: {e}")))?;
        let result = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: started.elapsed(),
        };

        if !result.success() {
            observability::record_tool_invocation(&invocation.program, "failure", result.duration);
            return Err(invocation.failure(result.status, stderr_tail(&result.stderr)));
        }

        if let Err(e) = verify_outputs(invocation) {
            observability::record_tool_invocation(&invocation.program, "failure", result.duration);
            return Err(e);
        }

        observability::record_tool_invocation(&invocation.program, "success", result.duration);
        info!(
            elapsed_ms = result.duration.as_millis() as u64,
            "tool finished"
        );
        Ok(result)
    }
}

/// Last lines of stderr, or a placeholder when the tool printed nothing
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "no diagnostic output".to_string();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
