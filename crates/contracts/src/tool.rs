//! ToolRunner trait - the seam to every external program
//!
//! Each unit of external work (image utility, MATLAB session, container run)
//! is described by a [`ToolInvocation`] and executed through a [`ToolRunner`].

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Backend, ContractError, Stage};

/// Description of a single external program run
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Program name or path
    pub program: String,

    /// Arguments, passed verbatim
    pub args: Vec<OsString>,

    /// Environment overrides on top of the inherited environment
    pub env: BTreeMap<String, OsString>,

    /// Explicit working directory (never the process cwd)
    pub working_dir: PathBuf,

    /// Files the tool must have produced when it exits successfully
    pub outputs: Vec<PathBuf>,

    /// Kill the tool after this long (None = wait forever)
    pub timeout: Option<Duration>,

    /// Stage the invocation belongs to
    pub stage: Stage,

    /// Backend the invocation belongs to
    pub backend: Option<Backend>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>, stage: Stage) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: working_dir.into(),
            outputs: Vec::new(),
            timeout: None,
            stage,
            backend: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl AsRef<OsStr>) -> Self {
        self.env.insert(key.into(), value.as_ref().to_os_string());
        self
    }

    /// Declare a file the tool is expected to produce
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn for_backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Arguments as lossy UTF-8, for logs and assertions
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Shell-like rendering for logs
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in self.args_lossy() {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push_str(&format!("'{arg}'"));
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    /// Build a failure error carrying this invocation's context
    pub fn failure(&self, status: Option<i32>, message: impl Into<String>) -> ContractError {
        ContractError::ExternalToolFailure {
            stage: self.stage,
            backend: self.backend,
            program: self.program.clone(),
            status,
            message: message.into(),
        }
    }

    /// Build a timeout error carrying this invocation's context
    pub fn timed_out(&self) -> ContractError {
        ContractError::ToolTimeout {
            stage: self.stage,
            backend: self.backend,
            program: self.program.clone(),
            timeout_secs: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
        }
    }
}

/// Result of a finished tool run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code (None when killed by a signal)
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ToolOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// External program executor
///
/// Implementations return `Ok` only when the tool exited with status 0 and
/// every declared output exists.
#[trait_variant::make(ToolRunner: Send)]
pub trait LocalToolRunner {
    /// Run the invocation to completion
    ///
    /// # Errors
    /// `ExternalToolFailure` on launch failure, non-zero exit or missing
    /// output; `ToolTimeout` when the time budget is exceeded.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ContractError>;
}

/// Check that every declared output of a finished invocation exists
pub fn verify_outputs(invocation: &ToolInvocation) -> Result<(), ContractError> {
    let missing: Vec<&Path> = invocation
        .outputs
        .iter()
        .map(PathBuf::as_path)
        .filter(|p| !p.exists())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let names: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
    Err(invocation.failure(
        Some(0),
        format!("produced no expected output: {}", names.join(", ")),
    ))
}
