//! CLI argument definitions using clap.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use contracts::{Backend, BackendSelection};

/// Long options also accepted with a single dash (`-inT1`, `-doALL`, ...)
const LEGACY_LONG_FLAGS: &[&str] = &[
    "inT1",
    "inFLAIR",
    "outFolder",
    "threads",
    "doLPA",
    "doPGS",
    "doSYSU",
    "doFMRIB",
    "doUCD",
    "doLSTAI",
    "doWMHsynthseg",
    "doALL",
    "config",
    "timeout",
    "fail-fast",
    "dry-run",
    "log-format",
    "metrics-port",
];

/// WMH pipeline - multi-backend white matter hyperintensity segmentation
#[derive(Parser, Debug)]
#[command(
    name = "wmh-pipeline",
    author,
    version,
    about = "Multi-backend WMH segmentation pipeline",
    long_about = "Preprocesses a T1/FLAIR pair once, runs the selected WMH segmentation \n\
                  backends against the shared preprocessed inputs, and publishes one \n\
                  binary lesion mask and lesion volume per backend.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "WMH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "WMH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl Cli {
    /// Parse after rewriting single-dash long options
    pub fn try_parse_legacy<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_legacy_flags(args))
    }
}

/// Available subcommands; without one the pipeline runs
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a settings file without running
    Validate(ValidateArgs),

    /// Display backends and effective settings
    Info(InfoArgs),
}

/// Arguments for a pipeline run
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// T1-weighted input volume
    #[arg(long = "inT1", value_name = "PATH", env = "WMH_T1")]
    pub t1: Option<PathBuf>,

    /// FLAIR input volume
    #[arg(long = "inFLAIR", value_name = "PATH", env = "WMH_FLAIR")]
    pub flair: Option<PathBuf>,

    /// Workspace root
    #[arg(long = "outFolder", value_name = "PATH", env = "WMH_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Thread budget passed to every external tool
    #[arg(long, value_name = "N", env = "WMH_THREADS")]
    pub threads: Option<usize>,

    /// Run LST-LPA (MATLAB)
    #[arg(long = "doLPA")]
    pub lpa: bool,

    /// Run PGS (container)
    #[arg(long = "doPGS")]
    pub pgs: bool,

    /// Run SYSU (container)
    #[arg(long = "doSYSU")]
    pub sysu: bool,

    /// Run FMRIB TrUE-Net (container)
    #[arg(long = "doFMRIB")]
    pub fmrib: bool,

    /// Run UCD (container)
    #[arg(long = "doUCD")]
    pub ucd: bool,

    /// Run LST-AI (container)
    #[arg(long = "doLSTAI")]
    pub lst_ai: bool,

    /// Run WMH-SynthSeg (FreeSurfer)
    #[arg(long = "doWMHsynthseg")]
    pub wmh_synthseg: bool,

    /// Run every backend
    #[arg(long = "doALL")]
    pub all: bool,

    /// Settings file (TOML or JSON)
    #[arg(short, long, value_name = "FILE", env = "WMH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Per-invocation tool timeout in seconds (0 = no limit)
    #[arg(long, value_name = "SECS", env = "WMH_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Stop at the first failing backend
    #[arg(long, env = "WMH_FAIL_FAST")]
    pub fail_fast: bool,

    /// Print the run plan and exit without touching the workspace
    #[arg(long)]
    pub dry_run: bool,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "WMH_METRICS_PORT")]
    pub metrics_port: u16,
}

impl RunArgs {
    /// Backends chosen by the `-do*` flags
    pub fn selection(&self) -> BackendSelection {
        if self.all {
            return BackendSelection::all();
        }
        [
            (self.lpa, Backend::Lpa),
            (self.pgs, Backend::Pgs),
            (self.sysu, Backend::Sysu),
            (self.fmrib, Backend::Fmrib),
            (self.ucd, Backend::Ucd),
            (self.lst_ai, Backend::LstAi),
            (self.wmh_synthseg, Backend::WmhSynthSeg),
        ]
        .into_iter()
        .filter_map(|(selected, backend)| selected.then_some(backend))
        .collect()
    }

    pub fn metrics_port(&self) -> Option<u16> {
        (self.metrics_port != 0).then_some(self.metrics_port)
    }
}

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Settings file to validate
    #[arg(short, long, env = "WMH_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Settings file (defaults apply when omitted)
    #[arg(short, long, env = "WMH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print the effective settings as TOML
    #[arg(long)]
    pub settings: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

/// Rewrite `-inT1` style options to `--inT1`; short flags are left alone
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(rest) = text.strip_prefix('-').filter(|r| !r.starts_with('-')) else {
                return arg;
            };
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            if LEGACY_LONG_FLAGS.contains(&name) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}
