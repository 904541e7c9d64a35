//! Run report

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use contracts::{Backend, BackendOutcome};
use observability::{RunMetricsAggregator, RunMetricsSummary};
use preprocess::PreprocessOutcome;
use segmentation::reporter::format_volume;

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunReport {
    /// Workspace root
    pub root: PathBuf,

    pub preprocess: PreprocessOutcome,

    /// One outcome per attempted backend, in canonical order
    pub outcomes: Vec<BackendOutcome>,

    /// Total wall-clock time of the run
    pub duration: Duration,

    pub metrics: RunMetricsAggregator,
}

impl RunReport {
    pub(crate) fn new(root: PathBuf, preprocess: PreprocessOutcome) -> Self {
        Self {
            root,
            preprocess,
            outcomes: Vec::new(),
            duration: Duration::ZERO,
            metrics: RunMetricsAggregator::new(),
        }
    }

    pub(crate) fn push(&mut self, outcome: BackendOutcome) {
        self.metrics.update(&outcome);
        self.outcomes.push(outcome);
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.is_success())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = Backend> + '_ {
        self.outcomes.iter().filter(|o| o.is_success()).map(BackendOutcome::backend)
    }

    pub fn failed(&self) -> impl Iterator<Item = Backend> + '_ {
        self.outcomes.iter().filter(|o| !o.is_success()).map(BackendOutcome::backend)
    }

    pub fn outcome(&self, backend: Backend) -> Option<&BackendOutcome> {
        self.outcomes.iter().find(|o| o.backend() == backend)
    }

    pub fn metrics_summary(&self) -> RunMetricsSummary {
        self.metrics.summary()
    }

    /// Human-readable summary table
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "WMH pipeline: {}", self.root.display());
        let _ = writeln!(
            out,
            "Preprocessing: {}",
            if self.preprocess.skipped() { "skipped (already complete)" } else { "completed" }
        );
        let _ = writeln!(out, "Duration: {:.2}s", self.duration.as_secs_f64());
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<14} {:<8} {:>14} {:>9}", "Backend", "Status", "Volume (ml)", "Minutes");

        for outcome in &self.outcomes {
            match outcome {
                BackendOutcome::Succeeded(record) => {
                    let _ = writeln!(
                        out,
                        "{:<14} {:<8} {:>14} {:>9}",
                        record.backend.name(),
                        "ok",
                        format_volume(record.volume_ml),
                        record.elapsed_minutes
                    );
                }
                BackendOutcome::Failed { backend, error, .. } => {
                    let _ = writeln!(out, "{:<14} {:<8} {}", backend.name(), "FAILED", error);
                }
            }
        }

        let summary = self.metrics_summary();
        let _ = writeln!(
            out,
            "\nBackends: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );
        out
    }

    /// Print the summary table to stdout
    pub fn print_summary(&self) {
        println!("\n{}", self.render());
    }
}
