//! Pipeline metrics
//!
//! Emitted through the `metrics` facade; a no-op unless an exporter is
//! installed. [`RunMetricsAggregator`] keeps the same figures in memory for
//! the end-of-run summary.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::{Backend, BackendOutcome};
use metrics::{counter, gauge, histogram};

/// Record one external tool run
///
/// `status` is `success`, `failure` or `timeout`.
pub fn record_tool_invocation(program: &str, status: &str, duration: Duration) {
    let program = program_label(program);
    counter!(
        "wmh_tool_invocations_total",
        "program" => program.clone(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("wmh_tool_duration_seconds", "program" => program).record(duration.as_secs_f64());
}

/// Record the end of a backend branch
pub fn record_backend_run(backend: Backend, success: bool, elapsed: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "wmh_backend_runs_total",
        "backend" => backend.name(),
        "status" => status
    )
    .increment(1);

    histogram!("wmh_backend_duration_seconds", "backend" => backend.name())
        .record(elapsed.as_secs_f64());
}

/// Record a measured lesion volume
pub fn record_lesion_volume(backend: Backend, volume_ml: f64) {
    gauge!("wmh_lesion_volume_ml", "backend" => backend.name()).set(volume_ml);
}

/// Record whether preprocessing ran or was found complete
pub fn record_preprocess(skipped: bool, elapsed: Duration) {
    let outcome = if skipped { "skipped" } else { "ran" };
    counter!("wmh_preprocess_total", "outcome" => outcome).increment(1);
    if !skipped {
        histogram!("wmh_preprocess_duration_seconds").record(elapsed.as_secs_f64());
    }
}

/// Label without the install directory
fn program_label(program: &str) -> String {
    program
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(program)
        .to_string()
}

/// In-memory aggregation of backend outcomes
#[derive(Debug, Clone, Default)]
pub struct RunMetricsAggregator {
    pub succeeded: u64,
    pub failed: u64,

    /// Backend wall-clock time (seconds)
    pub duration_stats: RunningStats,

    /// Lesion volumes of successful backends (ml)
    pub volume_stats: RunningStats,

    /// Failed backend -> error message
    pub failures: BTreeMap<Backend, String>,
}

impl RunMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, outcome: &BackendOutcome) {
        self.duration_stats.push(outcome.elapsed().as_secs_f64());
        match outcome {
            BackendOutcome::Succeeded(record) => {
                self.succeeded += 1;
                self.volume_stats.push(record.volume_ml);
            }
            BackendOutcome::Failed { backend, error, .. } => {
                self.failed += 1;
                self.failures.insert(*backend, error.to_string());
            }
        }
    }

    pub fn summary(&self) -> RunMetricsSummary {
        RunMetricsSummary {
            succeeded: self.succeeded,
            failed: self.failed,
            backend_seconds: StatsSummary::from(&self.duration_stats),
            volume_ml: StatsSummary::from(&self.volume_stats),
            failures: self.failures.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary of a run's backend outcomes
#[derive(Debug, Clone, Default)]
pub struct RunMetricsSummary {
    pub succeeded: u64,
    pub failed: u64,
    pub backend_seconds: StatsSummary,
    pub volume_ml: StatsSummary,
    pub failures: BTreeMap<Backend, String>,
}

impl std::fmt::Display for RunMetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Run Metrics Summary ===")?;
        writeln!(
            f,
            "Backends: {} succeeded, {} failed",
            self.succeeded, self.failed
        )?;
        writeln!(f, "Backend time (s): {}", self.backend_seconds)?;
        writeln!(f, "Lesion volume (ml): {}", self.volume_ml)?;

        if !self.failures.is_empty() {
            writeln!(f, "Failures:")?;
            for (backend, error) in &self.failures {
                writeln!(f, "  {backend}: {error}")?;
            }
        }

        Ok(())
    }
}

/// Statistics snapshot
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
