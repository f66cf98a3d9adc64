//! Host resource sampling.
//!
//! A [`MetricsSource`] produces one [`MetricsSample`] per call. The production
//! source, [`ProcMetrics`], derives CPU load from the delta between two reads
//! of `/proc/stat`.

use chrono::{DateTime, Local};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SourceError;
use crate::system::{read_cpu_stat, read_memory_info, CpuStat};

/// One reading of host CPU, RAM and swap utilization.
///
/// All percentages are within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSample {
    cpu_percent: f64,
    ram_percent: f64,
    swap_percent: f64,
    timestamp: DateTime<Local>,
}

/// A provider of host resource readings.
pub trait MetricsSource: Send + 'static {
    fn sample(&mut self) -> Result<MetricsSample, SourceError>;
}

/// Metrics read from a proc filesystem.
///
/// The first call to [`sample`](MetricsSource::sample) reports the average CPU
/// load since boot; later calls report the load since the previous call.
#[derive(Debug)]
pub struct ProcMetrics {
    root: PathBuf,
    previous: Option<CpuStat>,
}

// === impl MetricsSample ===

impl MetricsSample {
    /// Creates a sample, clamping each percentage into `[0, 100]`.
    pub fn new(cpu_percent: f64, ram_percent: f64, swap_percent: f64, timestamp: DateTime<Local>) -> Self {
        Self {
            cpu_percent: clamp_percent(cpu_percent),
            ram_percent: clamp_percent(ram_percent),
            swap_percent: clamp_percent(swap_percent),
            timestamp,
        }
    }

    pub fn cpu_percent(&self) -> f64 {
        self.cpu_percent
    }

    pub fn ram_percent(&self) -> f64 {
        self.ram_percent
    }

    /// Swap utilization, used as a stand-in for compressed memory (zram).
    pub fn swap_percent(&self) -> f64 {
        self.swap_percent
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

impl Display for MetricsSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU: {:.1}% | RAM: {:.1}% | SWAP: {:.1}%",
            self.cpu_percent, self.ram_percent, self.swap_percent
        )
    }
}

// === impl ProcMetrics ===

impl ProcMetrics {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            previous: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl MetricsSource for ProcMetrics {
    fn sample(&mut self) -> Result<MetricsSample, SourceError> {
        let current = read_cpu_stat(&self.root)?;
        let memory = read_memory_info(&self.root)?;

        let baseline = self.previous.replace(current).unwrap_or_default();
        let cpu_percent = current.busy_percent_since(&baseline);

        debug!(
            "Sampled cpu={:.1}% ram={:.1}% swap={:.1}%",
            cpu_percent,
            memory.ram_percent(),
            memory.swap_percent()
        );

        Ok(MetricsSample::new(
            cpu_percent,
            memory.ram_percent(),
            memory.swap_percent(),
            Local::now(),
        ))
    }
}
