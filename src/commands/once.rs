//! Once command implementation.
//!
//! Prints the panel lines to stdout, without taking over the terminal.

use std::io::Write;
use std::thread;

use anyhow::Context;
use tracing::info;

use crate::config::Config;
use crate::metrics::{MetricsSource, ProcMetrics};
use crate::process::{ProcTable, ProcessSource};

/// Samples `iterations` times, one metrics interval apart.
///
/// A priming sample is taken first so every printed CPU figure covers a full
/// interval rather than the time since boot.
pub fn command_once(iterations: usize, config: &Config) -> anyhow::Result<()> {
    let root = config.proc_root();
    let mut metrics = ProcMetrics::new(&root);
    let table = ProcTable::new(&root);
    let mut stdout = std::io::stdout();

    sample_lines(&mut metrics, &table, config, iterations, &mut stdout, |config| {
        thread::sleep(config.metrics_interval())
    })
}

fn sample_lines<M, P, W, S>(
    metrics: &mut M,
    processes: &P,
    config: &Config,
    iterations: usize,
    out: &mut W,
    mut wait: S,
) -> anyhow::Result<()>
where
    M: MetricsSource,
    P: ProcessSource,
    W: Write,
    S: FnMut(&Config),
{
    let watch_list = config.watch_list();
    metrics.sample().context("Metrics source unavailable")?;

    for i in 0..iterations {
        wait(config);
        let sample = metrics.sample().context("Metrics source unavailable")?;
        let status = processes.scan(&watch_list).context("Process source unavailable")?;

        info!("Sample {}/{} taken", i + 1, iterations);
        writeln!(out, "[{}] {}", sample.timestamp().format("%H:%M:%S"), sample)?;
        writeln!(out, "[{}] {}", sample.timestamp().format("%H:%M:%S"), status)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::metrics::MetricsSample;
    use crate::process::ProcessInfo;
    use chrono::Local;

    struct Counter(f64);

    impl MetricsSource for Counter {
        fn sample(&mut self) -> Result<MetricsSample, SourceError> {
            self.0 += 10.0;
            Ok(MetricsSample::new(self.0, 20.0, 0.0, Local::now()))
        }
    }

    struct Runners;

    impl ProcessSource for Runners {
        fn processes(&self) -> Result<Vec<ProcessInfo>, SourceError> {
            Ok(vec![ProcessInfo {
                pid: 9,
                name: "llama-server".to_string(),
                cmdline: vec!["llama-server".to_string()],
            }])
        }
    }

    #[test]
    fn test_sample_lines_skips_priming_sample() {
        let mut out = Vec::new();
        let mut waits = 0;
        sample_lines(&mut Counter(0.0), &Runners, &Config::default(), 2, &mut out, |_| waits += 1).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(waits, 2);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("CPU: 20.0% | RAM: 20.0% | SWAP: 0.0%"));
        assert!(lines[1].ends_with("Active Process: llama-server (PID: 9)"));
        assert!(lines[2].ends_with("CPU: 30.0% | RAM: 20.0% | SWAP: 0.0%"));
    }
}
