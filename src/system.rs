//! System-wide counters read from the /proc filesystem.
//!
//! This module provides parsers for `/proc/stat` and `/proc/meminfo`. The
//! readers take the proc root as a parameter so tests can point them at a
//! fixture tree.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::SourceError;

/// Aggregate CPU time counters, in jiffies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

/// Memory counters from /proc/meminfo, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_free_bytes: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq + self.steal
    }

    /// Calculate non-active time (idle + iowait).
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    /// Busy share of the time elapsed between `previous` and `self`, in percent.
    ///
    /// Returns 0 when no time has elapsed or the counters went backwards.
    pub fn busy_percent_since(&self, previous: &CpuStat) -> f64 {
        let delta_total = self.total().saturating_sub(previous.total());
        let delta_idle = self.idle_total().saturating_sub(previous.idle_total());

        if delta_total == 0 {
            return 0.0;
        }
        delta_total.saturating_sub(delta_idle) as f64 / delta_total as f64 * 100.0
    }
}

impl MemoryInfo {
    pub fn ram_percent(&self) -> f64 {
        used_percent(self.total_bytes, self.available_bytes)
    }

    /// Swap in use; zero when no swap device is configured.
    pub fn swap_percent(&self) -> f64 {
        used_percent(self.swap_total_bytes, self.swap_free_bytes)
    }
}

fn used_percent(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    total.saturating_sub(free) as f64 / total as f64 * 100.0
}

/// Reads the aggregate `cpu` line from `<root>/stat`.
pub fn read_cpu_stat(root: &Path) -> Result<CpuStat, SourceError> {
    let path = root.join("stat");
    let content = fs::read_to_string(&path).map_err(|e| unreadable(&path, e))?;
    parse_cpu_stat(&content)
}

/// Reads RAM and swap counters from `<root>/meminfo`.
pub fn read_memory_info(root: &Path) -> Result<MemoryInfo, SourceError> {
    let path = root.join("meminfo");
    let content = fs::read_to_string(&path).map_err(|e| unreadable(&path, e))?;
    parse_memory_info(&content)
}

/// Any failure to read a system-wide file, refused access included, leaves
/// the metrics source without a reading.
fn unreadable(path: &Path, err: io::Error) -> SourceError {
    SourceError::unavailable(path.display(), err)
}

/// Parses the aggregate line of /proc/stat.
///
/// Format: "cpu  4705 356 584 3699176 23060 0 277 0 0 0"
pub fn parse_cpu_stat(content: &str) -> Result<CpuStat, SourceError> {
    let line = content
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| SourceError::Unavailable("no aggregate cpu line in /proc/stat".into()))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SourceError::unavailable("invalid /proc/stat cpu field", e))?;

    if fields.len() < 7 {
        return Err(SourceError::Unavailable(format!(
            "invalid /proc/stat format: expected at least 7 cpu fields, got {}",
            fields.len()
        )));
    }

    Ok(CpuStat {
        user: fields[0],
        nice: fields[1],
        system: fields[2],
        idle: fields[3],
        iowait: fields[4],
        irq: fields[5],
        softirq: fields[6],
        // steal appeared in 2.6.11
        steal: fields.get(7).copied().unwrap_or(0),
    })
}

/// Parses MemTotal, MemAvailable, SwapTotal and SwapFree from /proc/meminfo.
pub fn parse_memory_info(content: &str) -> Result<MemoryInfo, SourceError> {
    let mut total = None;
    let mut available = None;
    let mut swap_total = None;
    let mut swap_free = None;

    for line in content.lines() {
        // Format: "MemTotal:       16384000 kB"
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key {
            "MemTotal" => &mut total,
            "MemAvailable" => &mut available,
            "SwapTotal" => &mut swap_total,
            "SwapFree" => &mut swap_free,
            _ => continue,
        };
        *slot = parse_kb_value(value).map(|kb| kb * 1024);

        if total.is_some() && available.is_some() && swap_total.is_some() && swap_free.is_some() {
            break;
        }
    }

    match (total, available) {
        (Some(total_bytes), Some(available_bytes)) if total_bytes > 0 => Ok(MemoryInfo {
            total_bytes,
            available_bytes,
            swap_total_bytes: swap_total.unwrap_or(0),
            swap_free_bytes: swap_free.unwrap_or(0),
        }),
        _ => Err(SourceError::Unavailable(
            "failed to parse MemTotal or MemAvailable from /proc/meminfo".to_string(),
        )),
    }
}

fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "cpu  4705 356 584 3699176 23060 0 277 0 0 0\n\
                        cpu0 1393 280 268 924394 5847 0 68 0 0 0\n\
                        intr 1462898\nctxt 2245617\n";

    const MEMINFO: &str = "MemTotal:       16000000 kB\n\
                           MemFree:         2000000 kB\n\
                           MemAvailable:    4000000 kB\n\
                           SwapTotal:       2000000 kB\n\
                           SwapFree:        1500000 kB\n";

    #[test]
    fn test_parse_cpu_stat() {
        let result = parse_cpu_stat(STAT);
        assert!(result.is_ok());
        let stat = result.unwrap();
        assert_eq!(stat.user, 4705);
        assert_eq!(stat.idle, 3699176);
        assert_eq!(stat.steal, 0);
        assert_eq!(stat.total(), 4705 + 356 + 584 + 3699176 + 23060 + 277);
    }

    #[test]
    fn test_parse_cpu_stat_invalid() {
        assert!(parse_cpu_stat("cpu0 1 2 3 4 5 6 7\n").is_err());
        assert!(parse_cpu_stat("cpu 1 2 3\n").is_err());
        assert!(parse_cpu_stat("cpu a b c d e f g\n").is_err());
    }

    #[test]
    fn test_busy_percent_since() {
        let previous = CpuStat { user: 100, idle: 300, ..Default::default() };
        let current = CpuStat { user: 150, idle: 350, ..Default::default() };
        assert!((current.busy_percent_since(&previous) - 50.0).abs() < 0.001);

        // no elapsed time and wrapped counters both read as idle
        assert_eq!(current.busy_percent_since(&current), 0.0);
        assert_eq!(previous.busy_percent_since(&current), 0.0);
    }

    #[test]
    fn test_parse_memory_info() {
        let result = parse_memory_info(MEMINFO);
        assert!(result.is_ok());
        let mem = result.unwrap();
        assert_eq!(mem.total_bytes, 16000000 * 1024);
        assert!((mem.ram_percent() - 75.0).abs() < 0.001);
        assert!((mem.swap_percent() - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_memory_info_without_swap() {
        let meminfo = "MemTotal: 1000 kB\nMemAvailable: 1000 kB\nSwapTotal: 0 kB\nSwapFree: 0 kB\n";
        let mem = parse_memory_info(meminfo).unwrap();
        assert_eq!(mem.ram_percent(), 0.0);
        assert_eq!(mem.swap_percent(), 0.0);
    }

    #[test]
    fn test_unreadable_system_files_are_unavailable() {
        let refused = io::Error::from(io::ErrorKind::PermissionDenied);
        let err = unreadable(Path::new("/proc/meminfo"), refused);
        assert!(matches!(err, SourceError::Unavailable(ref reason) if reason.starts_with("/proc/meminfo")));

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("stat")).unwrap();
        assert!(matches!(read_cpu_stat(dir.path()), Err(SourceError::Unavailable(_))));
        assert!(matches!(read_memory_info(dir.path()), Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn test_parse_memory_info_missing_fields() {
        let meminfo = "MemFree:        8192000 kB\nSwapFree:        2048000 kB\n";
        assert!(parse_memory_info(meminfo).is_err());
    }
}
