//! Process table scanning for inference runtimes.
//!
//! A [`ProcessSource`] enumerates processes and reports whether any of them
//! matches the configured [`WatchList`]. Matching compares the process name
//! only, never the full command line, so processes started without
//! arguments are still found.

use rayon::prelude::*;
use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SourceError;

/// One entry of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cmdline: Vec<String>,
}

/// Whether a watched process is currently running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    Active { process_name: String, pid: u32 },
    Idle,
}

/// Case-sensitive name substrings that identify an inference workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchList {
    names: Vec<String>,
    require_arguments: bool,
}

/// A provider of process table scans.
pub trait ProcessSource: Send + 'static {
    /// Lists every process that could be read.
    ///
    /// Processes that vanish or refuse access mid-enumeration are left out.
    fn processes(&self) -> Result<Vec<ProcessInfo>, SourceError>;

    /// Reports the watched process with the lowest pid, or `Idle`.
    fn scan(&self, watch_list: &WatchList) -> Result<ProcessStatus, SourceError> {
        let processes = self.processes()?;
        Ok(select_active(&processes, watch_list))
    }
}

/// Process table read from a proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcTable {
    root: PathBuf,
}

/// Process entry representing a directory in /proc filesystem
#[derive(Debug, Clone)]
struct ProcEntry {
    pid: u32,
    proc_path: PathBuf,
}

// === impl ProcessStatus ===

impl Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active { process_name, pid } => {
                write!(f, "Active Process: {} (PID: {})", process_name, pid)
            }
            Self::Idle => f.write_str("Status: Idle (No inference detected)"),
        }
    }
}

// === impl WatchList ===

impl WatchList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            require_arguments: false,
        }
    }

    /// Only count processes started with at least one argument.
    pub fn require_arguments(mut self, require: bool) -> Self {
        self.require_arguments = require;
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn matches(&self, process: &ProcessInfo) -> bool {
        if self.require_arguments && process.cmdline.len() <= 1 {
            return false;
        }
        self.names.iter().any(|watched| process.name.contains(watched.as_str()))
    }
}

/// Picks the matching process with the lowest pid.
///
/// Enumeration order is OS-defined, so ties between several running
/// runtimes are broken by pid to keep the result stable across scans.
pub fn select_active(processes: &[ProcessInfo], watch_list: &WatchList) -> ProcessStatus {
    processes
        .iter()
        .filter(|p| watch_list.matches(p))
        .min_by_key(|p| p.pid)
        .map(|p| ProcessStatus::Active {
            process_name: p.name.clone(),
            pid: p.pid,
        })
        .unwrap_or(ProcessStatus::Idle)
}

// === impl ProcTable ===

impl ProcTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ProcessSource for ProcTable {
    fn processes(&self) -> Result<Vec<ProcessInfo>, SourceError> {
        let entries = collect_proc_entries(&self.root)?;
        debug!("Collected {} process entries from {}", entries.len(), self.root.display());

        let processes = entries
            .par_iter()
            .filter_map(|entry| match read_process(entry) {
                Ok(process) => Some(process),
                Err(e) => {
                    debug!("Skipping process {}: {}", entry.pid, e);
                    None
                }
            })
            .collect();

        Ok(processes)
    }
}

/// Scans the proc root for process entries with numeric PIDs
fn collect_proc_entries(root: &Path) -> Result<Vec<ProcEntry>, SourceError> {
    let entries = fs::read_dir(root).map_err(|e| SourceError::unavailable(root.display(), e))?;

    let mut out = Vec::new();
    for entry in entries.flatten() {
        let p = entry.path();
        let name = match p.file_name().and_then(|s| s.to_str()) {
            Some(v) => v,
            None => continue,
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let pid: u32 = match name.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        out.push(ProcEntry { pid, proc_path: p });
    }
    Ok(out)
}

fn read_process(entry: &ProcEntry) -> Result<ProcessInfo, SourceError> {
    let cmdline = read_cmdline(&entry.proc_path)?;
    let name = read_process_name(&entry.proc_path, &cmdline)
        .ok_or_else(|| SourceError::Unavailable(format!("no name for pid {}", entry.pid)))?;

    Ok(ProcessInfo {
        pid: entry.pid,
        name,
        cmdline,
    })
}

/// Reads the NUL-separated argument vector; kernel threads have none.
fn read_cmdline(proc_path: &Path) -> Result<Vec<String>, SourceError> {
    let path = proc_path.join("cmdline");
    let content = fs::read(&path).map_err(|e| SourceError::from_io(path.display(), &e))?;

    Ok(content
        .split(|&b| b == 0u8)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect())
}

/// Longest name the kernel keeps in `comm`.
const COMM_MAX_LEN: usize = 15;

/// Reads process name from comm file or extracts from cmdline
///
/// `comm` is cut at 15 bytes; when it has that length and the basename of
/// argv[0] extends it, the basename is the full executable name.
fn read_process_name(proc_path: &Path, cmdline: &[String]) -> Option<String> {
    let argv0 = cmdline
        .first()
        .and_then(|arg| Path::new(arg).file_name())
        .and_then(|name| name.to_str());

    if let Ok(s) = fs::read_to_string(proc_path.join("comm")) {
        let t = s.trim_end_matches('\n');
        if !t.is_empty() {
            return match argv0 {
                Some(full) if t.len() == COMM_MAX_LEN && full.starts_with(t) => Some(full.to_string()),
                _ => Some(t.to_string()),
            };
        }
    }

    argv0.map(|s| s.to_string())
}
