//! Configuration loading, merging and validation.
//!
//! Precedence: CLI (if provided) > config file > built-in defaults.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cli::Args;
use crate::process::WatchList;

// Default configuration constants
pub const DEFAULT_METRICS_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_PROCESS_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_REDRAW_INTERVAL_MS: u64 = 500;
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2000;
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_WATCH_LIST: [&str; 2] = ["ollama", "llama"];

const DEFAULT_LOCATIONS: [&str; 6] = [
    "/etc/neural-panel/config.yaml",
    "/etc/neural-panel/config.yml",
    "/etc/neural-panel/config.json",
    "./neural-panel.yaml",
    "./neural-panel.yml",
    "./neural-panel.json",
];

/// Effective panel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Scheduling
    #[serde(alias = "metrics-interval-ms")]
    pub metrics_interval_ms: Option<u64>,
    #[serde(alias = "process-interval-ms")]
    pub process_interval_ms: Option<u64>,
    #[serde(alias = "redraw-interval-ms")]
    pub redraw_interval_ms: Option<u64>,
    #[serde(alias = "shutdown-grace-ms")]
    pub shutdown_grace_ms: Option<u64>,

    // Process detection
    #[serde(alias = "watch-list")]
    pub watch_list: Option<Vec<String>>,
    #[serde(alias = "require-arguments")]
    pub require_arguments: Option<bool>,
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,

    // Logging
    pub log_level: Option<String>,
    pub enable_file_logging: Option<bool>,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics_interval_ms: Some(DEFAULT_METRICS_INTERVAL_MS),
            process_interval_ms: Some(DEFAULT_PROCESS_INTERVAL_MS),
            redraw_interval_ms: Some(DEFAULT_REDRAW_INTERVAL_MS),
            shutdown_grace_ms: Some(DEFAULT_SHUTDOWN_GRACE_MS),
            watch_list: Some(DEFAULT_WATCH_LIST.iter().map(|s| s.to_string()).collect()),
            require_arguments: Some(false),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            log_level: Some("info".into()),
            enable_file_logging: Some(false),
            log_file: None,
        }
    }
}

impl Config {
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms.unwrap_or(DEFAULT_METRICS_INTERVAL_MS))
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms.unwrap_or(DEFAULT_PROCESS_INTERVAL_MS))
    }

    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.redraw_interval_ms.unwrap_or(DEFAULT_REDRAW_INTERVAL_MS))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms.unwrap_or(DEFAULT_SHUTDOWN_GRACE_MS))
    }

    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    pub fn watch_list(&self) -> WatchList {
        let names = match &self.watch_list {
            Some(names) => names.clone(),
            None => DEFAULT_WATCH_LIST.iter().map(|s| s.to_string()).collect(),
        };
        WatchList::new(names).require_arguments(self.require_arguments.unwrap_or(false))
    }

    /// Log file to write to, if file logging is switched on.
    pub fn log_target(&self) -> Option<&Path> {
        if self.enable_file_logging.unwrap_or(false) {
            self.log_file.as_deref()
        } else {
            None
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    for (key, value) in [
        ("metrics_interval_ms", cfg.metrics_interval_ms),
        ("process_interval_ms", cfg.process_interval_ms),
        ("redraw_interval_ms", cfg.redraw_interval_ms),
    ] {
        if value == Some(0) {
            bail!("{} must be greater than 0", key);
        }
    }

    if let Some(names) = &cfg.watch_list {
        if names.is_empty() {
            bail!("watch_list must contain at least one process name");
        }
        if names.iter().any(|n| n.trim().is_empty()) {
            bail!("watch_list entries must not be blank");
        }
    }

    if cfg.enable_file_logging.unwrap_or(false) && cfg.log_file.is_none() {
        bail!("enable_file_logging is set, but no log_file defined");
    }

    if let Some(level) = cfg.log_level.as_deref() {
        match level {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => {}
            other => bail!(
                "Invalid log_level '{}', expected one of off/error/warn/info/debug/trace",
                other
            ),
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(ms) = args.metrics_interval_ms {
        config.metrics_interval_ms = Some(ms);
    }
    if let Some(ms) = args.process_interval_ms {
        config.process_interval_ms = Some(ms);
    }
    if let Some(ms) = args.redraw_interval_ms {
        config.redraw_interval_ms = Some(ms);
    }
    if let Some(ms) = args.shutdown_grace_ms {
        config.shutdown_grace_ms = Some(ms);
    }

    // Parse comma-separated watch list
    if let Some(watch) = &args.watch {
        config.watch_list = Some(
            watch
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        );
    }
    if args.require_arguments {
        config.require_arguments = Some(true);
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }

    if let Some(level) = &args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }
    if let Some(path) = &args.log_file {
        config.log_file = Some(path.clone());
        config.enable_file_logging = Some(true);
    }

    Ok(config)
}

/// Loads a config file, YAML unless the extension says JSON or TOML.
///
/// Without an explicit path the default locations are tried in order; when
/// none exists the built-in defaults are returned. Keys missing from the file
/// fall back to their defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("Config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_LOCATIONS.iter().map(Path::new).find(|p| p.exists()) {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON config {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML config {}", path.display()))?,
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML config {}", path.display()))?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_defaults(loaded))
}

fn merge_defaults(loaded: Config) -> Config {
    let defaults = Config::default();
    Config {
        metrics_interval_ms: loaded.metrics_interval_ms.or(defaults.metrics_interval_ms),
        process_interval_ms: loaded.process_interval_ms.or(defaults.process_interval_ms),
        redraw_interval_ms: loaded.redraw_interval_ms.or(defaults.redraw_interval_ms),
        shutdown_grace_ms: loaded.shutdown_grace_ms.or(defaults.shutdown_grace_ms),
        watch_list: loaded.watch_list.or(defaults.watch_list),
        require_arguments: loaded.require_arguments.or(defaults.require_arguments),
        proc_root: loaded.proc_root.or(defaults.proc_root),
        log_level: loaded.log_level.or(defaults.log_level),
        enable_file_logging: loaded.enable_file_logging.or(defaults.enable_file_logging),
        log_file: loaded.log_file.or(defaults.log_file),
    }
}
