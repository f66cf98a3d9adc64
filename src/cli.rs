//! CLI arguments and subcommands for neural-panel.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "neural-panel",
    about = "Live terminal panel for host resources and local inference runtimes",
    long_about = "Live terminal panel for host resources and local inference runtimes.\n\n\
                  Samples CPU, RAM and swap utilization and watches the process table for \
                  inference runtimes such as ollama or llama.cpp, refreshing a compact \
                  terminal view. Press q to quit.",
    author = "Michael Moll <proc-mem@herakles.io> - Herakles IO",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Write logs to this file (the terminal is reserved for the panel)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Resource sampling interval in milliseconds
    #[arg(long)]
    pub metrics_interval_ms: Option<u64>,

    /// Process scan interval in milliseconds
    #[arg(long)]
    pub process_interval_ms: Option<u64>,

    /// Redraw interval in milliseconds
    #[arg(long)]
    pub redraw_interval_ms: Option<u64>,

    /// How long shutdown waits for poll tasks before abandoning them
    #[arg(long)]
    pub shutdown_grace_ms: Option<u64>,

    /// Process name substrings to watch for (comma-separated)
    #[arg(short = 'w', long)]
    pub watch: Option<String>,

    /// Only report watched processes started with arguments
    #[arg(long)]
    pub require_arguments: bool,

    /// Root of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate that the metrics and process sources are readable
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Sample every source and print the panel lines without the terminal UI
    Once {
        /// Number of samples to take, one metrics interval apart
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,
    },
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parses the config file spelling of a level.
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }

    /// The tracing level, or `None` when logging is off.
    pub fn level(&self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}
