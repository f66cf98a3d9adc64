//! CLI command implementations for neural-panel.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Source validation
//! - `config`: Configuration file generation
//! - `once`: One-shot sampling without the terminal UI

pub mod check;
pub mod config;
pub mod once;

// Re-export command functions
pub use check::command_check;
pub use config::{command_config, render_config, show_config};
pub use once::command_once;
