//! Config command implementation.
//!
//! Writes the default configuration, or prints the effective one.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::Config;

/// Serializes `config` in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> anyhow::Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

/// Generates configuration files
pub fn command_config(output: Option<PathBuf>, format: ConfigFormat, commented: bool) -> anyhow::Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("neural-panel.yaml"));

    let mut content = render_config(&config, format)?;
    if commented && format == ConfigFormat::Yaml {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Neural Panel Configuration
# ==========================
#
# Scheduling
# ----------
# metrics_interval_ms: 1000     # CPU/RAM/swap sampling interval
# process_interval_ms: 2000     # Process table scan interval
# redraw_interval_ms: 500       # Redraw check interval (redraws only on change)
# shutdown_grace_ms: 2000       # Wait this long for poll tasks on quit
#
# Process Detection
# -----------------
# watch_list: [ollama, llama]   # Case-sensitive process name substrings
# require_arguments: false      # Ignore watched processes started without arguments
# proc_root: /proc              # Root of the proc filesystem
#
# Logging
# -------
# log_level: "info"             # off, error, warn, info, debug, trace
# enable_file_logging: false    # The terminal belongs to the panel; log to a file
# log_file: null                # Log file path
"#;

    format!("{comments}\n{yaml}")
}
