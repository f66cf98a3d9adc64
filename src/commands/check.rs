//! Check command implementation.
//!
//! Verifies that the metrics and process sources can be read on this host.

use tracing::debug;

use crate::config::{validate_effective_config, Config};
use crate::metrics::{MetricsSource, ProcMetrics};
use crate::process::{ProcTable, ProcessSource};

/// Validates sources and configuration.
///
/// Returns whether every check passed.
pub fn command_check(config: &Config) -> anyhow::Result<bool> {
    println!("🔍 Neural Panel - System Check");
    println!("==============================");

    let root = config.proc_root();
    let mut all_ok = true;

    println!("\n📁 Checking proc filesystem at {}...", root.display());
    if root.is_dir() {
        println!("   ✅ {} accessible", root.display());
    } else {
        println!("   ❌ {} not found", root.display());
        all_ok = false;
    }

    println!("\n💾 Checking metrics source...");
    let mut metrics = ProcMetrics::new(&root);
    match metrics.sample() {
        Ok(sample) => println!("   ✅ {}", sample),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n🧠 Checking process source...");
    let table = ProcTable::new(&root);
    match table.processes() {
        Ok(processes) => {
            debug!("Enumerated {} processes", processes.len());
            println!("   ✅ Can read {} process entries", processes.len());
            let watch_list = config.watch_list();
            println!("   ✅ Watching for: {}", watch_list.names().join(", "));
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(()) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - panel is ready");
    } else {
        println!("   ❌ Some checks failed - please review the output above");
    }
    Ok(all_ok)
}
