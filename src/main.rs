// neural-panel - version 0.1.0
// Live terminal panel for host resources and local inference runtimes
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use neural_panel::cli::{Args, Commands};
use neural_panel::commands::{command_check, command_config, command_once, show_config};
use neural_panel::config::{resolve_config, validate_effective_config, Config};
use neural_panel::logging::{resolve_log_level, setup_logging, LogTarget};
use neural_panel::panel::{forward_signals, watch_input, Panel};
use neural_panel::render::{TerminalGuard, TerminalSurface};
use neural_panel::{ProcMetrics, ProcTable};

/// How often the input loop wakes up to notice a shutdown raised elsewhere.
const INPUT_POLL: Duration = Duration::from_millis(100);

const EXIT_STARTUP_FAILURE: u8 = 1;
const EXIT_RENDER_FAILURE: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::from(EXIT_STARTUP_FAILURE)
        }
    }
}

/// -------------------------------------------------------------------
/// MAIN APPLICATION ENTRY POINT
/// -------------------------------------------------------------------
fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                return Ok(ExitCode::from(EXIT_STARTUP_FAILURE));
            }
            println!("✅ Configuration is valid");
            return Ok(ExitCode::SUCCESS);
        }

        show_config(&config, args.config_format)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = resolve_config(&args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        return Ok(ExitCode::from(EXIT_STARTUP_FAILURE));
    }
    let log_level = resolve_log_level(config.log_level.as_deref());

    // Handle subcommands
    if let Some(command) = &args.command {
        let target = config.log_target().map(LogTarget::File).unwrap_or(LogTarget::Stderr);
        setup_logging(log_level, target)?;

        return match command {
            Commands::Check => {
                let ok = command_check(&config)?;
                Ok(if ok {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(EXIT_STARTUP_FAILURE)
                })
            }
            Commands::Config {
                output,
                format,
                commented,
            } => command_config(output.clone(), *format, *commented).map(|_| ExitCode::SUCCESS),
            Commands::Once { iterations } => command_once(*iterations, &config).map(|_| ExitCode::SUCCESS),
        };
    }

    // The terminal belongs to the panel: log to a file or nowhere.
    let target = config.log_target().map(LogTarget::File).unwrap_or(LogTarget::Discard);
    setup_logging(log_level, target)?;

    run_dashboard(&config)
}

/// -------------------------------------------------------------------
/// DASHBOARD
/// -------------------------------------------------------------------

/// Runs the live panel until quit.
///
/// The input loop runs on the calling thread; poll tasks, the renderer and
/// signal handling run on a tokio runtime that is shut down with the grace
/// period, so a source call stuck on a blocking thread is left behind.
fn run_dashboard(config: &Config) -> anyhow::Result<ExitCode> {
    info!("Starting neural-panel");

    let root = config.proc_root();
    let mut panel = Panel::new(config, ProcMetrics::new(&root), ProcTable::new(&root));

    // Sources are checked once, before anything is scheduled
    if let Err(e) = panel.preflight() {
        error!("Startup check failed: {}", e);
        eprintln!("❌ Required data source unavailable: {}", e);
        return Ok(ExitCode::from(EXIT_STARTUP_FAILURE));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("neural-panel")
        .build()?;

    let shutdown = panel.shutdown();
    let guard = match TerminalGuard::enter() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ {}", e);
            return Ok(ExitCode::from(EXIT_RENDER_FAILURE));
        }
    };

    runtime.spawn(forward_signals(shutdown.clone()));
    let panel_task = runtime.spawn(async move {
        let mut surface = TerminalSurface::stdout();
        panel.run(&mut surface).await
    });

    let input = watch_input(&shutdown, INPUT_POLL);
    shutdown.trigger();

    let rendered = runtime.block_on(panel_task);
    drop(guard);
    runtime.shutdown_timeout(config.shutdown_grace());

    let code = match (rendered, input) {
        (Ok(Ok(())), Ok(())) => {
            info!("neural-panel stopped gracefully");
            ExitCode::SUCCESS
        }
        (Ok(Err(e)), _) => {
            error!("{}", e);
            eprintln!("❌ {}", e);
            ExitCode::from(EXIT_RENDER_FAILURE)
        }
        (Err(e), _) => {
            error!("Panel task failed: {}", e);
            eprintln!("❌ Panel task failed: {}", e);
            ExitCode::from(EXIT_RENDER_FAILURE)
        }
        (Ok(Ok(())), Err(e)) => {
            warn!("Terminal input failed: {}", e);
            eprintln!("❌ Terminal input failed: {}", e);
            ExitCode::from(EXIT_RENDER_FAILURE)
        }
    };

    Ok(code)
}
