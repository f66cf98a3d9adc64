//! Wiring of sources, scheduler, model and renderer into the dashboard.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{RenderError, SourceError};
use crate::metrics::MetricsSource;
use crate::model::{DisplayFragment, DisplayModel};
use crate::process::{ProcessSource, WatchList};
use crate::render::{Renderer, Slot, Surface};
use crate::scheduler::Scheduler;
use crate::shutdown::Shutdown;
use crate::task::{Poll, PollTask};

/// Fragment holding the CPU/RAM/swap line.
pub const RESOURCES: &str = "resources";
/// Fragment holding the inference process line.
pub const MODEL_STATUS: &str = "model_status";

/// The two panel lines, top to bottom.
pub fn default_slots() -> Vec<Slot> {
    vec![
        Slot::new(RESOURCES, "CPU: --% | RAM: --% | SWAP: --%"),
        Slot::new(MODEL_STATUS, "Status: scanning..."),
    ]
}

/// Polls `source` for the resources line.
pub fn resources_task<M: MetricsSource>(mut source: M, interval: Duration, model: DisplayModel) -> PollTask<impl Poll> {
    PollTask::new(
        RESOURCES,
        interval,
        move || source.sample().map(|sample| sample.to_string()),
        model,
    )
}

/// Scans `source` for the model status line.
pub fn model_status_task<P: ProcessSource>(
    source: P,
    watch_list: WatchList,
    interval: Duration,
    model: DisplayModel,
) -> PollTask<impl Poll> {
    PollTask::new(
        MODEL_STATUS,
        interval,
        move || source.scan(&watch_list).map(|status| status.to_string()),
        model,
    )
}

/// The dashboard: two sources, their poll tasks and a renderer.
pub struct Panel<M, P> {
    metrics: M,
    processes: P,
    watch_list: WatchList,
    metrics_interval: Duration,
    process_interval: Duration,
    redraw_interval: Duration,
    grace: Duration,
    model: DisplayModel,
    shutdown: Shutdown,
}

impl<M: MetricsSource, P: ProcessSource> Panel<M, P> {
    pub fn new(config: &Config, metrics: M, processes: P) -> Self {
        Self {
            metrics,
            processes,
            watch_list: config.watch_list(),
            metrics_interval: config.metrics_interval(),
            process_interval: config.process_interval(),
            redraw_interval: config.redraw_interval(),
            grace: config.shutdown_grace(),
            model: DisplayModel::new(),
            shutdown: Shutdown::new(),
        }
    }

    pub fn model(&self) -> DisplayModel {
        self.model.clone()
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Takes one reading from each source before anything is scheduled.
    ///
    /// Fails if either source cannot produce a reading. The readings seed the
    /// model so the first frame is not empty.
    pub fn preflight(&mut self) -> Result<(), SourceError> {
        let sample = self.metrics.sample()?;
        let status = self.processes.scan(&self.watch_list)?;
        info!("Startup check passed: {} / {}", sample, status);

        self.model
            .update(RESOURCES, DisplayFragment::at(sample.to_string(), sample.timestamp()));
        self.model.update(MODEL_STATUS, DisplayFragment::new(status.to_string()));
        Ok(())
    }

    /// Runs the poll tasks and the render loop until shutdown.
    ///
    /// The scheduler is stopped before returning, also after a render failure.
    pub async fn run(self, surface: &mut impl Surface) -> Result<(), RenderError> {
        let Self {
            metrics,
            processes,
            watch_list,
            metrics_interval,
            process_interval,
            redraw_interval,
            grace,
            model,
            shutdown,
        } = self;

        let mut scheduler = Scheduler::with_shutdown(shutdown.clone(), grace);
        scheduler.register(resources_task(metrics, metrics_interval, model.clone()));
        scheduler.register(model_status_task(processes, watch_list, process_interval, model.clone()));
        scheduler.start();

        let mut renderer = Renderer::new(model, default_slots(), redraw_interval, shutdown);
        let result = renderer.run(surface).await;

        scheduler.stop().await;
        result
    }
}

/// Whether `key` is one of the quit bindings (q, Esc, Ctrl-C).
pub fn is_quit(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Reads terminal input until a quit key is pressed or shutdown is raised.
///
/// Blocks the calling thread; `poll` bounds how long a raised shutdown can go
/// unnoticed.
pub fn watch_input(shutdown: &Shutdown, poll: Duration) -> io::Result<()> {
    while !shutdown.is_triggered() {
        if !event::poll(poll)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if is_quit(&key) {
                debug!("Quit key pressed: {:?}", key.code);
                shutdown.trigger();
            }
        }
    }
    Ok(())
}

/// Raises shutdown on SIGINT or SIGTERM.
pub async fn forward_signals(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let mut listener = shutdown.subscribe();
    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
        _ = listener.triggered() => return,
    }
    shutdown.trigger();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSample;
    use crate::process::{ProcessInfo, ProcessStatus};
    use crate::render::Frame;
    use chrono::Local;
    use std::sync::{Arc, Mutex};

    struct FixedMetrics(f64);

    impl MetricsSource for FixedMetrics {
        fn sample(&mut self) -> Result<MetricsSample, SourceError> {
            Ok(MetricsSample::new(self.0, 50.0, 0.0, Local::now()))
        }
    }

    struct BrokenMetrics;

    impl MetricsSource for BrokenMetrics {
        fn sample(&mut self) -> Result<MetricsSample, SourceError> {
            Err(SourceError::Unavailable("/proc/stat: permission denied".into()))
        }
    }

    struct Table(Vec<ProcessInfo>);

    impl ProcessSource for Table {
        fn processes(&self) -> Result<Vec<ProcessInfo>, SourceError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Clone, Default)]
    struct SharedSurface(Arc<Mutex<Vec<Frame>>>);

    impl Surface for SharedSurface {
        fn paint(&mut self, frame: &Frame) -> Result<(), RenderError> {
            self.0.lock().unwrap().push(frame.clone());
            Ok(())
        }
    }

    fn ollama() -> Table {
        Table(vec![ProcessInfo {
            pid: 4242,
            name: "ollama-runner".to_string(),
            cmdline: vec!["ollama-runner".to_string(), "serve".to_string()],
        }])
    }

    #[test]
    fn test_preflight_seeds_model() {
        let mut panel = Panel::new(&Config::default(), FixedMetrics(10.0), ollama());
        panel.preflight().unwrap();

        let snapshot = panel.model().snapshot();
        assert_eq!(snapshot.version, 2);
        assert_eq!(
            snapshot.get(RESOURCES).unwrap().text,
            "CPU: 10.0% | RAM: 50.0% | SWAP: 0.0%"
        );
        let expected = ProcessStatus::Active {
            process_name: "ollama-runner".to_string(),
            pid: 4242,
        };
        assert_eq!(snapshot.get(MODEL_STATUS).unwrap().text, expected.to_string());
    }

    #[test]
    fn test_preflight_fails_without_metrics() {
        let mut panel = Panel::new(&Config::default(), BrokenMetrics, ollama());
        assert!(panel.preflight().is_err());
        assert_eq!(panel.model().version(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_quit() {
        let panel = Panel::new(&Config::default(), FixedMetrics(33.0), Table(Vec::new()));
        let model = panel.model();
        let shutdown = panel.shutdown();
        let surface = SharedSurface::default();
        let frames = surface.0.clone();

        let handle = tokio::spawn(async move {
            let mut surface = surface;
            panel.run(&mut surface).await
        });

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let snapshot = model.snapshot();
        assert!(snapshot.get(RESOURCES).unwrap().text.starts_with("CPU: 33.0%"));
        assert_eq!(
            snapshot.get(MODEL_STATUS).unwrap().text,
            ProcessStatus::Idle.to_string()
        );

        shutdown.trigger();
        assert!(handle.await.unwrap().is_ok());

        let frames = frames.lock().unwrap();
        assert!(!frames.is_empty());
        let last = frames.last().unwrap();
        assert!(last.lines.iter().any(|l| l.text.starts_with("CPU: 33.0%")));

        let version = model.version();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(model.version(), version);
    }

    #[test]
    fn test_quit_bindings() {
        let key = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_quit(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit(&key(KeyCode::Char('x'), KeyModifiers::NONE)));

        let mut release = key(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(!is_quit(&release));
    }
}
