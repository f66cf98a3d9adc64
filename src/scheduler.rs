//! Runs poll tasks concurrently and shuts them down within a grace period.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::shutdown::Shutdown;
use crate::task::{Poll, PollTask};

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Owns a set of poll tasks, one tokio task each.
///
/// Tasks never wait on each other: a slow source only delays its own task.
pub struct Scheduler {
    shutdown: Shutdown,
    grace: Duration,
    pending: Vec<(String, TaskFuture)>,
    running: Vec<(String, JoinHandle<()>)>,
    started: bool,
}

/// Outcome of [`Scheduler::stop`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Tasks that exited within the grace period.
    pub stopped: Vec<String>,
    /// Tasks that were still running at the deadline and got aborted.
    pub abandoned: Vec<String>,
}

impl Scheduler {
    pub fn new(grace: Duration) -> Self {
        Self::with_shutdown(Shutdown::new(), grace)
    }

    /// Creates a scheduler whose tasks observe an existing shutdown signal.
    pub fn with_shutdown(shutdown: Shutdown, grace: Duration) -> Self {
        Self {
            shutdown,
            grace,
            pending: Vec::new(),
            running: Vec::new(),
            started: false,
        }
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Adds a task; it is spawned right away if the scheduler already started.
    pub fn register<P: Poll>(&mut self, task: PollTask<P>) {
        let name = task.name().to_string();
        debug!("Registering poll task {} ({:?})", name, task.interval());

        let future: TaskFuture = Box::pin(task.run(self.shutdown.subscribe()));
        if self.started {
            self.spawn(name, future);
        } else {
            self.pending.push((name, future));
        }
    }

    /// Spawns every registered task. Must be called within a tokio runtime.
    pub fn start(&mut self) {
        self.started = true;
        let pending = std::mem::take(&mut self.pending);
        info!("Starting {} poll tasks", pending.len());
        for (name, future) in pending {
            self.spawn(name, future);
        }
    }

    /// Raises shutdown and waits for the tasks, at most for the grace period.
    ///
    /// Tasks still running at the deadline are aborted and left behind.
    pub async fn stop(&mut self) -> StopReport {
        self.shutdown.trigger();
        self.pending.clear();

        let deadline = Instant::now() + self.grace;
        let mut report = StopReport::default();

        for (name, mut handle) in self.running.drain(..) {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {
                    debug!("Poll task {} exited", name);
                    report.stopped.push(name);
                }
                Ok(Err(e)) => {
                    error!("Poll task {} ended abnormally: {}", name, e);
                    report.stopped.push(name);
                }
                Err(_) => {
                    warn!("Poll task {} did not stop within {:?}, abandoning it", name, self.grace);
                    handle.abort();
                    report.abandoned.push(name);
                }
            }
        }

        info!(
            "Scheduler stopped: {} tasks exited, {} abandoned",
            report.stopped.len(),
            report.abandoned.len()
        );
        report
    }

    pub fn running(&self) -> usize {
        self.running.iter().filter(|(_, handle)| !handle.is_finished()).count()
    }

    fn spawn(&mut self, name: String, future: TaskFuture) {
        let handle = tokio::spawn(future);
        self.running.push((name, handle));
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
