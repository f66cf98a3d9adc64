//! neural-panel - live terminal panel for host resources and inference runtimes.
//!
//! Poll tasks sample the host on their own schedules and publish display
//! fragments into a shared, versioned [`DisplayModel`]; the [`Renderer`]
//! repaints whenever the model version moves.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod panel;
pub mod process;
pub mod render;
pub mod scheduler;
pub mod shutdown;
pub mod system;
pub mod task;

pub use error::{RenderError, SourceError};
pub use metrics::{MetricsSample, MetricsSource, ProcMetrics};
pub use model::{DisplayFragment, DisplayModel, Snapshot};
pub use panel::Panel;
pub use process::{ProcTable, ProcessInfo, ProcessSource, ProcessStatus, WatchList};
pub use render::{Frame, Renderer, Surface, TerminalSurface};
pub use scheduler::{Scheduler, StopReport};
pub use shutdown::{Shutdown, ShutdownListener};
pub use task::{Poll, PollTask};
