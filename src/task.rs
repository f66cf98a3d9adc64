//! Independently scheduled poll tasks.
//!
//! A [`PollTask`] calls its [`Poll`] implementation on a fixed schedule and
//! publishes the result into a [`DisplayModel`] under its own name.

use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::error::SourceError;
use crate::model::{DisplayFragment, DisplayModel};
use crate::shutdown::ShutdownListener;

/// Text shown for a fragment whose source has never produced a reading.
pub const UNAVAILABLE_TEXT: &str = "unavailable";

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Produces the text of one display fragment.
///
/// Implementations may block; every call runs on the blocking thread pool.
pub trait Poll: Send + 'static {
    fn poll(&mut self) -> Result<String, SourceError>;
}

impl<F> Poll for F
where
    F: FnMut() -> Result<String, SourceError> + Send + 'static,
{
    fn poll(&mut self) -> Result<String, SourceError> {
        self()
    }
}

/// A named unit that polls a source at a fixed interval.
pub struct PollTask<P> {
    name: String,
    interval: Duration,
    poller: P,
    target: DisplayModel,
}

impl<P: Poll> PollTask<P> {
    pub fn new(name: impl Into<String>, interval: Duration, poller: P, target: DisplayModel) -> Self {
        Self {
            name: name.into(),
            interval: interval.max(MIN_INTERVAL),
            poller,
            target,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Polls until `shutdown` is raised.
    ///
    /// Ticks fall on `start + k * interval`; a poll that overruns skips the
    /// ticks it missed instead of bursting to catch up. The first poll happens
    /// one interval after the call. An in-flight poll is abandoned on shutdown
    /// and its result is never published.
    ///
    /// A poller that panics is not rebuilt: the task publishes a degraded
    /// fragment and stops, and the line stays degraded until restart.
    pub async fn run(self, mut shutdown: ShutdownListener) {
        let Self {
            name,
            interval: period,
            poller,
            target,
        } = self;

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poller = Some(poller);

        debug!("Poll task {} started with {:?} interval", name, period);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {}
            }

            let Some(mut current) = poller.take() else {
                break;
            };
            let job = tokio::task::spawn_blocking(move || {
                let result = current.poll().map(|text| (text, Local::now()));
                (current, result)
            });

            let result = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    debug!("Poll task {} abandoning in-flight poll", name);
                    break;
                }
                joined = job => match joined {
                    Ok((returned, result)) => {
                        poller = Some(returned);
                        result
                    }
                    Err(e) => {
                        error!("Poll task {} crashed: {}", name, e);
                        publish(&target, &name, Err(SourceError::Unavailable(format!("poll crashed: {}", e))));
                        break;
                    }
                }
            };

            publish(&target, &name, result);
        }

        debug!("Poll task {} stopped", name);
    }
}

/// Writes a poll result, stamped with the time the poll returned, into the model.
///
/// Failures keep the last known text and its timestamp and attach the error
/// marker, so the line shows how old the value is.
fn publish(target: &DisplayModel, name: &str, result: Result<(String, DateTime<Local>), SourceError>) {
    let fragment = match result {
        Ok((text, taken_at)) => DisplayFragment::at(text, taken_at),
        Err(e) => {
            warn!("Poll task {} failed: {}", name, e);
            match target.fragment(name) {
                Some(last) => last.into_degraded(e.to_string()),
                None => DisplayFragment::degraded(UNAVAILABLE_TEXT, e.to_string()),
            }
        }
    };
    let version = target.update(name, fragment);
    debug!("Poll task {} published version {}", name, version);
}
