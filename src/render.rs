//! Frame composition and painting.
//!
//! The [`Renderer`] reads the [`DisplayModel`] on its own timer and repaints
//! a [`Surface`] only when the model version moved since the last frame.

use chrono::{DateTime, Local};
use crossterm::{
    cursor,
    style::{self, Stylize},
    terminal, ExecutableCommand, QueueableCommand,
};
use std::io::{self, Write};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::RenderError;
use crate::model::{DisplayModel, Snapshot};
use crate::shutdown::{Shutdown, ShutdownListener};

pub const TITLE: &str = "Neural Control Panel";
pub const FOOTER: &str = "q: quit";

/// A display slot: which fragment goes on which line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub placeholder: String,
}

/// How a frame line should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Title,
    Fresh,
    Degraded,
    Waiting,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub tone: Tone,
}

/// A fully composed screen, independent of any terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub version: u64,
    pub lines: Vec<Line>,
}

/// Something a [`Frame`] can be painted on.
pub trait Surface: Send {
    fn paint(&mut self, frame: &Frame) -> Result<(), RenderError>;
}

/// Paints frames on a terminal with crossterm.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
}

/// Puts the terminal into raw mode on the alternate screen until dropped.
pub struct TerminalGuard {
    _private: (),
}

/// Redraws the model on a fixed interval.
pub struct Renderer {
    model: DisplayModel,
    slots: Vec<Slot>,
    interval: Duration,
    shutdown: Shutdown,
    last_drawn: Option<u64>,
}

// === impl Slot ===

impl Slot {
    pub fn new(name: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            placeholder: placeholder.into(),
        }
    }
}

// === impl Frame ===

impl Frame {
    /// Lays out the title with the clock at `now`, one line per slot, and the footer.
    pub fn compose(slots: &[Slot], snapshot: &Snapshot, now: DateTime<Local>) -> Self {
        let mut lines = Vec::with_capacity(slots.len() + 2);
        lines.push(Line {
            text: format!("{}  {}", TITLE, now.format("%H:%M:%S")),
            tone: Tone::Title,
        });

        for slot in slots {
            let line = match snapshot.get(&slot.name) {
                None => Line {
                    text: slot.placeholder.clone(),
                    tone: Tone::Waiting,
                },
                Some(fragment) => {
                    let at = fragment.updated_at.format("%H:%M:%S");
                    match &fragment.error {
                        None => Line {
                            text: format!("{}  [{}]", fragment.text, at),
                            tone: Tone::Fresh,
                        },
                        Some(err) => Line {
                            text: format!("{}  [stale {}: {}]", fragment.text, at, err),
                            tone: Tone::Degraded,
                        },
                    }
                }
            };
            lines.push(line);
        }

        lines.push(Line {
            text: FOOTER.to_string(),
            tone: Tone::Hint,
        });

        Self {
            version: snapshot.version,
            lines,
        }
    }
}

// === impl TerminalSurface ===

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Surface for TerminalSurface<W> {
    fn paint(&mut self, frame: &Frame) -> Result<(), RenderError> {
        let out = &mut self.out;
        out.queue(terminal::Clear(terminal::ClearType::All))?;

        for (row, line) in frame.lines.iter().enumerate() {
            // title and footer get a blank line of padding
            let y = match line.tone {
                Tone::Title => 1,
                Tone::Hint => row as u16 + 2,
                _ => row as u16 + 1,
            };
            let styled = match line.tone {
                Tone::Title => line.text.clone().bold().magenta(),
                Tone::Fresh => line.text.clone().green(),
                Tone::Degraded => line.text.clone().red(),
                Tone::Waiting => line.text.clone().grey(),
                Tone::Hint => line.text.clone().blue(),
            };
            out.queue(cursor::MoveTo(2, y))?
                .queue(style::PrintStyledContent(styled))?;
        }

        out.queue(cursor::Hide)?;
        out.flush()?;
        Ok(())
    }
}

// === impl TerminalGuard ===

impl TerminalGuard {
    pub fn enter() -> Result<Self, RenderError> {
        terminal::enable_raw_mode()?;
        let guard = Self { _private: () };
        io::stdout()
            .execute(terminal::EnterAlternateScreen)?
            .execute(cursor::Hide)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = stdout.execute(cursor::Show);
        let _ = stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

// === impl Renderer ===

impl Renderer {
    pub fn new(model: DisplayModel, slots: Vec<Slot>, interval: Duration, shutdown: Shutdown) -> Self {
        Self {
            model,
            slots,
            interval: interval.max(Duration::from_millis(1)),
            shutdown,
            last_drawn: None,
        }
    }

    /// Raises shutdown; the render loop exits on its next wake-up.
    pub fn quit(&self) {
        info!("Quit requested");
        self.shutdown.trigger();
    }

    /// Paints the current snapshot if its version was not drawn yet.
    ///
    /// Returns whether a frame was painted.
    pub fn draw(&mut self, surface: &mut impl Surface) -> Result<bool, RenderError> {
        let snapshot = self.model.snapshot();
        if self.last_drawn == Some(snapshot.version) {
            return Ok(false);
        }

        let frame = Frame::compose(&self.slots, &snapshot, Local::now());
        surface.paint(&frame)?;
        self.last_drawn = Some(snapshot.version);
        debug!("Painted frame for version {}", snapshot.version);
        Ok(true)
    }

    /// Redraws until shutdown. A paint failure ends the loop with an error.
    pub async fn run(&mut self, surface: &mut impl Surface) -> Result<(), RenderError> {
        let mut listener: ShutdownListener = self.shutdown.subscribe();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = listener.triggered() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.draw(surface) {
                error!("Render failed: {}", e);
                self.shutdown.trigger();
                return Err(e);
            }
        }

        debug!("Render loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DisplayFragment;
    use chrono::TimeZone;

    #[derive(Default)]
    struct RecordingSurface {
        frames: Vec<Frame>,
    }

    impl Surface for RecordingSurface {
        fn paint(&mut self, frame: &Frame) -> Result<(), RenderError> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    struct BrokenSurface;

    impl Surface for BrokenSurface {
        fn paint(&mut self, _frame: &Frame) -> Result<(), RenderError> {
            Err(RenderError(io::Error::new(io::ErrorKind::BrokenPipe, "tty gone")))
        }
    }

    fn slots() -> Vec<Slot> {
        vec![
            Slot::new("resources", "CPU: --"),
            Slot::new("model_status", "Status: scanning..."),
        ]
    }

    #[test]
    fn test_compose_lays_out_slots_in_order() {
        let model = DisplayModel::new();
        model.update("model_status", DisplayFragment::new("Status: Idle"));

        let frame = Frame::compose(&slots(), &model.snapshot(), Local::now());
        let tones: Vec<_> = frame.lines.iter().map(|l| l.tone).collect();
        assert_eq!(tones, vec![Tone::Title, Tone::Waiting, Tone::Fresh, Tone::Hint]);
        assert_eq!(frame.lines[1].text, "CPU: --");
        assert!(frame.lines[2].text.starts_with("Status: Idle  ["));
        assert_eq!(frame.version, 1);
    }

    #[test]
    fn test_compose_title_carries_clock() {
        let now = Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        let frame = Frame::compose(&slots(), &Snapshot::default(), now);
        assert_eq!(frame.lines[0].text, "Neural Control Panel  09:05:07");
        assert_eq!(frame.lines[0].tone, Tone::Title);
    }

    #[test]
    fn test_compose_marks_degraded_fragments() {
        let model = DisplayModel::new();
        model.update("resources", DisplayFragment::degraded("CPU: 3.0%", "source unavailable: x"));

        let frame = Frame::compose(&slots(), &model.snapshot(), Local::now());
        assert_eq!(frame.lines[1].tone, Tone::Degraded);
        assert!(frame.lines[1].text.contains("CPU: 3.0%"));
        assert!(frame.lines[1].text.contains("source unavailable: x"));
    }

    #[test]
    fn test_draw_skips_unchanged_version() {
        let model = DisplayModel::new();
        let mut renderer = Renderer::new(model.clone(), slots(), Duration::from_millis(100), Shutdown::new());
        let mut surface = RecordingSurface::default();

        assert!(renderer.draw(&mut surface).unwrap());
        assert!(!renderer.draw(&mut surface).unwrap());

        model.update("resources", DisplayFragment::new("CPU: 1.0%"));
        assert!(renderer.draw(&mut surface).unwrap());
        assert!(!renderer.draw(&mut surface).unwrap());

        let versions: Vec<_> = surface.frames.iter().map(|f| f.version).collect();
        assert_eq!(versions, vec![0, 1]);
    }

    #[test]
    fn test_terminal_surface_writes_text() {
        let model = DisplayModel::new();
        model.update("resources", DisplayFragment::new("CPU: 7.0% | RAM: 1.0% | SWAP: 0.0%"));
        let frame = Frame::compose(&slots(), &model.snapshot(), Local::now());

        let mut surface = TerminalSurface::new(Vec::new());
        surface.paint(&frame).unwrap();
        let written = String::from_utf8_lossy(&surface.into_inner()).into_owned();

        assert!(written.contains(TITLE));
        assert!(written.contains("CPU: 7.0% | RAM: 1.0% | SWAP: 0.0%"));
        assert!(written.contains(FOOTER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_quit() {
        let model = DisplayModel::new();
        let shutdown = Shutdown::new();
        let mut renderer = Renderer::new(model.clone(), slots(), Duration::from_millis(100), shutdown.clone());

        let handle = tokio::spawn(async move {
            let mut surface = RecordingSurface::default();
            let result = renderer.run(&mut surface).await;
            (result, surface)
        });

        tokio::time::sleep(Duration::from_millis(250)).await;
        model.update("resources", DisplayFragment::new("CPU: 2.0%"));
        tokio::time::sleep(Duration::from_millis(250)).await;
        shutdown.trigger();

        let (result, surface) = handle.await.unwrap();
        assert!(result.is_ok());
        let versions: Vec<_> = surface.frames.iter().map(|f| f.version).collect();
        assert_eq!(versions, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_paint_failure_is_fatal() {
        let shutdown = Shutdown::new();
        let mut renderer = Renderer::new(DisplayModel::new(), slots(), Duration::from_millis(10), shutdown.clone());

        let result = renderer.run(&mut BrokenSurface).await;
        assert!(result.is_err());
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_quit_raises_shutdown() {
        let shutdown = Shutdown::new();
        let renderer = Renderer::new(DisplayModel::new(), slots(), Duration::from_millis(10), shutdown.clone());
        renderer.quit();
        assert!(shutdown.is_triggered());
    }
}
