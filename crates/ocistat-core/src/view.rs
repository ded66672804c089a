//! Live view - single-threaded terminal rendering
//!
//! Copy workers run concurrently, terminal output is strictly serial. All
//! drawing is channeled through one actor thread that owns the table of
//! in-flight transfers.
//!
//! 1. **Senders (many)**: tracked pushes and status reports send events and
//!    never touch the terminal themselves.
//! 2. **Receiver (one)**: the actor thread processes events in order and is
//!    the only writer, so lines never tear.
//! 3. **Frame**: in-flight transfers occupy a block at the bottom of the
//!    output. Every redraw moves up over the block, clears it, prints any
//!    finished status line above it and draws the block again.

use crate::prompt::{Console, Verb, status_line};
use crate::{Error, Result};
use crossterm::QueueableCommand;
use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::terminal::{Clear, ClearType};
use ocistat_schema::{Descriptor, Digest};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Redraw interval while transfers are running (10 FPS).
const TICK: Duration = Duration::from_millis(100);
/// Width of the progress bar in cells.
const BAR_WIDTH: usize = 20;
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Events the actor thread understands.
#[derive(Debug)]
enum ViewEvent {
    /// A transfer began.
    Started {
        digest: Digest,
        label: String,
        total: u64,
    },
    /// More bytes went through.
    Advanced { digest: Digest, bytes: u64 },
    /// The transfer stream was dropped.
    Finished { digest: Digest },
    /// Print a permanent status line and acknowledge the write.
    Status {
        line: String,
        ack: mpsc::Sender<io::Result<()>>,
    },
    /// Clear the frame and exit.
    Shutdown,
}

/// Handle to the live progress view of one run.
///
/// Created once when tracking starts, released once by [`LiveView::stop`].
/// Dropping the view also shuts the actor down.
#[derive(Debug)]
pub struct LiveView {
    sender: mpsc::Sender<ViewEvent>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LiveView {
    /// Spawn the actor drawing on `console`.
    ///
    /// `verb` labels in-flight transfers (e.g. `Uploading`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTerminal`] if `console` is not interactive.
    pub fn start(console: &Console, verb: Verb) -> Result<Self> {
        if !console.is_interactive() {
            return Err(Error::NotTerminal);
        }

        let (sender, receiver) = mpsc::channel();
        let console = console.clone();
        let handle = thread::Builder::new()
            .name("ocistat-view".to_string())
            .spawn(move || run_event_loop(&receiver, &console, verb))
            .map_err(Error::Report)?;
        tracing::debug!(%verb, "live view started");

        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Print a permanent status line above the in-flight block.
    ///
    /// Blocks the calling thread until the actor has written the line, so
    /// write failures reach the caller. Called from async hooks this parks
    /// the worker for one terminal write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Report`] if the line could not be written or the
    /// view has been stopped.
    pub fn report(&self, desc: &Descriptor, verb: Verb) -> Result<()> {
        let (ack, done) = mpsc::channel();
        self.sender
            .send(ViewEvent::Status {
                line: status_line(verb, desc),
                ack,
            })
            .map_err(|_| stopped())?;
        done.recv().map_err(|_| stopped())?.map_err(Error::Report)
    }

    /// Register an in-flight transfer of `desc`.
    ///
    /// The row disappears when the returned handle is dropped.
    pub fn track(&self, desc: &Descriptor) -> Progress {
        let _ = self.sender.send(ViewEvent::Started {
            digest: desc.digest.clone(),
            label: format!("{} {}", desc.digest.short(), desc.display_name()),
            total: desc.size,
        });
        Progress {
            sender: self.sender.clone(),
            digest: desc.digest.clone(),
        }
    }

    /// Clear the frame and join the actor thread.
    ///
    /// Only the first call does anything; later calls return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Report`] if the actor thread panicked.
    pub fn stop(&self) -> Result<()> {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return Ok(());
        };

        // A dead actor has already dropped the receiver; joining still works.
        let _ = self.sender.send(ViewEvent::Shutdown);
        handle
            .join()
            .map_err(|_| Error::Report(io::Error::other("live view thread panicked")))?;
        tracing::debug!("live view stopped");
        Ok(())
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        // Send shutdown signal (ignore errors if already shut down)
        let _ = self.sender.send(ViewEvent::Shutdown);
    }
}

fn stopped() -> Error {
    Error::Report(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "live view is not running",
    ))
}

/// Byte counter for one in-flight transfer.
#[derive(Debug)]
pub struct Progress {
    sender: mpsc::Sender<ViewEvent>,
    digest: Digest,
}

impl Progress {
    /// Record `bytes` more transferred.
    pub fn advance(&self, bytes: u64) {
        let _ = self.sender.send(ViewEvent::Advanced {
            digest: self.digest.clone(),
            bytes,
        });
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        let _ = self.sender.send(ViewEvent::Finished {
            digest: self.digest.clone(),
        });
    }
}

/// One in-flight transfer.
#[derive(Debug)]
struct Row {
    digest: Digest,
    label: String,
    done: u64,
    total: u64,
}

/// State owned exclusively by the actor thread.
#[derive(Debug)]
struct Frame {
    verb: Verb,
    rows: Vec<Row>,
    drawn: u16,
    started: Instant,
}

impl Frame {
    fn new(verb: Verb) -> Self {
        Self {
            verb,
            rows: Vec::new(),
            drawn: 0,
            started: Instant::now(),
        }
    }

    /// Redraw the block, printing `line` above it first.
    fn render(&mut self, console: &Console, line: Option<&str>) -> io::Result<()> {
        // Build the whole frame first so it reaches the terminal in one write.
        let mut buf = Vec::new();
        if self.drawn > 0 {
            buf.queue(MoveUp(self.drawn))?;
        }
        buf.queue(MoveToColumn(0))?;
        buf.queue(Clear(ClearType::FromCursorDown))?;
        if let Some(line) = line {
            writeln!(buf, "{line}")?;
        }
        let spinner = self.spinner();
        for row in &self.rows {
            writeln!(buf, "{}", self.format_row(spinner, row))?;
        }

        console.with_writer(|w| {
            w.write_all(&buf)?;
            w.flush()
        })?;
        self.drawn = u16::try_from(self.rows.len()).unwrap_or(u16::MAX);
        Ok(())
    }

    /// Spinner frame derived from wall-clock time so animation speed does
    /// not depend on event volume.
    fn spinner(&self) -> &'static str {
        let frame = self.started.elapsed().as_millis() / TICK.as_millis();
        SPINNER[(frame % SPINNER.len() as u128) as usize]
    }

    fn format_row(&self, spinner: &str, row: &Row) -> String {
        format!(
            "{spinner} {} {} {}",
            self.verb,
            row.label,
            format_progress(row.done, row.total)
        )
    }
}

/// Progress bar with percentage: `[━━━━━░░░░░]  50%`.
#[allow(clippy::cast_sign_loss)] // ratio is clamped to 0.0..=1.0
fn format_progress(done: u64, total: u64) -> String {
    if total == 0 {
        return format!("[{}] {done} B", "░".repeat(BAR_WIDTH));
    }
    let ratio = (done.min(total) as f64) / (total as f64);
    let filled = ((ratio * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!(
        "[{}{}] {:>3}%",
        "━".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        (ratio * 100.0).round() as u64
    )
}

/// Main event loop for the actor.
///
/// Write failures on progress redraws are dropped; only status lines report
/// them, through their acknowledgement channel.
fn run_event_loop(receiver: &mpsc::Receiver<ViewEvent>, console: &Console, verb: Verb) {
    let mut frame = Frame::new(verb);

    loop {
        match receiver.recv_timeout(TICK) {
            Ok(ViewEvent::Started {
                digest,
                label,
                total,
            }) => {
                frame.rows.push(Row {
                    digest,
                    label,
                    done: 0,
                    total,
                });
                let _ = frame.render(console, None);
            }
            Ok(ViewEvent::Advanced { digest, bytes }) => {
                if let Some(row) = frame.rows.iter_mut().find(|r| r.digest == digest) {
                    row.done = row.done.saturating_add(bytes);
                }
            }
            Ok(ViewEvent::Finished { digest }) => {
                frame.rows.retain(|r| r.digest != digest);
                let _ = frame.render(console, None);
            }
            Ok(ViewEvent::Status { line, ack }) => {
                let _ = ack.send(frame.render(console, Some(&line)));
            }
            Ok(ViewEvent::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                frame.rows.clear();
                let _ = frame.render(console, None);
                break;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if !frame.rows.is_empty() {
                    let _ = frame.render(console, None);
                }
            }
        }
    }
}
