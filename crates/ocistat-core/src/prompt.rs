//! Reporter binding: status verbs, the `Prompt` trait and the console.
//!
//! This trait allows handlers to print status lines without being coupled
//! to a specific terminal implementation.

use crate::{Error, Result};
use ocistat_schema::Descriptor;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Status verbs printed at the start of every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Push in progress.
    Uploading,
    /// Push finished.
    Uploaded,
    /// Pull in progress.
    Downloading,
    /// Pull finished.
    Downloaded,
    /// Copy in progress.
    Copying,
    /// Copy finished.
    Copied,
    /// Destination already had the content.
    Exists,
    /// Content accounted for without being transferred individually.
    Skipped,
    /// Content restored from a local copy.
    Restored,
    /// Blob mounted from another repository.
    Mounted,
}

impl Verb {
    /// The word as printed.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploading => "Uploading",
            Self::Uploaded => "Uploaded",
            Self::Downloading => "Downloading",
            Self::Downloaded => "Downloaded",
            Self::Copying => "Copying",
            Self::Copied => "Copied",
            Self::Exists => "Exists",
            Self::Skipped => "Skipped",
            Self::Restored => "Restored",
            Self::Mounted => "Mounted",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render one status line: `<verb> <short-digest> <title-or-media-type>`.
pub fn status_line(verb: Verb, desc: &Descriptor) -> String {
    format!("{verb} {} {}", desc.digest.short(), desc.display_name())
}

/// Something that can print a status event.
///
/// Implementations serialize their own output; callers issue one call per
/// event and propagate the returned error unchanged.
pub trait Prompt: Send + Sync {
    /// Print `verb` for `desc`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Report`] if the line could not be written.
    fn report(&self, desc: &Descriptor, verb: Verb) -> Result<()>;
}

impl<T: Prompt + ?Sized> Prompt for Arc<T> {
    fn report(&self, desc: &Descriptor, verb: Verb) -> Result<()> {
        (**self).report(desc, verb)
    }
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// The output stream status lines go to.
///
/// Cloning shares the underlying writer. Whether the stream is an
/// interactive terminal is captured once at construction.
#[derive(Clone)]
pub struct Console {
    writer: SharedWriter,
    interactive: bool,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

impl Console {
    /// Standard output.
    pub fn stdout() -> Self {
        let interactive = io::stdout().is_terminal();
        Self::with_mode(Box::new(io::stdout()), interactive)
    }

    /// Standard error.
    pub fn stderr() -> Self {
        let interactive = io::stderr().is_terminal();
        Self::with_mode(Box::new(io::stderr()), interactive)
    }

    /// Any writer; never treated as a terminal.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self::with_mode(Box::new(writer), false)
    }

    /// Force plain output even on a terminal.
    pub fn plain(mut self) -> Self {
        self.interactive = false;
        self
    }

    pub(crate) fn with_mode(writer: Box<dyn Write + Send>, interactive: bool) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            interactive,
        }
    }

    /// Whether live progress can be drawn on this stream.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Run `f` with exclusive access to the writer.
    pub(crate) fn with_writer<R>(&self, f: impl FnOnce(&mut dyn Write) -> R) -> R {
        let mut guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **guard)
    }

    /// Write one line and flush.
    ///
    /// # Errors
    ///
    /// Returns the writer's I/O error.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        self.with_writer(|w| {
            writeln!(w, "{line}")?;
            w.flush()
        })
    }
}

/// Plain line-per-event prompt used when no live view is running.
impl Prompt for Console {
    fn report(&self, desc: &Descriptor, verb: Verb) -> Result<()> {
        self.write_line(&status_line(verb, desc))
            .map_err(Error::Report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::SharedBuf;
    use ocistat_schema::media_type;

    #[test]
    fn line_format_uses_short_digest_and_title() {
        let desc = Descriptor::new(media_type::OCI_LAYER, b"a").with_title("a.txt");
        let line = status_line(Verb::Uploaded, &desc);
        assert_eq!(line, format!("Uploaded {} a.txt", desc.digest.short()));
    }

    #[test]
    fn line_format_falls_back_to_media_type() {
        let desc = Descriptor::new(media_type::OCI_CONFIG, b"{}");
        let line = status_line(Verb::Exists, &desc);
        assert!(line.starts_with("Exists "));
        assert!(line.ends_with(media_type::OCI_CONFIG));
    }

    #[test]
    fn writer_console_is_not_interactive() {
        let console = Console::from_writer(Vec::new());
        assert!(!console.is_interactive());
    }

    #[test]
    fn console_prompt_writes_lines() {
        let buf = SharedBuf::default();
        let console = Console::from_writer(buf.clone());
        let desc = Descriptor::new(media_type::OCI_LAYER, b"x").with_title("x.bin");

        console.report(&desc, Verb::Copied).unwrap();
        console.report(&desc, Verb::Exists).unwrap();

        assert_eq!(buf.lines(), vec![
            status_line(Verb::Copied, &desc),
            status_line(Verb::Exists, &desc),
        ]);
    }

    #[test]
    fn broken_writer_is_report_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let console = Console::from_writer(Broken);
        let desc = Descriptor::new(media_type::OCI_LAYER, b"x");
        let err = console.report(&desc, Verb::Copied).unwrap_err();
        assert!(matches!(err, Error::Report(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }
}
