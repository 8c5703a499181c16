use std::io::{self, Write as _};

use super::{Writer, WriterError};

/// A standard stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    /// Standard output.
    Stdout,

    /// Standard error.
    Stderr,
}

/// A writer that prints each line to a standard stream.
#[derive(Clone, Copy, Debug)]
pub struct StreamWriter {
    stream: Stream,
}

impl StreamWriter {
    /// Creates a writer for standard output.
    pub const fn stdout() -> Self {
        Self { stream: Stream::Stdout }
    }

    /// Creates a writer for standard error.
    pub const fn stderr() -> Self {
        Self { stream: Stream::Stderr }
    }

    /// The stream this writer prints to.
    pub const fn stream(&self) -> Stream {
        self.stream
    }
}

impl Writer for StreamWriter {
    fn write(&self, line: &str) {
        // The stream lock keeps the line and its newline together when several threads print at once.
        let _ = match self.stream {
            Stream::Stdout => writeln!(io::stdout().lock(), "{line}"),
            Stream::Stderr => writeln!(io::stderr().lock(), "{line}"),
        };
    }

    fn flush(&self) {
        let _ = match self.stream {
            Stream::Stdout => io::stdout().flush(),
            Stream::Stderr => io::stderr().flush(),
        };
    }

    fn close(&self) -> Result<(), WriterError> {
        self.flush();
        Ok(())
    }
}
