//! Output channels for protocol lines.
//!
//! A [`Writer`] accepts fully-encoded protocol lines and delivers them somewhere: a SpectatorD socket, a file, a
//! standard stream, memory, or nowhere at all. Writers are shared between every meter created from the same
//! [`Registry`][crate::Registry], so all implementations are safe to call from many threads at once.
//!
//! Writing is best-effort. Transport failures are logged and the affected lines are dropped, but they are never
//! reported back to the code recording the measurement.
use std::{io, sync::Arc, time::Duration};

use thiserror::Error;

mod datagram;
pub use self::datagram::{DatagramWriter, TransportStats};

mod destination;
pub use self::destination::{
    is_valid_destination, new_writer, new_writer_with_buffer, new_writer_with_options, Destination,
    DEFAULT_UDP_ADDRESS,
};
#[cfg(unix)]
pub use self::destination::DEFAULT_UNIX_PATH;

mod file;
pub use self::file::FileWriter;

mod memory;
pub use self::memory::MemoryWriter;

mod stream;
pub use self::stream::{Stream, StreamWriter};

/// Default write timeout for socket-based writers.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default interval at which buffered writers flush a partially-filled batch.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Errors that could occur while creating or closing a writer.
#[derive(Debug, Error)]
pub enum WriterError {
    /// The destination descriptor is not one of the supported forms.
    #[error("unknown output location: {0}")]
    UnknownDestination(String),

    /// The underlying resource could not be opened, flushed, or closed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A sink for protocol lines.
pub trait Writer: Send + Sync {
    /// Writes a single protocol line.
    ///
    /// The line must not contain a trailing newline. Implementations never block indefinitely and never fail: if the
    /// line cannot be delivered, it is dropped.
    fn write(&self, line: &str);

    /// Sends any lines held in an internal buffer.
    ///
    /// Unbuffered writers have nothing to do here.
    fn flush(&self) {}

    /// Flushes and releases the underlying resource.
    ///
    /// Closing is idempotent. Lines written after a writer is closed are dropped.
    ///
    /// # Errors
    ///
    /// If the final flush of the underlying resource fails, an error is returned. The writer is considered closed
    /// regardless.
    fn close(&self) -> Result<(), WriterError>;
}

impl<W> Writer for Arc<W>
where
    W: Writer + ?Sized,
{
    fn write(&self, line: &str) {
        (**self).write(line);
    }

    fn flush(&self) {
        (**self).flush();
    }

    fn close(&self) -> Result<(), WriterError> {
        (**self).close()
    }
}

impl<W> Writer for Box<W>
where
    W: Writer + ?Sized,
{
    fn write(&self, line: &str) {
        (**self).write(line);
    }

    fn flush(&self) {
        (**self).flush();
    }

    fn close(&self) -> Result<(), WriterError> {
        (**self).close()
    }
}

/// Options for constructing writers.
///
/// Only socket-based writers make use of these; the remaining writers ignore them.
#[derive(Clone, Debug)]
pub struct WriterOptions {
    /// Size of the outbound batch, in bytes.
    ///
    /// A value of `0` or `1` disables batching, sending every line as its own datagram.
    pub buffer_size: usize,

    /// How often a partially-filled batch is flushed.
    pub flush_interval: Duration,

    /// Upper bound on how long a single send may block.
    pub write_timeout: Duration,
}

impl WriterOptions {
    /// Returns `true` if lines are batched before being sent.
    pub fn buffering_enabled(&self) -> bool {
        self.buffer_size > 1
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            buffer_size: 0,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// A writer that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopWriter;

impl Writer for NoopWriter {
    fn write(&self, _: &str) {}

    fn close(&self) -> Result<(), WriterError> {
        Ok(())
    }
}
