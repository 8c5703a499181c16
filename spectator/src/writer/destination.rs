use std::{fmt, path::PathBuf, str::FromStr};

use tracing::info;

use super::{
    DatagramWriter, FileWriter, MemoryWriter, NoopWriter, StreamWriter, Writer, WriterError, WriterOptions,
};

/// Address used for the bare `udp` destination.
pub const DEFAULT_UDP_ADDRESS: &str = "127.0.0.1:1234";

/// Socket path used for the bare `unix` destination.
#[cfg(unix)]
pub const DEFAULT_UNIX_PATH: &str = "/run/spectatord/spectatord.unix";

const FILE_SCHEME: &str = "file://";
const UDP_SCHEME: &str = "udp://";
#[cfg(unix)]
const UNIX_SCHEME: &str = "unix://";

/// Where protocol lines should be written.
///
/// Destinations are parsed from descriptor strings:
///
/// | Descriptor | Destination |
/// |---|---|
/// | `none` | discard everything |
/// | `memory` | keep lines in memory |
/// | `stdout`, `stderr` | print to a standard stream |
/// | `udp` | UDP to [`DEFAULT_UDP_ADDRESS`] |
/// | `unix` | Unix datagram socket at `DEFAULT_UNIX_PATH` (Unix only) |
/// | `file://<path>` | append to a file |
/// | `udp://<host>:<port>` | UDP to the given address |
/// | `unix://<path>` | Unix datagram socket at the given path (Unix only) |
///
/// Parsing is purely syntactic. UDP hosts are resolved when the writer is created, and sockets connected once lines
/// are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    /// Discard all lines.
    None,

    /// Keep all lines in memory.
    Memory,

    /// Print lines to standard output.
    Stdout,

    /// Print lines to standard error.
    Stderr,

    /// Append lines to a file.
    File(PathBuf),

    /// Send lines over UDP to a `<host>:<port>` address.
    Udp(String),

    /// Send lines over a Unix datagram socket.
    #[cfg(unix)]
    Unix(PathBuf),
}

impl Destination {
    /// Parses a destination descriptor.
    ///
    /// # Errors
    ///
    /// If the descriptor is not one of the supported forms, [`WriterError::UnknownDestination`] is returned, carrying
    /// the descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, WriterError> {
        match descriptor {
            "none" => return Ok(Destination::None),
            "memory" => return Ok(Destination::Memory),
            "stdout" => return Ok(Destination::Stdout),
            "stderr" => return Ok(Destination::Stderr),
            "udp" => return Ok(Destination::Udp(DEFAULT_UDP_ADDRESS.to_string())),
            #[cfg(unix)]
            "unix" => return Ok(Destination::Unix(PathBuf::from(DEFAULT_UNIX_PATH))),
            _ => {}
        }

        if let Some(path) = descriptor.strip_prefix(FILE_SCHEME) {
            return Ok(Destination::File(PathBuf::from(path)));
        }
        if let Some(address) = descriptor.strip_prefix(UDP_SCHEME) {
            return Ok(Destination::Udp(address.to_string()));
        }
        #[cfg(unix)]
        if let Some(path) = descriptor.strip_prefix(UNIX_SCHEME) {
            return Ok(Destination::Unix(PathBuf::from(path)));
        }

        Err(WriterError::UnknownDestination(descriptor.to_string()))
    }

    /// Creates the writer for this destination.
    ///
    /// # Errors
    ///
    /// If the destination is a file that cannot be created or opened, an error is returned. No other destination can
    /// fail at this point.
    pub fn into_writer(self, options: &WriterOptions) -> Result<Box<dyn Writer>, WriterError> {
        let writer: Box<dyn Writer> = match self {
            Destination::None => {
                info!("Initializing NoopWriter.");
                Box::new(NoopWriter)
            }
            Destination::Memory => {
                info!("Initializing MemoryWriter.");
                Box::new(MemoryWriter::new())
            }
            Destination::Stdout => {
                info!("Initializing StreamWriter for stdout.");
                Box::new(StreamWriter::stdout())
            }
            Destination::Stderr => {
                info!("Initializing StreamWriter for stderr.");
                Box::new(StreamWriter::stderr())
            }
            Destination::File(path) => {
                info!(path = %path.display(), "Initializing FileWriter.");
                Box::new(FileWriter::open(path)?)
            }
            Destination::Udp(address) => {
                info!(%address, buffer_size = options.buffer_size, "Initializing DatagramWriter over UDP.");
                Box::new(DatagramWriter::udp(address, options))
            }
            #[cfg(unix)]
            Destination::Unix(path) => {
                info!(
                    path = %path.display(),
                    buffer_size = options.buffer_size,
                    "Initializing DatagramWriter over Unix datagram socket."
                );
                Box::new(DatagramWriter::unixgram(path, options))
            }
        };

        Ok(writer)
    }
}

impl FromStr for Destination {
    type Err = WriterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Destination::parse(s)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::None => f.write_str("none"),
            Destination::Memory => f.write_str("memory"),
            Destination::Stdout => f.write_str("stdout"),
            Destination::Stderr => f.write_str("stderr"),
            Destination::File(path) => write!(f, "{FILE_SCHEME}{}", path.display()),
            Destination::Udp(address) => write!(f, "{UDP_SCHEME}{address}"),
            #[cfg(unix)]
            Destination::Unix(path) => write!(f, "{UNIX_SCHEME}{}", path.display()),
        }
    }
}

/// Returns `true` if `descriptor` is a destination that [`new_writer`] accepts.
///
/// This shares its parser with the writer factory, so the two always agree.
pub fn is_valid_destination(descriptor: &str) -> bool {
    Destination::parse(descriptor).is_ok()
}

/// Creates an unbuffered writer for the given destination descriptor.
///
/// # Errors
///
/// See [`new_writer_with_options`].
pub fn new_writer(descriptor: &str) -> Result<Box<dyn Writer>, WriterError> {
    new_writer_with_options(descriptor, &WriterOptions::default())
}

/// Creates a writer for the given destination descriptor, batching up to `buffer_size` bytes for socket destinations.
///
/// # Errors
///
/// See [`new_writer_with_options`].
pub fn new_writer_with_buffer(descriptor: &str, buffer_size: usize) -> Result<Box<dyn Writer>, WriterError> {
    new_writer_with_options(descriptor, &WriterOptions { buffer_size, ..WriterOptions::default() })
}

/// Creates a writer for the given destination descriptor and options.
///
/// # Errors
///
/// If the descriptor is not a supported form, [`WriterError::UnknownDestination`] is returned. If it names a file
/// that cannot be created or opened, [`WriterError::Io`] is returned.
pub fn new_writer_with_options(
    descriptor: &str,
    options: &WriterOptions,
) -> Result<Box<dyn Writer>, WriterError> {
    Destination::parse(descriptor)?.into_writer(options)
}
