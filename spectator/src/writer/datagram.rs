use std::{
    fmt, io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs as _, UdpSocket},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak,
    },
    thread,
    time::Duration,
};

#[cfg(unix)]
use std::{os::unix::net::UnixDatagram, path::PathBuf};

use tracing::{debug, trace, warn};

use super::{Writer, WriterError, WriterOptions};

const MIN_WRITE_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RemoteAddr {
    // The address as given, and what it resolved to when the writer was created.
    Udp { address: String, resolved: Vec<SocketAddr> },

    #[cfg(unix)]
    Unixgram(PathBuf),
}

impl RemoteAddr {
    /// Resolves a `<host>:<port>` address.
    ///
    /// Resolution can block, so it happens once, here, and never on the write path. A failure is logged and leaves the
    /// address with no candidates, so every send is dropped.
    fn udp(address: String) -> Self {
        let resolved = match address.to_socket_addrs() {
            Ok(addrs) => addrs.collect::<Vec<_>>(),
            Err(e) => {
                warn!(address = %address, error = %e, "Failed to resolve SpectatorD address; lines will be dropped.");
                Vec::new()
            }
        };
        RemoteAddr::Udp { address, resolved }
    }

    /// Returns the transport ID for the remote address.
    pub const fn transport_id(&self) -> &'static str {
        match self {
            RemoteAddr::Udp { .. } => "udp",
            #[cfg(unix)]
            RemoteAddr::Unixgram(_) => "unix",
        }
    }
}

impl fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteAddr::Udp { address, .. } => write!(f, "udp://{address}"),
            #[cfg(unix)]
            RemoteAddr::Unixgram(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

enum Client {
    Udp(UdpSocket),

    #[cfg(unix)]
    Unixgram(UnixDatagram),
}

impl Client {
    fn connect(remote_addr: &RemoteAddr, write_timeout: Duration) -> io::Result<Self> {
        // A zero timeout is rejected by the socket APIs.
        let write_timeout = write_timeout.max(MIN_WRITE_TIMEOUT);

        match remote_addr {
            RemoteAddr::Udp { resolved, .. } => {
                let first = resolved
                    .first()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address did not resolve"))?;

                // Bind to the same address family as the destination, and only connect to candidates in that family.
                let local = if first.is_ipv4() {
                    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
                } else {
                    SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
                };
                let candidates =
                    resolved.iter().filter(|a| a.is_ipv4() == first.is_ipv4()).copied().collect::<Vec<_>>();

                let socket = UdpSocket::bind(local)?;
                socket.connect(&candidates[..])?;
                socket.set_write_timeout(Some(write_timeout))?;
                Ok(Client::Udp(socket))
            }

            #[cfg(unix)]
            RemoteAddr::Unixgram(path) => {
                let socket = UnixDatagram::unbound()?;
                socket.connect(path)?;
                socket.set_write_timeout(Some(write_timeout))?;
                Ok(Client::Unixgram(socket))
            }
        }
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Client::Udp(socket) => socket.send(buf),

            #[cfg(unix)]
            Client::Unixgram(socket) => socket.send(buf),
        }
    }
}

enum ClientState {
    // Intermediate state during send attempts.
    Inconsistent,

    // Writer is currently disconnected, and will connect on the next send.
    Disconnected,

    // Writer is connected and ready to send.
    Ready(Client),
}

impl ClientState {
    fn try_send(
        &mut self,
        remote_addr: &RemoteAddr,
        write_timeout: Duration,
        payload: &[u8],
    ) -> io::Result<usize> {
        loop {
            let old_state = std::mem::replace(self, ClientState::Inconsistent);
            match old_state {
                ClientState::Inconsistent => unreachable!("transitioned _from_ inconsistent state"),
                ClientState::Disconnected => match Client::connect(remote_addr, write_timeout) {
                    Ok(client) => *self = ClientState::Ready(client),
                    Err(e) => {
                        *self = ClientState::Disconnected;
                        return Err(e);
                    }
                },
                ClientState::Ready(client) => {
                    let result = client.send(payload);
                    if result.is_ok() {
                        *self = ClientState::Ready(client);
                    } else {
                        *self = ClientState::Disconnected;
                    }

                    return result;
                }
            }
        }
    }
}

/// Counts of payloads and bytes handled by a [`DatagramWriter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Number of datagrams sent successfully.
    pub payloads_sent: u64,

    /// Number of datagrams dropped because they could not be sent.
    pub payloads_dropped: u64,

    /// Number of bytes sent successfully.
    pub bytes_sent: u64,

    /// Number of bytes dropped because they could not be sent.
    pub bytes_dropped: u64,
}

#[derive(Default)]
struct Telemetry {
    payloads_sent: AtomicU64,
    payloads_dropped: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_dropped: AtomicU64,
}

impl Telemetry {
    fn track_send_succeeded(&self, bytes_len: usize) {
        self.payloads_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes_len as u64, Ordering::Relaxed);
    }

    fn track_send_failed(&self, bytes_len: usize) {
        self.payloads_dropped.fetch_add(1, Ordering::Relaxed);
        self.bytes_dropped.fetch_add(bytes_len as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TransportStats {
        TransportStats {
            payloads_sent: self.payloads_sent.load(Ordering::Relaxed),
            payloads_dropped: self.payloads_dropped.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_dropped: self.bytes_dropped.load(Ordering::Relaxed),
        }
    }
}

struct State {
    client: ClientState,
    batch: Vec<u8>,
    // Set after a failed send, so that only the first failure in a run is logged loudly.
    failing: bool,
    closed: bool,
}

struct Inner {
    remote_addr: RemoteAddr,
    options: WriterOptions,
    state: Mutex<State>,
    // Signalled on close, so the flusher thread exits without waiting out its interval.
    closed_signal: Condvar,
    telemetry: Telemetry,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, client: &mut ClientState, failing: &mut bool, payload: &[u8]) {
        match client.try_send(&self.remote_addr, self.options.write_timeout, payload) {
            Ok(_) => {
                self.telemetry.track_send_succeeded(payload.len());
                if std::mem::take(failing) {
                    debug!(remote_addr = %self.remote_addr, "Recovered connection to SpectatorD.");
                }
            }
            Err(e) => {
                self.telemetry.track_send_failed(payload.len());
                if *failing {
                    debug!(
                        remote_addr = %self.remote_addr,
                        error = %e,
                        payload_len = payload.len(),
                        "Dropped payload."
                    );
                } else {
                    warn!(
                        remote_addr = %self.remote_addr,
                        error = %e,
                        payload_len = payload.len(),
                        "Failed to send payload; dropping it and reconnecting on the next write."
                    );
                    *failing = true;
                }
            }
        }
    }

    fn write(&self, line: &str) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            trace!(remote_addr = %self.remote_addr, "Dropping line written after close.");
            return;
        }

        if !self.options.buffering_enabled() {
            self.send(&mut state.client, &mut state.failing, line.as_bytes());
            return;
        }

        let buffer_size = self.options.buffer_size;

        // Send what we have first if this line would push the batch over its budget.
        if !state.batch.is_empty() && state.batch.len() + 1 + line.len() > buffer_size {
            self.send(&mut state.client, &mut state.failing, &state.batch);
            state.batch.clear();
        }

        if !state.batch.is_empty() {
            state.batch.push(b'\n');
        }
        state.batch.extend_from_slice(line.as_bytes());

        if state.batch.len() >= buffer_size {
            self.send(&mut state.client, &mut state.failing, &state.batch);
            state.batch.clear();
        }
    }

    fn flush(&self) {
        let mut guard = self.lock();
        self.send_pending(&mut guard);
    }

    /// Waits up to `interval` for the writer to close, then sends any pending batch.
    ///
    /// Returns `false` once the writer has been closed.
    fn wait_then_flush(&self, interval: Duration) -> bool {
        let guard = self.lock();
        let (mut guard, _) = self
            .closed_signal
            .wait_timeout_while(guard, interval, |state| !state.closed)
            .unwrap_or_else(PoisonError::into_inner);
        self.send_pending(&mut guard)
    }

    /// Sends any pending batch. Returns `false` if the writer has been closed.
    fn send_pending(&self, state: &mut State) -> bool {
        if state.closed {
            return false;
        }

        if !state.batch.is_empty() {
            self.send(&mut state.client, &mut state.failing, &state.batch);
            state.batch.clear();
        }

        true
    }

    fn close(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !self.send_pending(state) {
            return;
        }

        // Dropping the client releases the socket.
        state.client = ClientState::Disconnected;
        state.closed = true;
        self.closed_signal.notify_all();

        debug!(remote_addr = %self.remote_addr, "Closed writer.");
    }
}

/// A writer that sends lines to SpectatorD as datagrams, over UDP or a Unix domain socket.
///
/// # Connection handling
///
/// The socket is connected lazily, on the first send. If a send fails (the daemon is not listening, the socket was
/// closed, and so on) the payload is dropped, the socket is discarded, and the next write connects again. Failed sends
/// are never retried within the same call, and are never reported to the caller: they are logged and counted in
/// [`stats`][DatagramWriter::stats].
///
/// # Batching
///
/// With a buffer size of `0` or `1`, every line is sent as its own datagram. With a larger buffer size, lines are
/// joined with newlines into a batch of at most `buffer_size` bytes (a single line larger than that is sent by itself),
/// and the batch is sent once full. Partially-filled batches are sent on [`flush`][Writer::flush],
/// [`close`][Writer::close], when the writer is dropped, and periodically by a background thread.
pub struct DatagramWriter {
    inner: Arc<Inner>,
}

impl DatagramWriter {
    /// Creates a writer sending to the given UDP address, in `<host>:<port>` form.
    ///
    /// The address is resolved here, once. If it does not resolve, the writer is still created but drops every line.
    pub fn udp<A>(address: A, options: &WriterOptions) -> Self
    where
        A: Into<String>,
    {
        Self::new(RemoteAddr::udp(address.into()), options)
    }

    /// Creates a writer sending to the given Unix datagram socket.
    #[cfg(unix)]
    pub fn unixgram<P>(path: P, options: &WriterOptions) -> Self
    where
        P: Into<PathBuf>,
    {
        Self::new(RemoteAddr::Unixgram(path.into()), options)
    }

    pub(crate) fn new(remote_addr: RemoteAddr, options: &WriterOptions) -> Self {
        let state = State {
            client: ClientState::Disconnected,
            batch: Vec::with_capacity(if options.buffering_enabled() { options.buffer_size } else { 0 }),
            failing: false,
            closed: false,
        };
        let inner = Arc::new(Inner {
            remote_addr,
            options: options.clone(),
            state: Mutex::new(state),
            closed_signal: Condvar::new(),
            telemetry: Telemetry::default(),
        });

        if options.buffering_enabled() && !options.flush_interval.is_zero() {
            spawn_flusher(&inner, options.flush_interval);
        }

        Self { inner }
    }

    /// Returns the transport in use: `udp` or `unix`.
    pub fn transport_id(&self) -> &'static str {
        self.inner.remote_addr.transport_id()
    }

    /// Returns the destination descriptor this writer sends to.
    pub fn remote_address(&self) -> String {
        self.inner.remote_addr.to_string()
    }

    /// Returns a snapshot of the payloads and bytes sent and dropped so far.
    pub fn stats(&self) -> TransportStats {
        self.inner.telemetry.snapshot()
    }
}

impl Writer for DatagramWriter {
    fn write(&self, line: &str) {
        self.inner.write(line);
    }

    fn flush(&self) {
        self.inner.flush();
    }

    fn close(&self) -> Result<(), WriterError> {
        self.inner.close();
        Ok(())
    }
}

impl Drop for DatagramWriter {
    fn drop(&mut self) {
        self.inner.close();
    }
}

fn spawn_flusher(inner: &Arc<Inner>, flush_interval: Duration) {
    let weak: Weak<Inner> = Arc::downgrade(inner);
    let result = thread::Builder::new().name("spectator-writer-flusher".to_string()).spawn(move || loop {
        let Some(inner) = weak.upgrade() else {
            break;
        };
        if !inner.wait_then_flush(flush_interval) {
            break;
        }
    });

    if let Err(e) = result {
        warn!(error = %e, "Failed to spawn flusher thread; partial batches will only be sent on flush or close.");
    }
}
