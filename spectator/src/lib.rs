//! A thin client for sending metrics to [SpectatorD][spectatord].
//!
//! [spectatord]: https://github.com/Netflix-Skunkworks/spectatord
//!
//! SpectatorD is a local daemon that aggregates metrics on behalf of the processes running alongside it. This crate
//! does no aggregation of its own: every update to a meter becomes a single line of SpectatorD's line protocol,
//! handed straight to a [`Writer`][writer::Writer] that delivers it over UDP, a Unix datagram socket, a file, a
//! standard stream, or into memory for tests.
//!
//! # Usage
//!
//! ```no_run
//! # use spectator::{Config, Registry};
//! # use std::time::Duration;
//! // Configure where lines are sent, and which tags should be applied to every meter.
//! let config = Config::builder()
//!     .with_location("udp")
//!     .with_common_tag("nf.app", "example")
//!     .build()
//!     .expect("invalid configuration");
//!
//! let registry = Registry::new(config).expect("failed to create registry");
//!
//! // Meters are cached by identity, so asking for the same one twice is cheap.
//! registry.counter("server.requestCount", [("status", "200")]).increment();
//! registry.timer("server.requestLatency", [("status", "200")]).record(Duration::from_millis(42));
//! registry.gauge_with_ttl("server.queueSize", [("queue", "ingest")], Duration::from_secs(60)).set(12.0);
//!
//! // Flush anything still buffered before exiting.
//! registry.close();
//! ```
//!
//! # Destinations
//!
//! | Descriptor | Writes to |
//! |---|---|
//! | `none` | nowhere |
//! | `memory` | an in-memory list of lines |
//! | `stdout`, `stderr` | a standard stream |
//! | `udp` | UDP, `127.0.0.1:1234` |
//! | `unix` | Unix datagram socket, `/run/spectatord/spectatord.unix` |
//! | `file://<path>` | a file, appending |
//! | `udp://<host>:<port>` | UDP, the given address |
//! | `unix://<path>` | Unix datagram socket, the given path |
//!
//! Unix socket destinations are only available on Unix platforms.
//!
//! # Buffering
//!
//! By default, socket destinations send every line as its own datagram. Setting a buffer size greater than one byte
//! via [`ConfigBuilder::with_buffer_size`] batches lines, joined by newlines, until the next line would overflow the
//! buffer. Partially-filled batches are sent periodically, when the registry is closed, and when the writer is dropped.
//!
//! # Failures
//!
//! Recording a measurement never fails. If SpectatorD is unreachable, lines are dropped and the failure is logged via
//! [`tracing`]; the socket is reconnected on the next write.
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod config;
pub use self::config::{Config, ConfigBuilder, ConfigError, DEFAULT_LOCATION, ENV_OUTPUT_LOCATION};

pub mod id;
pub use self::id::{Id, Tags};

pub mod meter;
pub use self::meter::{
    AgeGauge, Counter, DistributionSummary, Gauge, MaxGauge, MonotonicCounter, MonotonicCounterUint,
    PercentileDistributionSummary, PercentileTimer, Timer,
};

pub mod protocol;

mod registry;
pub use self::registry::{Registry, RegistryError};

pub mod writer;
