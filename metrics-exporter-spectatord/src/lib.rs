//! A [`metrics`]-compatible exporter for sending metrics to [SpectatorD][spectatord].
//!
//! [spectatord]: https://github.com/Netflix-Skunkworks/spectatord
//!
//! # Usage
//!
//! ```no_run
//! # use metrics_exporter_spectatord::SpectatordBuilder;
//! // First, create a builder.
//! //
//! // The builder can configure where metrics are sent, how they are batched, and which tags are applied to every
//! // metric. `SpectatordBuilder::from_env` starts from the process environment instead of the defaults.
//! let builder = SpectatordBuilder::default().with_common_tags([("nf.app", "example")]);
//!
//! // Installing the exporter sets it as the global recorder for all `metrics` calls. The returned registry can be used
//! // to create SpectatorD-specific meters, and to flush any buffered metrics on shutdown.
//! let registry = builder.install().expect("failed to install recorder/exporter");
//!
//! metrics::counter!("requests", "status" => "200").increment(1);
//!
//! registry.close();
//!
//! // For scenarios where you need access to the `Recorder` object, perhaps to wrap it in a layer stack, you can simply
//! // call `build` instead of `install`:
//! # let builder = SpectatordBuilder::default();
//! let recorder = builder.build().expect("failed to build recorder");
//! ```
//!
//! # Mapping
//!
//! SpectatorD aggregates on its own, so every `metrics` update is sent as it happens:
//!
//! | `metrics` operation | SpectatorD line |
//! |---|---|
//! | `counter.increment(n)` | counter (`c`) incremented by `n` |
//! | `counter.absolute(n)` | unsigned monotonic counter (`U`) set to `n` |
//! | `gauge.set(v)` | gauge (`g`) set to `v` |
//! | `gauge.increment(v)`, `gauge.decrement(v)` | gauge (`g`) set to the adjusted value |
//! | `histogram.record(v)` | distribution summary (`d`) recording `v`, rounded |
//!
//! Labels become tags, and metric descriptions are ignored.
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, SpectatordBuilder};

mod recorder;
pub use self::recorder::SpectatordRecorder;

mod storage;
