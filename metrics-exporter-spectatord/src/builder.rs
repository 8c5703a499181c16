use std::{sync::Arc, time::Duration};

use spectator::{writer::Writer, ConfigBuilder, Registry, RegistryError};
use thiserror::Error;
use tracing::debug;

use crate::recorder::SpectatordRecorder;

/// Errors that could occur while building or installing a SpectatorD recorder.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to create the underlying spectator registry, either due to invalid configuration or because the writer
    /// for the configured destination could not be created.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Failed to install the recorder due to an existing global recorder already being installed.
    #[error("failed to install exporter as global recorder")]
    FailedToInstall,
}

/// Builder for a SpectatorD exporter.
pub struct SpectatordBuilder {
    config: ConfigBuilder,
}

impl SpectatordBuilder {
    /// Creates a builder with default settings, overridden by the process environment.
    ///
    /// See [`ConfigBuilder::from_env`] for the variables that are read.
    pub fn from_env() -> Self {
        SpectatordBuilder { config: ConfigBuilder::from_env() }
    }

    /// Set the destination to send metrics to.
    ///
    /// Accepts any destination descriptor understood by spectator, such as `udp`, `unix`, `udp://<host>:<port>`, or
    /// `file://<path>`. The descriptor is validated when the recorder is built.
    ///
    /// Defaults to `udp`, sending to `127.0.0.1:1234`.
    #[must_use]
    pub fn with_location<L>(mut self, location: L) -> Self
    where
        L: Into<String>,
    {
        self.config = self.config.with_location(location);
        self
    }

    /// Set the size, in bytes, of the outbound batch.
    ///
    /// Metrics are joined with newlines and sent once the batch is full, or periodically based on the flush interval.
    /// A value of `0` or `1` sends every metric in its own datagram.
    ///
    /// Defaults to `0`.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.config = self.config.with_buffer_size(buffer_size);
        self
    }

    /// Add tags to every metric, in addition to its labels.
    ///
    /// Labels take precedence over common tags with the same key.
    #[must_use]
    pub fn with_common_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config = self.config.with_common_tags(tags);
        self
    }

    /// Set the flush interval for partially-filled batches.
    ///
    /// Defaults to 5 seconds.
    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.config = self.config.with_flush_interval(flush_interval);
        self
    }

    /// Set the write timeout for sending payloads.
    ///
    /// Defaults to 100 milliseconds.
    #[must_use]
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.config = self.config.with_write_timeout(write_timeout);
        self
    }

    /// Builds the recorder.
    ///
    /// The recorder is _not_ installed as the global recorder.
    ///
    /// # Errors
    ///
    /// If the configuration is invalid, or the writer for the configured destination cannot be created, an error will
    /// be returned.
    pub fn build(self) -> Result<SpectatordRecorder, BuildError> {
        let config = self.config.build().map_err(RegistryError::from)?;
        let registry = Registry::new(config)?;
        Ok(SpectatordRecorder::new(Arc::new(registry)))
    }

    /// Builds the recorder, sending metrics to the given writer instead of the configured destination.
    ///
    /// This is mostly useful for tests, paired with a [`MemoryWriter`][spectator::writer::MemoryWriter].
    ///
    /// # Errors
    ///
    /// If the configuration is invalid, an error will be returned.
    pub fn build_with_writer(self, writer: Arc<dyn Writer>) -> Result<SpectatordRecorder, BuildError> {
        let config = self.config.build().map_err(RegistryError::from)?;
        Ok(SpectatordRecorder::new(Arc::new(Registry::with_writer(config, writer))))
    }

    /// Builds and installs the recorder.
    ///
    /// Returns the spectator registry backing the recorder, which can be used to close it on shutdown.
    ///
    /// # Errors
    ///
    /// If the recorder cannot be built, or if a global recorder is already installed, an error will be returned.
    pub fn install(self) -> Result<Arc<Registry>, BuildError> {
        let recorder = self.build()?;
        let registry = Arc::clone(recorder.registry());

        metrics::set_global_recorder(recorder).map_err(|_| BuildError::FailedToInstall)?;
        debug!(location = registry.config().location(), "Installed SpectatorD recorder as the global recorder.");
        Ok(registry)
    }
}

impl Default for SpectatordBuilder {
    fn default() -> Self {
        SpectatordBuilder { config: ConfigBuilder::default() }
    }
}
