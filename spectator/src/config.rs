//! Registry configuration.
use std::{env, time::Duration};

use thiserror::Error;

use crate::{
    id::Tags,
    writer::{is_valid_destination, WriterOptions, DEFAULT_FLUSH_INTERVAL, DEFAULT_WRITE_TIMEOUT},
};

/// Destination used when none is configured.
pub const DEFAULT_LOCATION: &str = "udp";

/// Environment variable overriding the configured destination.
pub const ENV_OUTPUT_LOCATION: &str = "SPECTATOR_OUTPUT_LOCATION";

/// Environment variables copied into common tags, paired with the tag key they populate.
const ENV_COMMON_TAGS: &[(&str, &str)] =
    &[("NETFLIX_PROCESS_NAME", "nf.process"), ("TITUS_CONTAINER_NAME", "nf.container")];

/// Errors that could occur while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration failed validation.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Details about the validation failure.
        reason: String,
    },
}

/// Validated registry configuration.
///
/// Built with [`ConfigBuilder`].
#[derive(Clone, Debug)]
pub struct Config {
    location: String,
    common_tags: Tags,
    writer_options: WriterOptions,
}

impl Config {
    /// Returns a builder with default settings.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Destination descriptor, such as `udp` or `file:///tmp/spectatord.txt`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Tags applied to every meter created by a registry using this configuration.
    pub fn common_tags(&self) -> &Tags {
        &self.common_tags
    }

    /// Options for the writer created from this configuration.
    pub fn writer_options(&self) -> &WriterOptions {
        &self.writer_options
    }

    /// Size of the outbound batch in bytes, or `0` when lines are sent one at a time.
    pub fn buffer_size(&self) -> usize {
        self.writer_options.buffer_size
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            common_tags: Tags::new(),
            writer_options: WriterOptions::default(),
        }
    }
}

/// Builder for a [`Config`].
///
/// Defaults to sending unbuffered lines over UDP to the local SpectatorD, with no common tags, a flush interval of
/// 5 seconds and a write timeout of 100 milliseconds.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    location: String,
    common_tags: Tags,
    buffer_size: usize,
    flush_interval: Duration,
    write_timeout: Duration,
}

impl ConfigBuilder {
    /// Returns a builder with default settings, overridden by the process environment.
    ///
    /// - `SPECTATOR_OUTPUT_LOCATION` replaces the destination.
    /// - `NETFLIX_PROCESS_NAME` is added as the common tag `nf.process`.
    /// - `TITUS_CONTAINER_NAME` is added as the common tag `nf.container`.
    ///
    /// Variables that are unset or empty are ignored. Settings applied after this call take precedence over the
    /// environment.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| env::var(key).ok())
    }

    fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(location) = lookup(ENV_OUTPUT_LOCATION) {
            self.location = location;
        }
        for &(env_key, tag_key) in ENV_COMMON_TAGS {
            if let Some(value) = lookup(env_key) {
                self.common_tags.insert(tag_key.to_string(), value);
            }
        }
        self
    }

    /// Sets the destination lines are written to.
    ///
    /// See [`Destination`][crate::writer::Destination] for the supported descriptors. Defaults to `udp`.
    #[must_use]
    pub fn with_location<L>(mut self, location: L) -> Self
    where
        L: Into<String>,
    {
        self.location = location.into();
        self
    }

    /// Adds common tags, replacing any existing common tags with the same keys.
    #[must_use]
    pub fn with_common_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.common_tags.extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Adds a single common tag.
    #[must_use]
    pub fn with_common_tag<K, V>(self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.with_common_tags([(key, value)])
    }

    /// Sets the size, in bytes, of the outbound batch used by socket destinations.
    ///
    /// Lines are joined with newlines until the next line would exceed this size, at which point the batch is sent.
    /// A value of `0` or `1` disables batching.
    ///
    /// Defaults to `0`.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Sets how often a partially-filled batch is flushed.
    ///
    /// Only used when batching is enabled. Defaults to 5 seconds.
    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Sets the write timeout for socket destinations.
    ///
    /// Defaults to 100 milliseconds.
    #[must_use]
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Validates the settings and builds the configuration.
    ///
    /// # Errors
    ///
    /// If the destination is not a supported descriptor, if the flush interval or write timeout is zero, or if any
    /// common tag has an empty key, an error is returned.
    pub fn build(self) -> Result<Config, ConfigError> {
        if !is_valid_destination(&self.location) {
            return Err(invalid(format!("unknown output location '{}'", self.location)));
        }
        if self.flush_interval.is_zero() {
            return Err(invalid("flush interval must be greater than zero"));
        }
        if self.write_timeout.is_zero() {
            return Err(invalid("write timeout must be greater than zero"));
        }
        if self.common_tags.keys().any(String::is_empty) {
            return Err(invalid("common tag keys must not be empty"));
        }

        Ok(Config {
            location: self.location,
            common_tags: self.common_tags,
            writer_options: WriterOptions {
                buffer_size: self.buffer_size,
                flush_interval: self.flush_interval,
                write_timeout: self.write_timeout,
            },
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            common_tags: Tags::new(),
            buffer_size: 0,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

fn invalid<R>(reason: R) -> ConfigError
where
    R: Into<String>,
{
    ConfigError::InvalidConfiguration { reason: reason.into() }
}
