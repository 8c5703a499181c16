//! Meter registry.
use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use thiserror::Error;
use tracing::{debug, error};

use crate::{
    config::{Config, ConfigBuilder, ConfigError},
    id::Tags,
    meter::{
        AgeGauge, Counter, DistributionSummary, Gauge, MaxGauge, MonotonicCounter, MonotonicCounterUint,
        PercentileDistributionSummary, PercentileTimer, Timer,
    },
    writer::{new_writer_with_options, Writer, WriterError},
    Id,
};

/// Errors that could occur while creating a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The writer for the configured destination could not be created.
    #[error("failed to create writer: {0}")]
    Writer(#[from] WriterError),
}

/// Meters of a single kind, keyed by identity.
struct MeterCache<K, M> {
    meters: RwLock<HashMap<K, M>>,
}

impl<K, M> MeterCache<K, M>
where
    K: Eq + Hash,
    M: Clone,
{
    fn get_or_insert<F>(&self, key: K, create: F) -> M
    where
        F: FnOnce(&K) -> M,
    {
        if let Some(meter) = self.meters.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return meter.clone();
        }

        let mut meters = self.meters.write().unwrap_or_else(PoisonError::into_inner);
        meters.entry(key).or_insert_with_key(create).clone()
    }

    fn len(&self) -> usize {
        self.meters.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<K, M> Default for MeterCache<K, M> {
    fn default() -> Self {
        Self { meters: RwLock::new(HashMap::new()) }
    }
}

macro_rules! meter_methods {
    ($(($name:ident, $with_id:ident, $meter:ident, $cache:ident, $desc:literal)),+ $(,)?) => {
        $(
            #[doc = concat!("Returns the ", $desc, " for `name` and `tags`, with common tags applied.")]
            pub fn $name<N, I, K, V>(&self, name: N, tags: I) -> $meter
            where
                N: Into<String>,
                I: IntoIterator<Item = (K, V)>,
                K: Into<String>,
                V: Into<String>,
            {
                self.$with_id(self.new_id(name, tags))
            }

            #[doc = concat!("Returns the ", $desc, " for `id`.")]
            ///
            /// The identity is used as given; common tags are not applied.
            pub fn $with_id(&self, id: Id) -> $meter {
                let writer = &self.writer;
                self.meters.$cache.get_or_insert(id, |id| $meter::new(id.clone(), Arc::clone(writer)))
            }
        )+
    };
}

/// Caches of every meter kind.
#[derive(Default)]
struct Meters {
    counters: MeterCache<Id, Counter>,
    monotonic_counters: MeterCache<Id, MonotonicCounter>,
    monotonic_counters_uint: MeterCache<Id, MonotonicCounterUint>,
    gauges: MeterCache<Id, Gauge>,
    gauges_with_ttl: MeterCache<(Id, Duration), Gauge>,
    age_gauges: MeterCache<Id, AgeGauge>,
    max_gauges: MeterCache<Id, MaxGauge>,
    distribution_summaries: MeterCache<Id, DistributionSummary>,
    percentile_distribution_summaries: MeterCache<Id, PercentileDistributionSummary>,
    timers: MeterCache<Id, Timer>,
    percentile_timers: MeterCache<Id, PercentileTimer>,
}

impl Meters {
    fn len(&self) -> usize {
        self.counters.len()
            + self.monotonic_counters.len()
            + self.monotonic_counters_uint.len()
            + self.gauges.len()
            + self.gauges_with_ttl.len()
            + self.age_gauges.len()
            + self.max_gauges.len()
            + self.distribution_summaries.len()
            + self.percentile_distribution_summaries.len()
            + self.timers.len()
            + self.percentile_timers.len()
    }
}

/// Creates meters that write to a single shared [`Writer`].
///
/// Meters are cached by kind and identity: asking twice for the same kind, name, and tags returns handles to the same
/// meter. Common tags from the [`Config`] are merged into the tags of every meter created by name, with the caller's
/// tags taking precedence.
///
/// `Registry` is safe to share between threads.
pub struct Registry {
    config: Config,
    writer: Arc<dyn Writer>,
    meters: Meters,
}

impl Registry {
    /// Creates a registry writing to the destination named in `config`.
    ///
    /// # Errors
    ///
    /// If the writer for the configured destination cannot be created, an error is returned.
    pub fn new(config: Config) -> Result<Self, RegistryError> {
        let writer = new_writer_with_options(config.location(), config.writer_options())?;
        debug!(location = config.location(), "Created registry.");
        Ok(Self::with_writer(config, Arc::from(writer)))
    }

    /// Creates a registry configured from the process environment.
    ///
    /// # Errors
    ///
    /// If the environment holds an invalid configuration, or the writer for the configured destination cannot be
    /// created, an error is returned.
    pub fn from_env() -> Result<Self, RegistryError> {
        let config = ConfigBuilder::from_env().build()?;
        Self::new(config)
    }

    /// Creates a registry writing to `writer`, ignoring the destination named in `config`.
    ///
    /// Mostly useful in tests, paired with a [`MemoryWriter`][crate::writer::MemoryWriter].
    pub fn with_writer(config: Config, writer: Arc<dyn Writer>) -> Self {
        Self { config, writer, meters: Meters::default() }
    }

    /// Configuration of this registry.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Writer shared by every meter of this registry.
    pub fn writer(&self) -> &Arc<dyn Writer> {
        &self.writer
    }

    /// Number of distinct meters created so far.
    pub fn meter_count(&self) -> usize {
        self.meters.len()
    }

    /// Builds an identity from `name` and `tags`, with common tags applied.
    ///
    /// Tags given here replace common tags with the same key.
    pub fn new_id<N, I, K, V>(&self, name: N, tags: I) -> Id
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged: Tags = self.config.common_tags().clone();
        merged.extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        Id::new(name, merged)
    }

    meter_methods!(
        (counter, counter_with_id, Counter, counters, "counter"),
        (monotonic_counter, monotonic_counter_with_id, MonotonicCounter, monotonic_counters, "monotonic counter"),
        (
            monotonic_counter_uint,
            monotonic_counter_uint_with_id,
            MonotonicCounterUint,
            monotonic_counters_uint,
            "unsigned monotonic counter"
        ),
        (gauge, gauge_with_id, Gauge, gauges, "gauge"),
        (age_gauge, age_gauge_with_id, AgeGauge, age_gauges, "age gauge"),
        (max_gauge, max_gauge_with_id, MaxGauge, max_gauges, "max gauge"),
        (
            distribution_summary,
            distribution_summary_with_id,
            DistributionSummary,
            distribution_summaries,
            "distribution summary"
        ),
        (
            percentile_distribution_summary,
            percentile_distribution_summary_with_id,
            PercentileDistributionSummary,
            percentile_distribution_summaries,
            "percentile distribution summary"
        ),
        (timer, timer_with_id, Timer, timers, "timer"),
        (percentile_timer, percentile_timer_with_id, PercentileTimer, percentile_timers, "percentile timer"),
    );

    /// Returns the gauge for `name` and `tags` that SpectatorD expires `ttl` after its last update.
    pub fn gauge_with_ttl<N, I, K, V>(&self, name: N, tags: I, ttl: Duration) -> Gauge
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.gauge_with_id_and_ttl(self.new_id(name, tags), ttl)
    }

    /// Returns the gauge for `id` that SpectatorD expires `ttl` after its last update.
    pub fn gauge_with_id_and_ttl(&self, id: Id, ttl: Duration) -> Gauge {
        let writer = &self.writer;
        self.meters
            .gauges_with_ttl
            .get_or_insert((id, ttl), |(id, ttl)| Gauge::with_ttl(id.clone(), Arc::clone(writer), *ttl))
    }

    /// Closes the underlying writer, flushing any buffered lines.
    ///
    /// Failures are logged rather than returned. Meters created by this registry keep working after the registry is
    /// closed, but everything they write is dropped.
    pub fn close(&self) {
        if let Err(e) = self.writer.close() {
            error!(error = %e, "Failed to close writer.");
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("config", &self.config).field("meters", &self.meter_count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::Registry;
    use crate::{
        id::Tags,
        writer::{MemoryWriter, Writer},
        Config, Id,
    };

    fn registry_with(config: Config) -> (Arc<MemoryWriter>, Registry) {
        let memory = Arc::new(MemoryWriter::new());
        let writer: Arc<dyn Writer> = memory.clone();
        (memory, Registry::with_writer(config, writer))
    }

    #[test]
    fn same_identity_returns_same_meter() {
        let (memory, registry) = registry_with(Config::default());

        let a = registry.counter("requests", [("status", "200"), ("method", "GET")]);
        let b = registry.counter("requests", [("method", "GET"), ("status", "200")]);
        let c = registry.counter("requests", [("status", "500")]);

        assert_eq!(a.id(), b.id());
        assert!(std::ptr::eq(a.id(), b.id()));
        assert_ne!(a.id(), c.id());
        assert_eq!(registry.meter_count(), 2);

        a.increment();
        b.increment();
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn caches_are_per_kind() {
        let (_, registry) = registry_with(Config::default());

        let _ = registry.counter("name", Tags::new());
        let _ = registry.gauge("name", Tags::new());
        let _ = registry.timer("name", Tags::new());
        let _ = registry.gauge_with_ttl("name", Tags::new(), Duration::from_secs(60));
        let _ = registry.gauge_with_ttl("name", Tags::new(), Duration::from_secs(30));
        assert_eq!(registry.meter_count(), 5);
    }

    #[test]
    fn common_tags_merge_under_caller_tags() {
        let config = Config::builder()
            .with_location("none")
            .with_common_tags([("nf.app", "app"), ("env", "prod")])
            .build()
            .unwrap();
        let (memory, registry) = registry_with(config);

        let gauge = registry.gauge("g", [("env", "test")]);
        assert_eq!(gauge.id().tags().get("nf.app").map(String::as_str), Some("app"));
        assert_eq!(gauge.id().tags().get("env").map(String::as_str), Some("test"));

        let id = registry.new_id("g", [("env", "test")]);
        assert_eq!(&id, gauge.id());

        gauge.set(1.0);
        let line = memory.last_line().unwrap();
        assert!(line.starts_with("g:g,"));
        assert!(line.contains("nf.app=app"));
        assert!(line.contains("env=test"));
        assert!(line.ends_with(":1.000000"));
    }

    #[test]
    fn with_id_ignores_common_tags() {
        let config = Config::builder().with_common_tag("nf.app", "app").build().unwrap();
        let (memory, registry) = registry_with(config);

        registry.counter_with_id(Id::from_name("bare")).increment();
        assert_eq!(memory.last_line().as_deref(), Some("c:bare:1"));
    }

    #[test]
    fn caller_tags_accept_borrowed_maps() {
        let (memory, registry) = registry_with(Config::default());

        let mut tags = Tags::new();
        tags.insert("k".to_string(), "v".to_string());
        registry.max_gauge("m", &tags).set(2.0);

        assert_eq!(memory.last_line().as_deref(), Some("m:m,k=v:2.000000"));
    }

    #[test]
    fn concurrent_requests_share_one_meter() {
        let registry = Arc::new(registry_with(Config::default()).1);

        let handles = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.timer("shared", [("k", "v")]).id().internal_key().to_string())
            })
            .collect::<Vec<_>>();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "shared|k|v");
        }
        assert_eq!(registry.meter_count(), 1);
    }

    #[test]
    fn new_builds_writer_from_config() {
        let config = Config::builder().with_location("memory").build().unwrap();
        let registry = Registry::new(config).expect("memory registry should build");
        registry.counter("c", Tags::new()).increment();
        registry.close();
        registry.close();
    }

    #[test]
    fn new_reports_writer_errors() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let location = format!("file://{}", blocker.join("out.txt").display());
        let config = Config::builder().with_location(location).build().unwrap();
        assert!(Registry::new(config).is_err());
    }
}
