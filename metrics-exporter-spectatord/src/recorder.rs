use std::sync::Arc;

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::Registry;

use crate::storage::ForwardingStorage;

/// A recorder that forwards metrics to SpectatorD.
///
/// Every update is sent as soon as it is made: SpectatorD does the aggregating.
pub struct SpectatordRecorder {
    handles: Registry<Key, ForwardingStorage>,
    registry: Arc<spectator::Registry>,
}

impl SpectatordRecorder {
    pub(crate) fn new(registry: Arc<spectator::Registry>) -> Self {
        let handles = Registry::new(ForwardingStorage::new(Arc::clone(&registry)));
        SpectatordRecorder { handles, registry }
    }

    /// Returns the spectator registry that meters are created from.
    ///
    /// This can be used to record SpectatorD-specific meter types, such as percentile timers, alongside the `metrics`
    /// macros, or to [`close`][spectator::Registry::close] the registry on shutdown.
    pub fn registry(&self) -> &Arc<spectator::Registry> {
        &self.registry
    }
}

impl Recorder for SpectatordRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        self.handles.get_or_create_counter(key, |existing| Counter::from_arc(Arc::clone(existing)))
    }

    fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
        self.handles.get_or_create_gauge(key, |existing| Gauge::from_arc(Arc::clone(existing)))
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        self.handles.get_or_create_histogram(key, |existing| Histogram::from_arc(Arc::clone(existing)))
    }
}
