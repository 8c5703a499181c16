use std::sync::{Arc, Mutex, PoisonError};

use metrics::{CounterFn, GaugeFn, HistogramFn, Key};
use metrics_util::registry::Storage;
use spectator::{Counter, DistributionSummary, Gauge, Id, MonotonicCounterUint, Registry};

/// Converts a `metrics` key into an identity, with the registry's common tags applied.
pub(crate) fn key_to_id(registry: &Registry, key: &Key) -> Id {
    registry.new_id(key.name(), key.labels().map(|label| (label.key(), label.value())))
}

/// A counter that forwards every update to SpectatorD.
///
/// Increments are sent as counter deltas, while absolute values are sent as unsigned monotonic counter totals.
pub(crate) struct ForwardingCounter {
    delta: Counter,
    total: MonotonicCounterUint,
}

impl CounterFn for ForwardingCounter {
    fn increment(&self, value: u64) {
        self.delta.add(i64::try_from(value).unwrap_or(i64::MAX));
    }

    fn absolute(&self, value: u64) {
        self.total.set(value);
    }
}

/// A gauge that forwards every update to SpectatorD.
///
/// SpectatorD gauges can only be set, so the current value is tracked locally to support relative updates, and the
/// resulting value is sent after each one.
pub(crate) struct ForwardingGauge {
    gauge: Gauge,
    // Held while sending, so the last line written always carries the latest value.
    value: Mutex<f64>,
}

impl ForwardingGauge {
    fn new(gauge: Gauge) -> Self {
        Self { gauge, value: Mutex::new(0.0) }
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(f64) -> f64,
    {
        let mut value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        *value = f(*value);
        self.gauge.set(*value);
    }
}

impl GaugeFn for ForwardingGauge {
    fn increment(&self, value: f64) {
        self.update(|current| current + value);
    }

    fn decrement(&self, value: f64) {
        self.update(|current| current - value);
    }

    fn set(&self, value: f64) {
        self.update(|_| value);
    }
}

/// A histogram that forwards every sample to SpectatorD as a distribution summary.
///
/// Samples are rounded to the nearest integer. Negative and non-finite samples are ignored.
pub(crate) struct ForwardingHistogram {
    summary: DistributionSummary,
}

impl HistogramFn for ForwardingHistogram {
    fn record(&self, value: f64) {
        if value.is_finite() {
            self.summary.record(value.round() as i64);
        }
    }
}

/// Storage that creates SpectatorD-backed handles from a spectator [`Registry`].
pub(crate) struct ForwardingStorage {
    registry: Arc<Registry>,
}

impl ForwardingStorage {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

impl Storage<Key> for ForwardingStorage {
    type Counter = Arc<ForwardingCounter>;
    type Gauge = Arc<ForwardingGauge>;
    type Histogram = Arc<ForwardingHistogram>;

    fn counter(&self, key: &Key) -> Self::Counter {
        let id = key_to_id(&self.registry, key);
        Arc::new(ForwardingCounter {
            delta: self.registry.counter_with_id(id.clone()),
            total: self.registry.monotonic_counter_uint_with_id(id),
        })
    }

    fn gauge(&self, key: &Key) -> Self::Gauge {
        let id = key_to_id(&self.registry, key);
        Arc::new(ForwardingGauge::new(self.registry.gauge_with_id(id)))
    }

    fn histogram(&self, key: &Key) -> Self::Histogram {
        let id = key_to_id(&self.registry, key);
        Arc::new(ForwardingHistogram { summary: self.registry.distribution_summary_with_id(id) })
    }
}
