use std::{borrow::Cow, sync::Arc, time::Duration};

use super::Emitter;
use crate::{
    protocol::{gauge_ttl_symbol, MeterKind, MetricValue},
    writer::Writer,
    Id,
};

/// A gauge, reporting the last value set.
///
/// SpectatorD reports the last value of a gauge until it expires. Gauges created with a TTL use that TTL as their
/// expiry; the rest use the daemon's default.
///
/// Unlike the other meters, a gauge also carries its symbol, which includes the TTL when one is set.
#[derive(Clone, Debug)]
pub struct Gauge {
    emitter: Emitter,
    symbol: Cow<'static, str>,
    ttl: Option<Duration>,
}

impl Gauge {
    /// Creates a gauge writing to `writer`.
    pub fn new(id: Id, writer: Arc<dyn Writer>) -> Self {
        Self { emitter: Emitter::new(id, writer), symbol: Cow::Borrowed(MeterKind::Gauge.symbol()), ttl: None }
    }

    /// Creates a gauge that SpectatorD expires `ttl` after its last update.
    ///
    /// The TTL is sent in whole seconds.
    pub fn with_ttl(id: Id, writer: Arc<dyn Writer>, ttl: Duration) -> Self {
        Self { emitter: Emitter::new(id, writer), symbol: Cow::Owned(gauge_ttl_symbol(ttl)), ttl: Some(ttl) }
    }

    /// Identity of this gauge.
    pub fn id(&self) -> &Id {
        &self.emitter.id
    }

    /// Time-to-live of this gauge, if one was configured.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Sets the gauge.
    pub fn set(&self, value: f64) {
        self.emitter.emit(&self.symbol, MetricValue::Fixed(value));
    }
}

meter!(
    /// A gauge reporting the number of seconds since an event, such as the last successful run of a job.
    AgeGauge,
    "an age gauge"
);

impl AgeGauge {
    /// Sets the time of the event, in seconds since the Unix epoch.
    pub fn set(&self, seconds_since_epoch: i64) {
        self.emitter.emit(MeterKind::AgeGauge.symbol(), MetricValue::Integer(seconds_since_epoch));
    }

    /// Marks the event as having happened now.
    ///
    /// SpectatorD interprets a value of `0` as the current time.
    pub fn now(&self) {
        self.set(0);
    }
}

meter!(
    /// A gauge reporting the maximum value set during each reporting interval.
    MaxGauge,
    "a max gauge"
);

impl MaxGauge {
    /// Updates the gauge; SpectatorD keeps the maximum.
    pub fn set(&self, value: f64) {
        self.emitter.emit(MeterKind::MaxGauge.symbol(), MetricValue::Fixed(value));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{AgeGauge, Gauge, MaxGauge};
    use crate::{meter::test_util::memory_writer, Id};

    #[test]
    fn gauge_set() {
        let (memory, writer) = memory_writer();
        let gauge = Gauge::new(Id::from_name("test"), writer);
        assert_eq!(gauge.ttl(), None);

        gauge.set(100.0);
        assert_eq!(memory.last_line().as_deref(), Some("g:test:100.000000"));

        // Negative values are reported as-is.
        gauge.set(-1.5);
        assert_eq!(memory.last_line().as_deref(), Some("g:test:-1.500000"));
    }

    #[test]
    fn gauge_with_ttl() {
        let (memory, writer) = memory_writer();
        let gauge = Gauge::with_ttl(Id::from_name("test"), writer, Duration::from_secs(60));
        assert_eq!(gauge.ttl(), Some(Duration::from_secs(60)));

        gauge.set(100.1);
        assert_eq!(memory.last_line().as_deref(), Some("g,60:test:100.100000"));
    }

    #[test]
    fn age_gauge() {
        let (memory, writer) = memory_writer();
        let gauge = AgeGauge::new(Id::from_name("age"), writer);

        gauge.set(1_700_000_000);
        assert_eq!(memory.last_line().as_deref(), Some("A:age:1700000000"));

        gauge.now();
        assert_eq!(memory.last_line().as_deref(), Some("A:age:0"));
    }

    #[test]
    fn max_gauge() {
        let (memory, writer) = memory_writer();
        let gauge = MaxGauge::new(Id::new("max", [("region", "us-east-1")]), writer);

        gauge.set(200.0);
        assert_eq!(memory.last_line().as_deref(), Some("m:max,region=us-east-1:200.000000"));
    }
}
