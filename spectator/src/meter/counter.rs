use std::sync::Arc;

use super::Emitter;
use crate::{
    protocol::{MeterKind, MetricValue},
    writer::Writer,
    Id,
};

meter!(
    /// A counter, reported to SpectatorD as a rate of change.
    ///
    /// Only positive deltas are reported; zero and negative deltas are silently ignored.
    Counter,
    "a counter"
);

impl Counter {
    /// Increments the counter by one.
    pub fn increment(&self) {
        self.emitter.emit(MeterKind::Counter.symbol(), MetricValue::Integer(1));
    }

    /// Increments the counter by `delta`.
    pub fn add(&self, delta: i64) {
        if delta > 0 {
            self.emitter.emit(MeterKind::Counter.symbol(), MetricValue::Integer(delta));
        }
    }

    /// Increments the counter by a fractional `delta`.
    pub fn add_f64(&self, delta: f64) {
        if delta > 0.0 {
            self.emitter.emit(MeterKind::Counter.symbol(), MetricValue::Fixed(delta));
        }
    }
}

meter!(
    /// A counter whose current total is tracked outside of the application, such as the number of bytes received by a
    /// network interface.
    ///
    /// SpectatorD computes the rate of change between reported totals.
    MonotonicCounter,
    "a monotonic counter"
);

impl MonotonicCounter {
    /// Reports the current total.
    pub fn set(&self, amount: f64) {
        self.emitter.emit(MeterKind::MonotonicCounter.symbol(), MetricValue::Fixed(amount));
    }
}

meter!(
    /// A [`MonotonicCounter`] whose total is an unsigned integer.
    MonotonicCounterUint,
    "a monotonic counter"
);

impl MonotonicCounterUint {
    /// Reports the current total.
    pub fn set(&self, amount: u64) {
        self.emitter.emit(MeterKind::MonotonicCounterUint.symbol(), MetricValue::Unsigned(amount));
    }
}

#[cfg(test)]
mod tests {
    use super::{Counter, MonotonicCounter, MonotonicCounterUint};
    use crate::{meter::test_util::memory_writer, Id};

    #[test]
    fn counter_increment() {
        let (memory, writer) = memory_writer();
        let counter = Counter::new(Id::from_name("test"), writer);

        counter.increment();
        assert_eq!(memory.last_line().as_deref(), Some("c:test:1"));
    }

    #[test]
    fn counter_add() {
        let (memory, writer) = memory_writer();
        let counter = Counter::new(Id::new("test", [("k", "v")]), writer);

        counter.add(55);
        assert_eq!(memory.last_line().as_deref(), Some("c:test,k=v:55"));

        counter.add_f64(42.1);
        assert_eq!(memory.last_line().as_deref(), Some("c:test,k=v:42.100000"));
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn counter_ignores_non_positive_deltas() {
        let (memory, writer) = memory_writer();
        let counter = Counter::new(Id::from_name("test"), writer);

        counter.add(0);
        counter.add(-5);
        counter.add_f64(0.0);
        counter.add_f64(-1.5);
        counter.add_f64(f64::NAN);
        assert!(memory.is_empty());

        counter.add(5);
        assert_eq!(memory.lines(), vec!["c:test:5".to_string()]);
    }

    #[test]
    fn clones_share_writer() {
        let (memory, writer) = memory_writer();
        let counter = Counter::new(Id::from_name("shared"), writer);
        let clone = counter.clone();

        counter.increment();
        clone.increment();

        assert_eq!(clone.id(), counter.id());
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn monotonic_counters() {
        let (memory, writer) = memory_writer();

        MonotonicCounter::new(Id::from_name("mono"), writer.clone()).set(1.0);
        assert_eq!(memory.last_line().as_deref(), Some("C:mono:1.000000"));

        MonotonicCounterUint::new(Id::from_name("mono_uint"), writer).set(u64::MAX);
        assert_eq!(memory.last_line().as_deref(), Some("U:mono_uint:18446744073709551615"));
    }
}
