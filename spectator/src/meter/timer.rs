use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use super::Emitter;
use crate::{
    protocol::{MeterKind, MetricValue},
    writer::Writer,
    Id,
};

macro_rules! timer {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        meter!($(#[$meta])* $name, "a timer");

        impl $name {
            /// Records a duration.
            pub fn record(&self, duration: Duration) {
                self.record_seconds(duration.as_secs_f64());
            }

            /// Records a duration given in fractional seconds.
            ///
            /// Negative durations are ignored.
            pub fn record_seconds(&self, seconds: f64) {
                if seconds >= 0.0 {
                    self.emitter.emit($kind.symbol(), MetricValue::Fixed(seconds));
                }
            }

            /// Runs `f`, records how long it took, and returns its result.
            pub fn time<F, T>(&self, f: F) -> T
            where
                F: FnOnce() -> T,
            {
                let start = Instant::now();
                let result = f();
                self.record(start.elapsed());
                result
            }
        }
    };
}

timer!(
    /// A timer, tracking the count, total time, and max of recorded durations.
    Timer,
    MeterKind::Timer
);

timer!(
    /// A [`Timer`] that also tracks percentiles.
    PercentileTimer,
    MeterKind::PercentileTimer
);
