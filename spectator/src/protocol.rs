//! SpectatorD line protocol.
//!
//! Every measurement is a single line of the form `<symbol>:<identifier>:<value>`, where the symbol identifies the
//! meter kind (optionally followed by `,<ttl-seconds>` for gauges with an expiry), the identifier is an
//! [`Id::wire_identifier`][crate::Id::wire_identifier], and the value is formatted according to the meter kind.
use std::{fmt::Write as _, time::Duration};

/// Meter kinds understood by SpectatorD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeterKind {
    /// `c`: a counter, sent as a delta.
    Counter,

    /// `C`: a monotonic counter, sent as the current (fractional) total.
    MonotonicCounter,

    /// `U`: a monotonic counter, sent as the current unsigned integer total.
    MonotonicCounterUint,

    /// `g`: a gauge.
    Gauge,

    /// `A`: an age gauge, tracking seconds since an event.
    AgeGauge,

    /// `m`: a gauge reporting the maximum value seen per interval.
    MaxGauge,

    /// `d`: a distribution summary.
    DistributionSummary,

    /// `D`: a distribution summary with percentiles.
    PercentileDistributionSummary,

    /// `t`: a timer.
    Timer,

    /// `T`: a timer with percentiles.
    PercentileTimer,
}

impl MeterKind {
    /// Returns the protocol symbol for this meter kind.
    pub const fn symbol(self) -> &'static str {
        match self {
            MeterKind::Counter => "c",
            MeterKind::MonotonicCounter => "C",
            MeterKind::MonotonicCounterUint => "U",
            MeterKind::Gauge => "g",
            MeterKind::AgeGauge => "A",
            MeterKind::MaxGauge => "m",
            MeterKind::DistributionSummary => "d",
            MeterKind::PercentileDistributionSummary => "D",
            MeterKind::Timer => "t",
            MeterKind::PercentileTimer => "T",
        }
    }
}

/// Builds the symbol for a gauge with the given time-to-live, such as `g,60`.
///
/// SpectatorD keeps reporting the last value of such a gauge until the TTL elapses without an update. The TTL is
/// truncated to whole seconds.
pub fn gauge_ttl_symbol(ttl: Duration) -> String {
    let mut int_writer = itoa::Buffer::new();
    let mut symbol = String::from(MeterKind::Gauge.symbol());
    symbol.push(',');
    symbol.push_str(int_writer.format(ttl.as_secs()));
    symbol
}

/// A measurement value, carrying the formatting rule for its meter kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
    /// A signed integer, formatted without a fractional part.
    Integer(i64),

    /// An unsigned integer, formatted without a fractional part.
    Unsigned(u64),

    /// A floating-point value, formatted in fixed-point notation with six fractional digits.
    Fixed(f64),
}

impl MetricValue {
    fn write_to(self, buf: &mut String) {
        match self {
            MetricValue::Integer(v) => buf.push_str(itoa::Buffer::new().format(v)),
            MetricValue::Unsigned(v) => buf.push_str(itoa::Buffer::new().format(v)),
            MetricValue::Fixed(v) => {
                // Writing into a `String` cannot fail.
                let _ = write!(buf, "{v:.6}");
            }
        }
    }
}

/// Encodes a single protocol line.
///
/// Value suppression rules (for example, counters ignoring non-positive deltas) belong to the meters; this function
/// always produces a line.
pub fn encode_line(symbol: &str, wire_identifier: &str, value: MetricValue) -> String {
    let mut line = String::with_capacity(symbol.len() + wire_identifier.len() + 24);
    line.push_str(symbol);
    line.push(':');
    line.push_str(wire_identifier);
    line.push(':');
    value.write_to(&mut line);
    line
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{encode_line, gauge_ttl_symbol, MeterKind, MetricValue};

    #[test]
    fn symbols() {
        let cases = [
            (MeterKind::Counter, "c"),
            (MeterKind::MonotonicCounter, "C"),
            (MeterKind::MonotonicCounterUint, "U"),
            (MeterKind::Gauge, "g"),
            (MeterKind::AgeGauge, "A"),
            (MeterKind::MaxGauge, "m"),
            (MeterKind::DistributionSummary, "d"),
            (MeterKind::PercentileDistributionSummary, "D"),
            (MeterKind::Timer, "t"),
            (MeterKind::PercentileTimer, "T"),
        ];

        for (kind, expected) in cases {
            assert_eq!(kind.symbol(), expected);
        }
    }

    #[test]
    fn encode() {
        // Cases are defined as: symbol, identifier, value, expected output.
        let cases = [
            ("c", "test_counter", MetricValue::Integer(5), "c:test_counter:5"),
            ("c", "test_counter", MetricValue::Fixed(2.5), "c:test_counter:2.500000"),
            ("g", "test_gauge", MetricValue::Fixed(100.0), "g:test_gauge:100.000000"),
            ("g", "test_gauge", MetricValue::Fixed(-3.25), "g:test_gauge:-3.250000"),
            ("U", "test_uint", MetricValue::Unsigned(u64::MAX), "U:test_uint:18446744073709551615"),
            ("A", "test_age", MetricValue::Integer(-7), "A:test_age:-7"),
            ("t", "test_timer,k=v", MetricValue::Fixed(0.1), "t:test_timer,k=v:0.100000"),
            ("d", "test_dist", MetricValue::Integer(0), "d:test_dist:0"),
        ];

        for (symbol, identifier, value, expected) in cases {
            assert_eq!(encode_line(symbol, identifier, value), expected);
        }
    }

    #[test]
    fn fixed_point_rounds_to_six_digits() {
        assert_eq!(encode_line("m", "x", MetricValue::Fixed(1.000_000_4)), "m:x:1.000000");
        assert_eq!(encode_line("m", "x", MetricValue::Fixed(1e-7)), "m:x:0.000000");
        assert_eq!(encode_line("m", "x", MetricValue::Fixed(123_456_789.0)), "m:x:123456789.000000");
    }

    #[test]
    fn gauge_ttl() {
        assert_eq!(gauge_ttl_symbol(Duration::from_secs(60)), "g,60");
        assert_eq!(gauge_ttl_symbol(Duration::from_millis(1500)), "g,1");
        assert_eq!(
            encode_line(&gauge_ttl_symbol(Duration::from_secs(60)), "test_gauge_ttl", MetricValue::Fixed(100.1)),
            "g,60:test_gauge_ttl:100.100000"
        );
    }
}
