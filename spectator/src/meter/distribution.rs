use std::sync::Arc;

use super::Emitter;
use crate::{
    protocol::{MeterKind, MetricValue},
    writer::Writer,
    Id,
};

macro_rules! distribution_summary {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        meter!($(#[$meta])* $name, "a distribution summary");

        impl $name {
            /// Records a single sample.
            ///
            /// Negative samples are ignored.
            pub fn record(&self, amount: i64) {
                if amount >= 0 {
                    self.emitter.emit($kind.symbol(), MetricValue::Integer(amount));
                }
            }
        }
    };
}

distribution_summary!(
    /// A distribution summary, tracking the count, total, and max of recorded samples such as request sizes.
    DistributionSummary,
    MeterKind::DistributionSummary
);

distribution_summary!(
    /// A [`DistributionSummary`] that also tracks percentiles.
    ///
    /// Percentiles are computed by SpectatorD and come at a higher cost in the backend, so they should be reserved for
    /// metrics that need them.
    PercentileDistributionSummary,
    MeterKind::PercentileDistributionSummary
);
