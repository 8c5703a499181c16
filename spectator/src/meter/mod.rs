//! Meters.
//!
//! Meters are thin handles that encode each update as a protocol line and hand it to a shared [`Writer`]. They hold
//! no measurement state of their own: aggregation happens inside SpectatorD. Every meter is cheap to clone, and clones
//! write through the same writer.
//!
//! Meters are normally obtained from a [`Registry`][crate::Registry], which applies common tags and caches one meter
//! per identity, but they can also be constructed directly from an [`Id`] and a writer.
use std::{fmt, sync::Arc};

use crate::{
    protocol::{encode_line, MetricValue},
    writer::Writer,
    Id,
};

/// Defines a meter handle type: an [`Emitter`] plus the constructor and identity accessor shared by every meter.
macro_rules! meter {
    ($(#[$meta:meta])* $name:ident, $noun:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            emitter: Emitter,
        }

        impl $name {
            #[doc = concat!("Creates ", $noun, " writing to `writer`.")]
            pub fn new(id: Id, writer: Arc<dyn Writer>) -> Self {
                Self { emitter: Emitter::new(id, writer) }
            }

            /// Identity of this meter.
            pub fn id(&self) -> &Id {
                &self.emitter.id
            }
        }
    };
}

mod counter;
pub use self::counter::{Counter, MonotonicCounter, MonotonicCounterUint};

mod distribution;
pub use self::distribution::{DistributionSummary, PercentileDistributionSummary};

mod gauge;
pub use self::gauge::{AgeGauge, Gauge, MaxGauge};

mod timer;
pub use self::timer::{PercentileTimer, Timer};

/// Identity and destination shared by every meter type.
#[derive(Clone)]
struct Emitter {
    id: Arc<Id>,
    writer: Arc<dyn Writer>,
}

impl Emitter {
    fn new(id: Id, writer: Arc<dyn Writer>) -> Self {
        Self { id: Arc::new(id), writer }
    }

    fn emit(&self, symbol: &str, value: MetricValue) {
        let line = encode_line(symbol, self.id.wire_identifier(), value);
        self.writer.write(&line);
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use crate::writer::{MemoryWriter, Writer};

    pub fn memory_writer() -> (Arc<MemoryWriter>, Arc<dyn Writer>) {
        let memory = Arc::new(MemoryWriter::new());
        let writer: Arc<dyn Writer> = memory.clone();
        (memory, writer)
    }
}
