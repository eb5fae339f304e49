use std::sync::{Arc, OnceLock};
use std::time::Duration;

use num_traits::AsPrimitive;

use crate::{DimensionContext, InstrumentName, Magnitude, ViewCore};

/// A named, immutable slot into which numeric measurements are recorded.
///
/// Instruments are created once at startup via
/// [`MetricsRegistry::new_instrument()`][1] and live for the lifetime of the
/// registry - there is no deletion. Identity is the name; creating two
/// instruments with the same name in one registry is a configuration error.
///
/// Measurements flow through the view registered for the instrument. Until a
/// view is registered, recording is a silent no-op: observability must never
/// fail or block the call or container operation that triggered it.
///
/// [1]: crate::MetricsRegistry::new_instrument
#[derive(Debug)]
pub struct Instrument {
    name: InstrumentName,
    description: InstrumentName,
    unit: InstrumentName,

    /// Attached when a view is registered for this instrument; write-once.
    view: OnceLock<Arc<ViewCore>>,
}

impl Instrument {
    pub(crate) fn new(
        name: InstrumentName,
        description: InstrumentName,
        unit: InstrumentName,
    ) -> Self {
        Self {
            name,
            description,
            unit,
            view: OnceLock::new(),
        }
    }

    /// The unique, stable name of the instrument.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A human-readable description of what the instrument measures.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The unit of recorded magnitudes, or the empty string for plain counts.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Whether a view has been registered for this instrument.
    #[must_use]
    pub(crate) fn has_view(&self) -> bool {
        self.view.get().is_some()
    }

    /// Attaches the registered view. Fails if a view is already attached.
    pub(crate) fn attach_view(&self, view: Arc<ViewCore>) -> bool {
        self.view.set(view).is_ok()
    }

    /// Records a single measurement with the given magnitude and dimensional context.
    ///
    /// Non-blocking and safe to call from any number of threads. A no-op if no
    /// view has been registered for this instrument.
    #[inline]
    pub fn record(&self, context: &DimensionContext, magnitude: impl AsPrimitive<Magnitude>) {
        if let Some(view) = self.view.get() {
            view.record(context, magnitude.as_());
        }
    }

    /// Records a duration as whole milliseconds, truncating fractional milliseconds.
    ///
    /// Durations beyond the `i64` millisecond range are not guaranteed to be
    /// correctly represented.
    #[inline]
    pub fn record_millis(&self, context: &DimensionContext, duration: Duration) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "intentional - typical durations are far inside the safe range"
        )]
        let millis = duration.as_millis() as Magnitude;

        self.record(context, millis);
    }
}
