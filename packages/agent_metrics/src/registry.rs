use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use foldhash::{HashMap, HashMapExt};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    AggregateReport, Error, Instrument, InstrumentName, Result, ViewCore, ViewSpec,
};

/// The process-wide instrument and view registry, doubling as the aggregation engine.
///
/// A registry is constructed explicitly at startup and injected into the recorder
/// components, rather than living in ambient global state - multiple registries can
/// coexist, which keeps tests independent of each other. Instruments and views are
/// created once during startup and are immutable afterwards; recording needs no
/// lock to reach them because recorders hold direct instrument references.
///
/// All methods take `&self`; wrap the registry in an [`Arc`] to share it between
/// the startup wiring and an export collaborator.
pub struct MetricsRegistry {
    instruments: Mutex<HashMap<InstrumentName, Arc<Instrument>>>,
    views: Mutex<HashMap<InstrumentName, Arc<ViewCore>>>,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            instruments: Mutex::new(HashMap::new()),
            views: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a new instrument with the given stable name.
    ///
    /// Instruments are permanent: there is no deletion, and the name may never be
    /// reused within the same registry. Returns [`Error::DuplicateInstrument`] on a
    /// name collision; this is a startup configuration error and the host should
    /// treat it as fatal.
    pub fn new_instrument(
        &self,
        name: impl Into<InstrumentName>,
        description: impl Into<InstrumentName>,
        unit: impl Into<InstrumentName>,
    ) -> Result<Arc<Instrument>> {
        let name = name.into();

        let mut instruments = self.instruments.lock();

        if instruments.contains_key(&name) {
            return Err(Error::DuplicateInstrument {
                name: name.into_owned(),
            });
        }

        let instrument = Arc::new(Instrument::new(
            name.clone(),
            description.into(),
            unit.into(),
        ));

        instruments.insert(name, Arc::clone(&instrument));

        debug!(name = instrument.name(), "created instrument");

        Ok(instrument)
    }

    /// Registers a batch of views with the aggregation engine, atomically.
    ///
    /// The whole batch is validated before anything is inserted: if any view name
    /// collides with an already registered view, or two views within the batch share
    /// a name, nothing at all is registered and [`Error::DuplicateView`] is returned.
    /// Like instrument creation, this failing is a startup configuration error.
    ///
    /// Once registered, the instruments of the batch start routing their recorded
    /// measurements into the new views.
    pub fn register_views(&self, specs: Vec<ViewSpec>) -> Result<()> {
        let mut views = self.views.lock();

        for (index, spec) in specs.iter().enumerate() {
            let name = spec.instrument.name();

            let duplicate_in_batch = specs
                .iter()
                .take(index)
                .any(|earlier| earlier.instrument.name() == name);

            if views.contains_key(name) || duplicate_in_batch || spec.instrument.has_view() {
                return Err(Error::DuplicateView {
                    name: name.to_string(),
                });
            }
        }

        for spec in specs {
            let core = Arc::new(ViewCore::new(&spec));

            // Validated above; the instrument cannot have gained a view in between
            // because attachment only happens while the views lock is held.
            let attached = spec.instrument.attach_view(Arc::clone(&core));
            debug_assert!(attached, "view attachment was validated before insertion");

            debug!(name = core.name(), "registered view");

            views.insert(core.name().to_string().into(), core);
        }

        Ok(())
    }

    /// Collects a point-in-time report of every registered view.
    ///
    /// The report is read-only and detached: recording that happens after collection
    /// is not reflected in it. Views appear in name order.
    #[must_use]
    pub fn collect(&self) -> AggregateReport {
        let views = self.views.lock();

        let mut collected = views
            .values()
            .map(|core| core.collect())
            .collect::<Vec<_>>();

        collected.sort_by(|a, b| a.name().cmp(b.name()));

        AggregateReport::new(collected)
    }
}

impl Default for MetricsRegistry {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instrument_count = self.instruments.lock().len();
        let view_count = self.views.lock().len();

        f.debug_struct(type_name::<Self>())
            .field("instrument_count", &instrument_count)
            .field("view_count", &view_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{Aggregation, DimensionContext, resolve_dimension_keys};

    assert_impl_all!(MetricsRegistry: Send, Sync);

    #[test]
    fn duplicate_instrument_is_rejected() {
        let registry = MetricsRegistry::new();

        registry
            .new_instrument("queued", "calls currently queued against agent", "")
            .unwrap();

        let result = registry.new_instrument("queued", "a different description", "");

        assert!(matches!(
            result,
            Err(Error::DuplicateInstrument { name }) if name == "queued"
        ));
    }

    #[test]
    fn instruments_with_distinct_names_coexist() {
        let registry = MetricsRegistry::new();

        registry.new_instrument("queued", "", "").unwrap();
        registry.new_instrument("running", "", "").unwrap();
    }

    #[test]
    fn duplicate_view_in_batch_registers_nothing() {
        let registry = MetricsRegistry::new();
        let keys = resolve_dimension_keys(&["appname"]).unwrap();

        let first = registry.new_instrument("first", "", "").unwrap();
        let second = registry.new_instrument("second", "", "").unwrap();

        let result = registry.register_views(vec![
            ViewSpec {
                instrument: Arc::clone(&first),
                aggregation: Aggregation::Sum,
                dimension_keys: keys.clone(),
            },
            ViewSpec {
                instrument: Arc::clone(&second),
                aggregation: Aggregation::Sum,
                dimension_keys: keys.clone(),
            },
            ViewSpec {
                instrument: Arc::clone(&first),
                aggregation: Aggregation::Count,
                dimension_keys: keys,
            },
        ]);

        assert!(matches!(
            result,
            Err(Error::DuplicateView { name }) if name == "first"
        ));

        // Atomicity: not even the valid views of the failed batch were registered.
        let report = registry.collect();
        assert_eq!(report.views().count(), 0);

        // And no measurements land anywhere.
        first.record(&DimensionContext::empty(), 1);
        assert!(registry.collect().view("first").is_none());
    }

    #[test]
    fn reregistering_a_view_is_rejected() {
        let registry = MetricsRegistry::new();

        let instrument = registry.new_instrument("only", "", "").unwrap();

        registry
            .register_views(vec![ViewSpec {
                instrument: Arc::clone(&instrument),
                aggregation: Aggregation::Sum,
                dimension_keys: Vec::new(),
            }])
            .unwrap();

        let result = registry.register_views(vec![ViewSpec {
            instrument,
            aggregation: Aggregation::Sum,
            dimension_keys: Vec::new(),
        }]);

        assert!(matches!(result, Err(Error::DuplicateView { .. })));
    }

    #[test]
    fn collect_returns_views_in_name_order() {
        let registry = MetricsRegistry::new();

        for name in ["zeta", "alpha", "mid"] {
            let instrument = registry.new_instrument(name.to_string(), "", "").unwrap();
            registry
                .register_views(vec![ViewSpec {
                    instrument,
                    aggregation: Aggregation::Sum,
                    dimension_keys: Vec::new(),
                }])
                .unwrap();
        }

        let report = registry.collect();
        let names = report
            .views()
            .map(|view| view.name().to_string())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn collected_report_is_detached_from_later_recording() {
        let registry = MetricsRegistry::new();

        let instrument = registry.new_instrument("detached", "", "").unwrap();
        registry
            .register_views(vec![ViewSpec {
                instrument: Arc::clone(&instrument),
                aggregation: Aggregation::Sum,
                dimension_keys: Vec::new(),
            }])
            .unwrap();

        instrument.record(&DimensionContext::empty(), 5);

        let report = registry.collect();

        instrument.record(&DimensionContext::empty(), 5);

        let view = report.view("detached").unwrap();
        let row = view.rows().next().unwrap();
        assert_eq!(row.data(), &crate::AggregateData::Sum(5));
    }
}
