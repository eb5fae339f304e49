use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::{
    DimensionContext, DimensionKey, Instrument, InstrumentName, Magnitude, ObservationCell,
    ViewMetrics, ViewRow,
};

/// How a view combines the measurements recorded into its instrument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Aggregation {
    /// Running sum of recorded magnitudes.
    ///
    /// Used for delta counters, where the aggregated value is a live occupancy
    /// (paired +1/-1 deltas) or a monotonic total.
    Sum,

    /// Number of recorded measurements, regardless of magnitude.
    Count,

    /// Bucketed histogram of recorded magnitudes.
    Distribution {
        /// Sorted bucket boundaries. Bucket `i` covers `[boundaries[i-1], boundaries[i])`;
        /// the first and last buckets are open towards -inf and +inf respectively.
        /// An empty list yields a single unbounded bucket, which still tracks
        /// count, sum and mean.
        boundaries: &'static [Magnitude],
    },
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum => f.write_str("sum"),
            Self::Count => f.write_str("count"),
            Self::Distribution { .. } => f.write_str("distribution"),
        }
    }
}

/// One view to register with the aggregation engine: an instrument bound to an
/// aggregation function and an ordered set of dimension keys.
///
/// The view takes its name, description and unit from the instrument. Views are
/// immutable after registration and live for the lifetime of the registry.
#[derive(Debug)]
pub struct ViewSpec {
    /// The instrument whose measurements the view aggregates.
    pub instrument: Arc<Instrument>,

    /// The aggregation function applied to recorded measurements.
    pub aggregation: Aggregation,

    /// The ordered dimension keys that measurements are grouped by.
    pub dimension_keys: Vec<DimensionKey>,
}

type CellMap = scc::HashMap<Box<[String]>, Arc<ObservationCell>, foldhash::fast::RandomState>;

/// The aggregation engine state of one registered view: an atomic accumulator
/// cell per dimension-value tuple observed so far.
///
/// Cells are created lazily on first recording of a tuple and never removed.
/// The record path is lock-free apart from the concurrent map access.
pub(crate) struct ViewCore {
    name: InstrumentName,
    description: InstrumentName,
    unit: InstrumentName,
    aggregation: Aggregation,
    dimension_keys: Box<[DimensionKey]>,
    cells: CellMap,
}

impl ViewCore {
    pub(crate) fn new(spec: &ViewSpec) -> Self {
        Self {
            name: spec.instrument.name().to_string().into(),
            description: spec.instrument.description().to_string().into(),
            unit: spec.instrument.unit().to_string().into(),
            aggregation: spec.aggregation,
            dimension_keys: spec.dimension_keys.clone().into_boxed_slice(),
            cells: CellMap::with_hasher(foldhash::fast::RandomState::default()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Records one measurement into the cell of the dimension-value tuple the
    /// context resolves to. Keys absent from the context resolve to the empty value.
    pub(crate) fn record(&self, context: &DimensionContext, magnitude: Magnitude) {
        let row = self
            .dimension_keys
            .iter()
            .map(|key| context.value_of(key).unwrap_or_default().to_string())
            .collect::<Box<[String]>>();

        // Fast path: this tuple has been recorded into before.
        if let Some(cell) = self.cells.read(&row, |_, cell| Arc::clone(cell)) {
            cell.insert(magnitude, 1);
            return;
        }

        self.cells
            .entry(row)
            .or_insert_with(|| Arc::new(self.new_cell()))
            .get()
            .insert(magnitude, 1);
    }

    fn new_cell(&self) -> ObservationCell {
        match self.aggregation {
            Aggregation::Sum | Aggregation::Count => ObservationCell::counter(),
            Aggregation::Distribution { boundaries } => ObservationCell::distribution(boundaries),
        }
    }

    /// Snapshots every cell into a read-only view, rows sorted by dimension
    /// values for deterministic output.
    pub(crate) fn collect(&self) -> ViewMetrics {
        let mut rows = Vec::new();

        self.cells.scan(|dimension_values, cell| {
            rows.push(ViewRow::new(
                dimension_values.clone(),
                self.aggregation,
                cell.snapshot(),
            ));
        });

        rows.sort_by(|a, b| a.dimension_values().cmp(b.dimension_values()));

        ViewMetrics::new(
            self.name.clone(),
            self.description.clone(),
            self.unit.clone(),
            self.aggregation,
            self.dimension_keys.clone(),
            rows,
        )
    }
}

impl fmt::Debug for ViewCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("name", &self.name)
            .field("aggregation", &self.aggregation)
            .field("dimension_keys", &self.dimension_keys)
            .finish_non_exhaustive()
    }
}
