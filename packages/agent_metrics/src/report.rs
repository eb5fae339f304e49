use std::fmt::{self, Display};
use std::iter;
use std::num::NonZero;

use crate::{Aggregation, DimensionKey, InstrumentName, Magnitude, ObservationSnapshot};

/// A point-in-time, read-only collection of every registered view's aggregated data.
///
/// This is the export boundary of the telemetry core: an export or reporting
/// collaborator collects a report and ships its contents wherever they need to go.
/// The report is detached from the live registry - recording that happens after
/// collection does not change it.
///
/// For human-readable output, use the `Display` trait implementation. For
/// machine-readable output, inspect the report via [`views()`][Self::views].
///
/// Views are sorted by name and rows by dimension values, so output is
/// deterministic and reproducible in tests.
#[derive(Debug)]
pub struct AggregateReport {
    views: Box<[ViewMetrics]>,
}

impl AggregateReport {
    pub(crate) fn new(views: Vec<ViewMetrics>) -> Self {
        Self {
            views: views.into_boxed_slice(),
        }
    }

    /// Iterates through all views in the report, in name order.
    pub fn views(&self) -> impl Iterator<Item = &ViewMetrics> {
        self.views.iter()
    }

    /// The view with the given name, if one is registered.
    #[must_use]
    pub fn view(&self, name: &str) -> Option<&ViewMetrics> {
        self.views.iter().find(|view| view.name() == name)
    }
}

impl Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for view in &self.views {
            write!(f, "{view}")?;
        }

        Ok(())
    }
}

/// The aggregated data of a single view, part of a collected [`AggregateReport`].
#[derive(Debug)]
pub struct ViewMetrics {
    name: InstrumentName,
    description: InstrumentName,
    unit: InstrumentName,
    aggregation: Aggregation,
    dimension_keys: Box<[DimensionKey]>,

    // Sorted by dimension values, ascending.
    rows: Box<[ViewRow]>,
}

impl ViewMetrics {
    pub(crate) fn new(
        name: InstrumentName,
        description: InstrumentName,
        unit: InstrumentName,
        aggregation: Aggregation,
        dimension_keys: Box<[DimensionKey]>,
        rows: Vec<ViewRow>,
    ) -> Self {
        Self {
            name,
            description,
            unit,
            aggregation,
            dimension_keys,
            rows: rows.into_boxed_slice(),
        }
    }

    /// The name of the view (always the name of its instrument).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A human-readable description of what the view aggregates.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The unit of recorded magnitudes, or the empty string for plain counts.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The aggregation function the view applies.
    #[must_use]
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// The ordered dimension keys the view groups by.
    pub fn dimension_keys(&self) -> impl Iterator<Item = &DimensionKey> {
        self.dimension_keys.iter()
    }

    /// Iterates through the rows of the view - one row per dimension-value tuple
    /// that has been recorded into, in ascending tuple order.
    pub fn rows(&self) -> impl Iterator<Item = &ViewRow> {
        self.rows.iter()
    }
}

impl Display for ViewMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.aggregation)?;

        if !self.unit.is_empty() {
            write!(f, " ({})", self.unit)?;
        }

        writeln!(f, ": {}", self.description)?;

        if self.rows.is_empty() {
            writeln!(f, "  (no data)")?;
        }

        for row in &self.rows {
            write!(f, "{row}")?;
        }

        Ok(())
    }
}

/// One dimension-value tuple of a view together with its aggregated data.
#[derive(Debug)]
pub struct ViewRow {
    dimension_values: Box<[String]>,
    data: AggregateData,
}

impl ViewRow {
    pub(crate) fn new(
        dimension_values: Box<[String]>,
        aggregation: Aggregation,
        snapshot: ObservationSnapshot,
    ) -> Self {
        let data = match aggregation {
            Aggregation::Sum => AggregateData::Sum(snapshot.sum),
            Aggregation::Count => AggregateData::Count(snapshot.count),
            Aggregation::Distribution { boundaries } => {
                AggregateData::Distribution(DistributionData {
                    count: snapshot.count,
                    sum: snapshot.sum,
                    boundaries,
                    bucket_counts: snapshot.bucket_counts,
                })
            }
        };

        Self {
            dimension_values,
            data,
        }
    }

    /// The values of the view's dimension keys, in key order. Tuples that were
    /// recorded without a value for some key carry the empty string there.
    #[must_use]
    pub fn dimension_values(&self) -> &[String] {
        &self.dimension_values
    }

    /// The aggregated data of this tuple.
    #[must_use]
    pub fn data(&self) -> &AggregateData {
        &self.data
    }
}

impl Display for ViewRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ({})", self.dimension_values.join(", "))?;

        match &self.data {
            AggregateData::Sum(sum) => writeln!(f, ": sum {sum}"),
            AggregateData::Count(count) => writeln!(f, ": count {count}"),
            AggregateData::Distribution(distribution) => {
                writeln!(
                    f,
                    ": {} samples; sum {}; mean {}",
                    distribution.count(),
                    distribution.sum(),
                    distribution.mean()
                )?;

                // A bucket-less distribution has nothing beyond the totals.
                if distribution.boundaries().is_empty() {
                    return Ok(());
                }

                for (lower, upper, count) in distribution.buckets() {
                    write!(f, "    [")?;
                    write_bound(f, lower)?;
                    write!(f, ", ")?;
                    write_bound(f, upper)?;
                    writeln!(f, "): {count}")?;
                }

                Ok(())
            }
        }
    }
}

fn write_bound(f: &mut fmt::Formatter<'_>, bound: Magnitude) -> fmt::Result {
    if bound == Magnitude::MIN {
        f.write_str("-inf")
    } else if bound == Magnitude::MAX {
        f.write_str("+inf")
    } else {
        write!(f, "{bound}")
    }
}

/// The aggregated data of one view row, shaped by the view's aggregation function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AggregateData {
    /// Running sum of recorded magnitudes.
    Sum(Magnitude),

    /// Number of recorded measurements.
    Count(u64),

    /// Bucketed histogram of recorded magnitudes.
    Distribution(DistributionData),
}

/// A bucketed histogram summarizing the magnitudes recorded into one view row.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DistributionData {
    count: u64,
    sum: Magnitude,

    /// Sorted, ascending. Buckets are half-open `[lower, upper)` intervals with
    /// implicit -inf and +inf outer bounds.
    boundaries: &'static [Magnitude],

    /// Always `boundaries.len() + 1` entries.
    bucket_counts: Box<[u64]>,
}

impl DistributionData {
    /// Total number of recorded samples. No sample is ever dropped: the bucket
    /// counts always sum to this value.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of the magnitudes of all recorded samples.
    #[must_use]
    pub fn sum(&self) -> Magnitude {
        self.sum
    }

    /// Mean magnitude of recorded samples, zero if there are none.
    #[must_use]
    pub fn mean(&self) -> Magnitude {
        #[expect(
            clippy::arithmetic_side_effects,
            reason = "NonZero protects against division by zero"
        )]
        #[expect(
            clippy::integer_division,
            reason = "we accept that we lose the remainder - 100% precision not required"
        )]
        Magnitude::try_from(self.count)
            .ok()
            .and_then(NonZero::new)
            .map_or(0, |count| self.sum / count.get())
    }

    /// The configured bucket boundaries, not including the implicit outer bounds.
    #[must_use]
    pub fn boundaries(&self) -> &'static [Magnitude] {
        self.boundaries
    }

    /// Iterates over the per-bucket sample counts, in ascending bucket order.
    pub fn bucket_counts(&self) -> impl Iterator<Item = u64> {
        self.bucket_counts.iter().copied()
    }

    /// Iterates over the buckets as `(lower, upper, count)` triples, in ascending
    /// order. Each bucket covers the half-open interval `[lower, upper)`; the
    /// outermost bounds are represented as [`Magnitude::MIN`] and [`Magnitude::MAX`].
    pub fn buckets(&self) -> impl Iterator<Item = (Magnitude, Magnitude, u64)> {
        let lowers = iter::once(Magnitude::MIN).chain(self.boundaries.iter().copied());
        let uppers = self
            .boundaries
            .iter()
            .copied()
            .chain(iter::once(Magnitude::MAX));

        lowers
            .zip(uppers)
            .zip(self.bucket_counts.iter().copied())
            .map(|((lower, upper), count)| (lower, upper, count))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]

    use super::*;

    fn distribution_row(boundaries: &'static [Magnitude], magnitudes: &[Magnitude]) -> ViewRow {
        let cell = crate::ObservationCell::distribution(boundaries);

        for &magnitude in magnitudes {
            cell.insert(magnitude, 1);
        }

        ViewRow::new(
            Box::new([]),
            Aggregation::Distribution { boundaries },
            cell.snapshot(),
        )
    }

    #[test]
    fn distribution_mean_is_zero_without_samples() {
        let row = distribution_row(&[10], &[]);

        let AggregateData::Distribution(distribution) = row.data() else {
            panic!("expected a distribution row");
        };

        assert_eq!(distribution.count(), 0);
        assert_eq!(distribution.sum(), 0);
        assert_eq!(distribution.mean(), 0);
    }

    #[test]
    fn distribution_mean_uses_integer_division() {
        let row = distribution_row(&[10], &[1, 2]);

        let AggregateData::Distribution(distribution) = row.data() else {
            panic!("expected a distribution row");
        };

        // 3 / 2 = 1 with the remainder lost.
        assert_eq!(distribution.mean(), 1);
    }

    #[test]
    fn buckets_pair_half_open_bounds_with_counts() {
        let row = distribution_row(&[0, 10], &[-5, 3, 25]);

        let AggregateData::Distribution(distribution) = row.data() else {
            panic!("expected a distribution row");
        };

        let buckets = distribution.buckets().collect::<Vec<_>>();

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0], (Magnitude::MIN, 0, 1)); // -5
        assert_eq!(buckets[1], (0, 10, 1)); // 3
        assert_eq!(buckets[2], (10, Magnitude::MAX, 1)); // 25
    }

    #[test]
    fn row_display_renders_sum_and_count() {
        let counter = crate::ObservationCell::counter();
        counter.insert(1, 3);

        let sum_row = ViewRow::new(
            Box::new(["myapp".to_string()]),
            Aggregation::Sum,
            counter.snapshot(),
        );

        assert_eq!(format!("{sum_row}"), "  (myapp): sum 3\n");

        let count_row = ViewRow::new(
            Box::new(["myapp".to_string()]),
            Aggregation::Count,
            counter.snapshot(),
        );

        assert_eq!(format!("{count_row}"), "  (myapp): count 3\n");
    }

    #[test]
    fn row_display_renders_buckets_with_infinite_bounds() {
        let row = distribution_row(&[10], &[5, 500]);

        let output = format!("{row}");

        assert!(output.contains("2 samples; sum 505; mean 252"));
        assert!(output.contains("[-inf, 10): 1"));
        assert!(output.contains("[10, +inf): 1"));
    }

    #[test]
    fn bucketless_distribution_display_has_totals_only() {
        let row = distribution_row(&[], &[7]);

        let output = format!("{row}");

        assert!(output.contains("1 samples; sum 7; mean 7"));
        assert!(!output.contains("inf"));
    }
}
