use std::iter;
use std::sync::atomic::{self, AtomicI64, AtomicU64};

use crate::Magnitude;

/// We use `Relaxed` ordering for all atomic operations to keep the record path as fast
/// as possible. Aggregation is commutative, so ordering between concurrent recordings
/// carries no meaning, and we accept delayed visibility on weak memory platforms.
const CELL_ACCESS_ORDERING: atomic::Ordering = atomic::Ordering::Relaxed;

/// Accumulates the measurements recorded for one view under one dimension-value tuple.
///
/// Writable from any number of threads concurrently. Reads are lock-free, so logically
/// torn reads (of different fields) are entirely possible - do not assume internal
/// consistency between fields of a snapshot.
#[derive(Debug)]
pub(crate) struct ObservationCell {
    count: AtomicU64,
    sum: AtomicI64,

    /// Empty for sum/count cells. For distribution cells this holds
    /// `boundaries.len() + 1` counters: bucket `i` covers `[boundaries[i-1], boundaries[i])`,
    /// with the first and last buckets open towards -inf and +inf respectively.
    bucket_counts: Box<[AtomicU64]>,
    boundaries: &'static [Magnitude],
}

impl ObservationCell {
    /// Creates a cell that tracks only count and sum (sum and count views).
    pub(crate) fn counter() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicI64::new(0),
            bucket_counts: Box::new([]),
            boundaries: &[],
        }
    }

    /// Creates a cell that additionally maintains a histogram over the given
    /// sorted bucket boundaries. An empty boundary list yields a single
    /// `(-inf, +inf)` bucket.
    pub(crate) fn distribution(boundaries: &'static [Magnitude]) -> Self {
        let cell = Self {
            count: AtomicU64::new(0),
            sum: AtomicI64::new(0),
            bucket_counts: iter::repeat_with(|| AtomicU64::new(0))
                .take(
                    boundaries
                        .len()
                        .checked_add(1)
                        .expect("bucket boundary lists are small compile-time constants"),
                )
                .collect::<Vec<_>>()
                .into_boxed_slice(),
            boundaries,
        };

        // Important type invariant used to ensure safety - a distribution cell always
        // has one more counter than it has boundaries.
        debug_assert_eq!(
            cell.bucket_counts.len(),
            cell.boundaries.len() + 1,
            "we derive counter length from boundary length, so they must differ by one",
        );

        cell
    }

    /// Records `count` measurements of the given `magnitude`.
    ///
    /// Arithmetic is wrapping: values near the `i64` boundaries may be mangled but
    /// recording never panics and never blocks the operation that triggered it.
    pub(crate) fn insert(&self, magnitude: Magnitude, count: usize) {
        let count_u64 = count as u64;
        #[expect(
            clippy::cast_possible_wrap,
            reason = "wrapping is intentional - see method documentation"
        )]
        let count_i64 = count as i64;

        self.count.fetch_add(count_u64, CELL_ACCESS_ORDERING);
        self.sum
            .fetch_add(magnitude.wrapping_mul(count_i64), CELL_ACCESS_ORDERING);

        if self.bucket_counts.is_empty() {
            return;
        }

        // Boundaries are sorted ascending and short, so a linear scan is cheap and
        // branch prediction handles it well. The bucket index is the number of
        // boundaries at or below the magnitude.
        let bucket_index = self
            .boundaries
            .iter()
            .take_while(|&&boundary| magnitude >= boundary)
            .count();

        // We do this unsafely because this is the hot path of every recorded
        // measurement and the bounds are known by construction.
        //
        // SAFETY: Type invariant: a non-empty `bucket_counts` has exactly
        // `boundaries.len() + 1` entries, and `bucket_index <= boundaries.len()`.
        unsafe { self.bucket_counts.get_unchecked(bucket_index) }
            .fetch_add(count_u64, CELL_ACCESS_ORDERING);
    }

    /// Takes a snapshot of the current state.
    ///
    /// No synchronization is assumed - different fields of the snapshot are not
    /// guaranteed to be consistent with each other. The only guarantee is that each
    /// field has a value that was extant at some recent point in time.
    pub(crate) fn snapshot(&self) -> ObservationSnapshot {
        ObservationSnapshot {
            count: self.count.load(CELL_ACCESS_ORDERING),
            sum: self.sum.load(CELL_ACCESS_ORDERING),
            bucket_counts: self
                .bucket_counts
                .iter()
                .map(|x| x.load(CELL_ACCESS_ORDERING))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }
}

/// A point in time snapshot of a single cell.
#[derive(Debug)]
pub(crate) struct ObservationSnapshot {
    pub(crate) count: u64,
    pub(crate) sum: Magnitude,

    /// Empty unless the cell maintains a histogram.
    pub(crate) bucket_counts: Box<[u64]>,
}
