use std::sync::Arc;
use std::time::Duration;

use num_traits::AsPrimitive;

use crate::{
    Aggregation, DimensionContext, Instrument, LATENCY_BUCKETS_MS, Magnitude, MetricsRegistry,
    RETRY_BUCKETS, Result, ViewSpec, resolve_dimension_keys,
};

const QUEUED_METRIC: &str = "queued";
const CALLS_METRIC: &str = "calls";
const RUNNING_METRIC: &str = "running";
const COMPLETED_METRIC: &str = "completed";
const FAILED_METRIC: &str = "failed";
const TIMEDOUT_METRIC: &str = "timeouts";
const ERRORS_METRIC: &str = "errors";
const SERVER_BUSY_METRIC: &str = "server_busy";
const RETRY_METRIC: &str = "retry";
const SCHED_LATENCY_METRIC: &str = "lb_runner_sched_latency";
const EXEC_LATENCY_METRIC: &str = "lb_runner_exec_latency";

/// Records the lifecycle of calls flowing through the agent.
///
/// The recorder holds direct instrument references, so a lifecycle transition is a
/// couple of atomic additions - no lookup, no locking, no failure path. All
/// operations take the ambient [`DimensionContext`] carried with the call.
///
/// # Pairing invariant
///
/// Every [`enqueue()`][Self::enqueue] must eventually be matched by exactly one of:
///
/// - [`dequeue_and_start()`][Self::dequeue_and_start] followed by exactly one of
///   [`complete()`][Self::complete] or [`fail()`][Self::fail],
/// - [`dequeue_and_fail()`][Self::dequeue_and_fail], or
/// - [`dequeue()`][Self::dequeue].
///
/// This keeps the aggregated `queued` and `running` sums equal to the live number
/// of queued and running calls. The recorder cannot detect a violation at runtime
/// (it sees deltas, not call identities) - upholding the pairing is the caller's
/// responsibility.
///
/// [`timed_out()`][Self::timed_out], [`record_error()`][Self::record_error] and
/// [`too_busy()`][Self::too_busy] are independent signals that may co-occur with
/// any terminal transition without affecting the occupancy sums.
#[derive(Debug)]
pub struct CallMetrics {
    queued: Arc<Instrument>,
    calls: Arc<Instrument>,
    running: Arc<Instrument>,
    completed: Arc<Instrument>,
    failed: Arc<Instrument>,
    timedout: Arc<Instrument>,
    errors: Arc<Instrument>,
    server_busy: Arc<Instrument>,
    retries: Arc<Instrument>,
    sched_latency: Arc<Instrument>,
    exec_latency: Arc<Instrument>,
}

impl CallMetrics {
    /// Creates the fixed set of call lifecycle instruments in the given registry.
    ///
    /// Fails with [`Error::DuplicateInstrument`][crate::Error::DuplicateInstrument]
    /// if any of the instrument names already exist, which means the recorder was
    /// constructed twice against one registry.
    pub fn new(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            queued: registry.new_instrument(
                QUEUED_METRIC,
                "calls currently queued against agent",
                "",
            )?,
            calls: registry.new_instrument(CALLS_METRIC, "calls created in agent", "")?,
            running: registry.new_instrument(
                RUNNING_METRIC,
                "calls currently running in agent",
                "",
            )?,
            completed: registry.new_instrument(COMPLETED_METRIC, "calls completed in agent", "")?,
            failed: registry.new_instrument(FAILED_METRIC, "calls failed in agent", "")?,
            timedout: registry.new_instrument(TIMEDOUT_METRIC, "calls timed out in agent", "")?,
            errors: registry.new_instrument(ERRORS_METRIC, "calls errored in agent", "")?,
            server_busy: registry.new_instrument(
                SERVER_BUSY_METRIC,
                "calls where server was too busy in agent",
                "",
            )?,
            retries: registry.new_instrument(RETRY_METRIC, "per-invocation retry count", "")?,
            sched_latency: registry.new_instrument(
                SCHED_LATENCY_METRIC,
                "runner scheduler latency reported by LB agent",
                "msecs",
            )?,
            exec_latency: registry.new_instrument(
                EXEC_LATENCY_METRIC,
                "runner container execution latency reported by LB agent",
                "msecs",
            )?,
        })
    }

    /// Call admission: the call is now queued.
    ///
    /// Called exactly once per admitted call.
    pub fn enqueue(&self, context: &DimensionContext) {
        self.queued.record(context, 1);
        self.calls.record(context, 1);
    }

    /// The call left the queue without starting and without a terminal outcome
    /// recorded by this operation - the caller emits any applicable terminal
    /// counter separately.
    pub fn dequeue(&self, context: &DimensionContext) {
        self.queued.record(context, -1);
    }

    /// The queued call began execution.
    ///
    /// Called exactly once per call that starts.
    pub fn dequeue_and_start(&self, context: &DimensionContext) {
        self.queued.record(context, -1);
        self.running.record(context, 1);
    }

    /// Terminal: the running call finished successfully.
    pub fn complete(&self, context: &DimensionContext) {
        self.running.record(context, -1);
        self.completed.record(context, 1);
    }

    /// Terminal: the running call failed after it had started.
    pub fn fail(&self, context: &DimensionContext) {
        self.running.record(context, -1);
        self.failed.record(context, 1);
    }

    /// Terminal: the call failed while still queued, before execution started.
    pub fn dequeue_and_fail(&self, context: &DimensionContext) {
        self.queued.record(context, -1);
        self.failed.record(context, 1);
    }

    /// Independent signal: the call hit its timeout. Does not adjust the
    /// queued/running occupancy and may co-occur with a terminal transition.
    pub fn timed_out(&self, context: &DimensionContext) {
        self.timedout.record(context, 1);
    }

    /// Independent signal: the call encountered an internal error. Non-exclusive
    /// with the terminal transitions.
    pub fn record_error(&self, context: &DimensionContext) {
        self.errors.record(context, 1);
    }

    /// Independent signal: the call was rejected because the server was too busy.
    pub fn too_busy(&self, context: &DimensionContext) {
        self.server_busy.record(context, 1);
    }

    /// Records how many retries one logical invocation required; zero means the
    /// first attempt succeeded.
    pub fn record_retries(&self, context: &DimensionContext, retries: impl AsPrimitive<Magnitude>) {
        self.retries.record(context, retries);
    }

    /// Records how long the runner scheduler waited before a committed call could
    /// run, as whole milliseconds (truncating).
    pub fn record_sched_latency(&self, context: &DimensionContext, duration: Duration) {
        self.sched_latency.record_millis(context, duration);
    }

    /// Records the execution time of a call inside its container, as whole
    /// milliseconds (truncating).
    pub fn record_exec_latency(&self, context: &DimensionContext, duration: Duration) {
        self.exec_latency.record_millis(context, duration);
    }

    /// Registers the sum views of the eight lifecycle counters, grouped by the
    /// given dimensions. Registers atomically; failure is a startup
    /// configuration error.
    pub fn register_lifecycle_views(
        &self,
        registry: &MetricsRegistry,
        dimension_names: &[&str],
    ) -> Result<()> {
        let keys = resolve_dimension_keys(dimension_names)?;

        let specs = [
            &self.queued,
            &self.calls,
            &self.running,
            &self.completed,
            &self.failed,
            &self.timedout,
            &self.errors,
            &self.server_busy,
        ]
        .into_iter()
        .map(|instrument| ViewSpec {
            instrument: Arc::clone(instrument),
            aggregation: Aggregation::Sum,
            dimension_keys: keys.clone(),
        })
        .collect();

        registry.register_views(specs)
    }

    /// Registers the distribution views reported by the load balancer agent:
    /// scheduler latency, execution latency and the per-invocation retry count.
    pub fn register_latency_views(
        &self,
        registry: &MetricsRegistry,
        dimension_names: &[&str],
    ) -> Result<()> {
        let keys = resolve_dimension_keys(dimension_names)?;

        registry.register_views(vec![
            ViewSpec {
                instrument: Arc::clone(&self.sched_latency),
                aggregation: Aggregation::Distribution {
                    boundaries: LATENCY_BUCKETS_MS,
                },
                dimension_keys: keys.clone(),
            },
            ViewSpec {
                instrument: Arc::clone(&self.exec_latency),
                aggregation: Aggregation::Distribution {
                    boundaries: LATENCY_BUCKETS_MS,
                },
                dimension_keys: keys.clone(),
            },
            ViewSpec {
                instrument: Arc::clone(&self.retries),
                aggregation: Aggregation::Distribution {
                    boundaries: RETRY_BUCKETS,
                },
                dimension_keys: keys,
            },
        ])
    }
}
