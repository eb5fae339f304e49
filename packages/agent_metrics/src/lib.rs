#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Call and container lifecycle metrics for a function execution agent.
//!
//! This crate is the telemetry core of an agent that executes function calls in
//! containers. It turns discrete events ("call queued", "container entered state X",
//! "docker reported N bytes of network I/O") into aggregatable numeric measurements,
//! while guaranteeing that recording never fails, blocks or panics on the path of
//! the call that triggered it.
//!
//! # Building blocks
//!
//! * [`MetricsRegistry`] - the explicitly constructed instrument/view registry and
//!   aggregation engine. Built once at startup; multiple registries can coexist,
//!   which keeps tests independent.
//! * [`Instrument`] - a named slot measurements are recorded into. Created once,
//!   immutable, identified by name.
//! * [`DimensionKey`] / [`DimensionContext`] - validated grouping axes and the
//!   ambient per-call context that tags every measurement.
//! * [`CallMetrics`] - records the queued → running → terminal lifecycle of calls,
//!   plus independent timeout/error/busy signals, retry counts and two latency
//!   distributions.
//! * [`ContainerMetrics`] - records container state occupancy, time-in-state and
//!   docker resource samples into instruments built dynamically from startup
//!   configuration.
//! * [`AggregateReport`] - the read-only export boundary: a point-in-time snapshot
//!   of every view, sorted deterministically.
//!
//! # Wiring up at startup
//!
//! All instruments and views must be registered before recording starts; a
//! registration conflict is a configuration error the host should treat as fatal.
//!
//! ```
//! use agent_metrics::{CallMetrics, DimensionContext, MetricsRegistry, resolve_dimension_keys};
//!
//! let registry = MetricsRegistry::new();
//!
//! let calls = CallMetrics::new(&registry)?;
//! calls.register_lifecycle_views(&registry, &["appname", "fnname"])?;
//! calls.register_latency_views(&registry, &["appname", "fnname"])?;
//!
//! // The scheduler carries one context per in-flight call.
//! let keys = resolve_dimension_keys(&["appname", "fnname"])?;
//! let context = DimensionContext::builder()
//!     .dimension(&keys[0], "myapp")
//!     .dimension(&keys[1], "myfn")
//!     .build();
//!
//! calls.enqueue(&context);
//! calls.dequeue_and_start(&context);
//! calls.complete(&context);
//!
//! let report = registry.collect();
//! println!("{report}");
//! # Ok::<(), agent_metrics::Error>(())
//! ```
//!
//! # Dynamically configured instruments
//!
//! Container state names and docker stat keys are only known once startup
//! configuration is read, so their instruments are built from key lists. Empty
//! strings mark unused slots that get neither an instrument nor a view:
//!
//! ```
//! use std::time::Duration;
//!
//! use agent_metrics::{ContainerMetrics, DOCKER_STAT_KEYS, DimensionContext, MetricsRegistry};
//!
//! let registry = MetricsRegistry::new();
//!
//! let containers = ContainerMetrics::new(
//!     &registry,
//!     &["", "container_wait", "container_busy"],
//!     &["", "container_wait_duration", "container_busy_duration"],
//!     DOCKER_STAT_KEYS,
//! )?;
//! containers.register_container_views(&registry, &["appname"])?;
//! containers.register_docker_views(&registry, &["appname"])?;
//!
//! let context = DimensionContext::empty();
//! containers.enter_state(&context, 1);
//! containers.record_time_in_state(&context, 1, Duration::from_millis(12));
//! containers.exit_state(&context, 1);
//! containers.record_docker_stat(&context, "mem_usage", 4096_i64);
//! # Ok::<(), agent_metrics::Error>(())
//! ```
//!
//! # Concurrency
//!
//! Recording operations are non-blocking and safe to call from any number of
//! threads without external locking: recorders hold direct instrument references,
//! and each view accumulates into atomic cells keyed by dimension-value tuple.
//! No ordering is guaranteed between concurrent recordings - aggregation is
//! commutative, so none is needed. Per-call ordering (enqueue before dequeue
//! before terminal) is the caller's responsibility.
//!
//! # Error policy
//!
//! Startup wiring returns [`Error`] values for configuration conflicts (duplicate
//! instrument or view names, invalid dimension keys); whether those are fatal is
//! host policy, though they almost always should be. Recording itself has no
//! visible failure mode: a measurement into an unregistered instrument, a
//! placeholder state slot or an unknown docker key is silently dropped rather than
//! disturbing the call path.
//!
//! # Mathematics policy
//!
//! Magnitudes are `i64` and arithmetic on the record path is wrapping. Values near
//! the `i64` boundaries may be mangled; there is no guarantee about the specific
//! outcome, but recording will not panic. Do not stray near `i64` boundaries and
//! you should be fine.

mod call;
mod constants;
mod container;
mod data_types;
mod dimensions;
mod error;
mod instrument;
mod observations;
mod registry;
mod report;
mod views;

pub use call::*;
pub use constants::*;
pub use container::*;
pub use data_types::*;
pub use dimensions::*;
pub use error::*;
pub use instrument::*;
pub(crate) use observations::*;
pub use registry::*;
pub use report::*;
pub use views::*;
