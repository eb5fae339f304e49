use crate::Magnitude;

/// Bucket boundaries of the scheduler and execution latency distributions, in milliseconds.
///
/// Buckets are half-open `[lower, upper)` intervals, so a 75 ms measurement lands
/// in the `[50, 100)` bucket.
pub const LATENCY_BUCKETS_MS: &[Magnitude] = &[1, 10, 50, 100, 250, 500, 1000, 10000, 60000, 120000];

/// Bucket boundaries of the per-invocation retry count distribution.
pub const RETRY_BUCKETS: &[Magnitude] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

/// The stat keys reported by the docker monitor for a running container.
///
/// Hosts that use the standard monitor pass this list to
/// [`ContainerMetrics::new()`][crate::ContainerMetrics::new] verbatim.
pub const DOCKER_STAT_KEYS: &[&str] = &[
    "net_rx",
    "net_tx",
    "mem_limit",
    "mem_usage",
    "disk_read",
    "disk_write",
    "cpu_user",
    "cpu_total",
    "cpu_kernel",
];
