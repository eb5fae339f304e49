use std::sync::Arc;
use std::time::Duration;

use foldhash::{HashMap, HashMapExt};
use num_traits::AsPrimitive;

use crate::{
    Aggregation, DimensionContext, Instrument, Magnitude, MetricsRegistry, Result, ViewSpec,
    resolve_dimension_keys,
};

/// Records container state occupancy, time-in-state and docker-reported resource
/// usage.
///
/// Unlike the call lifecycle instruments, none of these are known at compile time:
/// the state and resource key lists arrive from startup configuration. Instruments
/// are built once from those lists and are indexable by position afterwards, so the
/// high-frequency record path stays O(1).
///
/// State and time key lists may contain empty strings marking unused slots. Such a
/// slot gets no instrument and no view, and recording into it is a no-op - the
/// external monitor is expected not to use those indexes, but an absent slot is an
/// explicit `None`, never an out-of-bounds access.
#[derive(Debug)]
pub struct ContainerMetrics {
    /// One occupancy gauge per state key; `None` for placeholder slots.
    state_gauges: Box<[Option<Arc<Instrument>>]>,

    /// One time-in-state instrument per time key; `None` for placeholder slots.
    state_times: Box<[Option<Arc<Instrument>>]>,

    /// Docker stat instruments, keyed by stat name.
    docker: HashMap<String, Arc<Instrument>>,
}

impl ContainerMetrics {
    /// Creates instruments for the given container state, time-in-state and docker
    /// stat key lists.
    ///
    /// Empty strings in `state_keys` and `time_keys` are placeholder slots and are
    /// skipped. The docker stat unit is `cpu` for keys containing `cpu` and `bytes`
    /// otherwise. A name collision (within the lists or with instruments that
    /// already exist in the registry) is a startup configuration error.
    pub fn new(
        registry: &MetricsRegistry,
        state_keys: &[&str],
        time_keys: &[&str],
        docker_keys: &[&str],
    ) -> Result<Self> {
        let state_gauges = state_keys
            .iter()
            .map(|&key| {
                if key.is_empty() {
                    return Ok(None);
                }

                registry
                    .new_instrument(key.to_string(), format!("containers in state {key}"), "")
                    .map(Some)
            })
            .collect::<Result<Vec<_>>>()?
            .into_boxed_slice();

        let state_times = time_keys
            .iter()
            .map(|&key| {
                if key.is_empty() {
                    return Ok(None);
                }

                registry
                    .new_instrument(
                        key.to_string(),
                        format!("time spent in container state {key}"),
                        "ms",
                    )
                    .map(Some)
            })
            .collect::<Result<Vec<_>>>()?
            .into_boxed_slice();

        let mut docker = HashMap::with_capacity(docker_keys.len());

        for &key in docker_keys {
            let unit = if key.contains("cpu") { "cpu" } else { "bytes" };

            let instrument = registry.new_instrument(
                format!("docker_stats_{key}"),
                format!("docker container stats for {key}"),
                unit,
            )?;

            docker.insert(key.to_string(), instrument);
        }

        Ok(Self {
            state_gauges,
            state_times,
            docker,
        })
    }

    /// A container entered the state at `state_index`: +1 to its occupancy gauge.
    pub fn enter_state(&self, context: &DimensionContext, state_index: usize) {
        self.record_gauge(context, state_index, 1);
    }

    /// A container left the state at `state_index`: -1 to its occupancy gauge.
    pub fn exit_state(&self, context: &DimensionContext, state_index: usize) {
        self.record_gauge(context, state_index, -1);
    }

    fn record_gauge(&self, context: &DimensionContext, state_index: usize, delta: Magnitude) {
        if let Some(Some(instrument)) = self.state_gauges.get(state_index) {
            instrument.record(context, delta);
        }
    }

    /// Records how long a container spent in the state at `state_index`, as whole
    /// milliseconds (truncating).
    pub fn record_time_in_state(
        &self,
        context: &DimensionContext,
        state_index: usize,
        duration: Duration,
    ) {
        if let Some(Some(instrument)) = self.state_times.get(state_index) {
            instrument.record_millis(context, duration);
        }
    }

    /// Records one docker-reported resource sample for the given stat key.
    ///
    /// Unknown keys are a no-op: the monitor may report stats this recorder was not
    /// configured for, and recording must never fail.
    pub fn record_docker_stat(
        &self,
        context: &DimensionContext,
        key: &str,
        value: impl AsPrimitive<Magnitude>,
    ) {
        if let Some(instrument) = self.docker.get(key) {
            instrument.record(context, value);
        }
    }

    /// Registers the container views: a count view per non-empty state gauge and a
    /// bucket-less distribution per non-empty time-in-state instrument. Placeholder
    /// slots are skipped. Registers atomically.
    pub fn register_container_views(
        &self,
        registry: &MetricsRegistry,
        dimension_names: &[&str],
    ) -> Result<()> {
        let keys = resolve_dimension_keys(dimension_names)?;

        let specs = self
            .state_gauges
            .iter()
            .flatten()
            .map(|instrument| ViewSpec {
                instrument: Arc::clone(instrument),
                aggregation: Aggregation::Count,
                dimension_keys: keys.clone(),
            })
            .chain(self.state_times.iter().flatten().map(|instrument| ViewSpec {
                instrument: Arc::clone(instrument),
                aggregation: Aggregation::Distribution { boundaries: &[] },
                dimension_keys: keys.clone(),
            }))
            .collect();

        registry.register_views(specs)
    }

    /// Registers a bucket-less distribution view per docker stat instrument.
    /// Registers atomically.
    pub fn register_docker_views(
        &self,
        registry: &MetricsRegistry,
        dimension_names: &[&str],
    ) -> Result<()> {
        let keys = resolve_dimension_keys(dimension_names)?;

        let specs = self
            .docker
            .values()
            .map(|instrument| ViewSpec {
                instrument: Arc::clone(instrument),
                aggregation: Aggregation::Distribution { boundaries: &[] },
                dimension_keys: keys.clone(),
            })
            .collect();

        registry.register_views(specs)
    }
}
