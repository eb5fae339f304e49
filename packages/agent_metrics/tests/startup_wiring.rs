//! Integration tests for the startup wiring contract: instrument creation, view
//! registration atomicity and dynamic key list handling.

use agent_metrics::{
    CallMetrics, ContainerMetrics, DOCKER_STAT_KEYS, Error, MetricsRegistry,
    resolve_dimension_keys,
};

const DIMENSION_NAMES: &[&str] = &["appname", "fnname"];

#[test]
fn full_wiring_registers_every_view_category() {
    let registry = MetricsRegistry::new();

    let calls = CallMetrics::new(&registry).unwrap();
    let containers = ContainerMetrics::new(
        &registry,
        &["container_wait", "container_busy"],
        &["container_wait_duration", "container_busy_duration"],
        DOCKER_STAT_KEYS,
    )
    .unwrap();

    calls
        .register_lifecycle_views(&registry, DIMENSION_NAMES)
        .unwrap();
    calls
        .register_latency_views(&registry, DIMENSION_NAMES)
        .unwrap();
    containers
        .register_container_views(&registry, DIMENSION_NAMES)
        .unwrap();
    containers
        .register_docker_views(&registry, DIMENSION_NAMES)
        .unwrap();

    let report = registry.collect();

    // 8 lifecycle + 3 latency/retry + 2 gauges + 2 time + 9 docker.
    assert_eq!(report.views().count(), 8 + 3 + 2 + 2 + DOCKER_STAT_KEYS.len());

    // Every view groups by the supplied dimensions, in order.
    for view in report.views() {
        let key_names = view
            .dimension_keys()
            .map(|key| key.name().to_string())
            .collect::<Vec<_>>();

        assert_eq!(key_names, DIMENSION_NAMES, "view {}", view.name());
    }
}

#[test]
fn instrument_name_collision_across_recorders_is_rejected() {
    let registry = MetricsRegistry::new();

    CallMetrics::new(&registry).unwrap();

    // A container state named like a call counter collides in the shared
    // instrument namespace before any view registration proceeds.
    let result = ContainerMetrics::new(&registry, &["queued"], &[], &[]);

    assert!(matches!(
        result,
        Err(Error::DuplicateInstrument { name }) if name == "queued"
    ));
}

#[test]
fn registering_a_category_twice_is_rejected_without_partial_state() {
    let registry = MetricsRegistry::new();
    let calls = CallMetrics::new(&registry).unwrap();

    calls
        .register_lifecycle_views(&registry, DIMENSION_NAMES)
        .unwrap();

    let result = calls.register_lifecycle_views(&registry, DIMENSION_NAMES);
    assert!(matches!(result, Err(Error::DuplicateView { .. })));

    // The original views are intact and no duplicates appeared.
    assert_eq!(registry.collect().views().count(), 8);
}

#[test]
fn invalid_dimension_name_fails_registration_before_any_view_lands() {
    let registry = MetricsRegistry::new();
    let calls = CallMetrics::new(&registry).unwrap();

    let result = calls.register_lifecycle_views(&registry, &["appname", ""]);

    assert!(matches!(result, Err(Error::InvalidDimensionKey { .. })));
    assert_eq!(registry.collect().views().count(), 0);
}

#[test]
fn resolver_rejects_syntactically_invalid_keys() {
    assert!(resolve_dimension_keys(&["appname"]).is_ok());
    assert!(resolve_dimension_keys(&[""]).is_err());
    assert!(resolve_dimension_keys(&["caf\u{e9}"]).is_err());

    let too_long = "k".repeat(256);
    assert!(resolve_dimension_keys(&[too_long]).is_err());
}

#[test]
fn placeholder_heavy_key_lists_produce_only_real_instruments() {
    let registry = MetricsRegistry::new();

    let containers = ContainerMetrics::new(
        &registry,
        &["", "", "container_idle", ""],
        &["", "container_idle_duration", "", ""],
        &[],
    )
    .unwrap();

    containers
        .register_container_views(&registry, DIMENSION_NAMES)
        .unwrap();

    let report = registry.collect();

    assert_eq!(report.views().count(), 2);
    assert!(report.view("container_idle").is_some());
    assert!(report.view("container_idle_duration").is_some());
}

#[test]
fn views_can_group_by_no_dimensions_at_all() {
    let registry = MetricsRegistry::new();
    let calls = CallMetrics::new(&registry).unwrap();

    calls.register_lifecycle_views(&registry, &[]).unwrap();

    let report = registry.collect();

    for view in report.views() {
        assert_eq!(view.dimension_keys().count(), 0);
    }
}
