/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tagmetrics::{
    Counter, ManualClock, MetricError, MetricPath, MetricSnapshot, MetricsRegistry,
    RegisteredMetric, TagMap, TagName, TagValue,
};

fn path(s: &str) -> MetricPath {
    MetricPath::parse(s).unwrap()
}

fn tags(pairs: &[(&str, &str)]) -> TagMap {
    pairs
        .iter()
        .map(|(n, v)| {
            (
                TagName::from_str(n).unwrap(),
                TagValue::from_str(v).unwrap(),
            )
        })
        .collect()
}

#[test]
fn counter_then_ewma_is_a_type_mismatch() {
    let registry = MetricsRegistry::new();

    registry
        .counter_with_initial::<i64>(path("a.b"), 1, TagMap::default())
        .unwrap();

    let err = registry
        .ewma_with_interval(
            path("a.b"),
            Duration::from_secs(10),
            Duration::from_secs(1),
            TagMap::default(),
        )
        .unwrap_err();

    match err {
        MetricError::TypeMismatch { existing, desired } => {
            assert_eq!(existing, "counter<i64>");
            assert_eq!(desired, "ewma");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mismatch_is_per_path_not_per_tag_set() {
    let registry = MetricsRegistry::new();

    registry
        .counter::<i64>(path("a.b"), tags(&[("host", "h1")]))
        .unwrap();

    // a different tag set does not get around the container type
    let err = registry
        .ewma(
            path("a.b"),
            Duration::from_secs(10),
            tags(&[("host", "h2")]),
        )
        .unwrap_err();
    assert!(matches!(err, MetricError::TypeMismatch { .. }));
}

#[test]
fn repeated_lookup_returns_the_same_instrument() {
    let registry = MetricsRegistry::new();
    let t = tags(&[("host", "h1")]);

    let a = registry.counter::<i64>(path("req.total"), t.clone()).unwrap();
    let b = registry.counter::<i64>(path("req.total"), t).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let c = registry
        .counter::<i64>(path("req.total"), tags(&[("host", "h2")]))
        .unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn tag_insertion_order_is_canonical() {
    let registry = MetricsRegistry::new();

    let a = registry
        .counter::<i64>(path("req.total"), tags(&[("host", "h1"), ("app", "web")]))
        .unwrap();
    let b = registry
        .counter::<i64>(path("req.total"), tags(&[("app", "web"), ("host", "h1")]))
        .unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn concurrent_registration_elects_one_instrument() {
    let registry = Arc::new(MetricsRegistry::new());
    let mut workers = Vec::new();

    for _ in 0..16 {
        let registry = registry.clone();
        workers.push(thread::spawn(move || {
            let counter = registry
                .counter::<i64>(path("req.total"), tags(&[("host", "h1")]))
                .unwrap();
            for _ in 0..1000 {
                counter.incr_one();
            }
        }));
    }
    for w in workers {
        w.join().unwrap();
    }

    let counter = registry
        .counter::<i64>(path("req.total"), tags(&[("host", "h1")]))
        .unwrap();
    assert_eq!(counter.value(), 16_000);
}

#[test]
fn publisher_walks_every_container() {
    let clock = Arc::new(ManualClock::new());
    let registry = MetricsRegistry::with_clock(clock.clone());

    registry
        .counter_with_initial::<i64>(path("req.total"), 5, tags(&[("host", "h1")]))
        .unwrap();
    registry
        .counter_with_initial::<i64>(path("req.total"), 7, tags(&[("host", "h2")]))
        .unwrap();
    let ewma = registry
        .ewma_with_interval(
            path("req.rate"),
            Duration::from_secs(10),
            Duration::from_secs(1),
            TagMap::default(),
        )
        .unwrap();

    ewma.mark(15.0);
    clock.advance(Duration::from_secs(1));

    let mut lines = Vec::new();
    registry.visit_registered_metrics(|path, container| {
        let mut visitor = |tags: &TagMap, snapshot: MetricSnapshot| {
            let rendered = match snapshot {
                MetricSnapshot::Counter(s) => s.value().to_string(),
                MetricSnapshot::Ewma(s) => format!("{:.3}", s.rate()),
            };
            lines.push(format!("{path}[{tags}] {rendered}"));
        };
        container.visit_snapshots(&mut visitor);
    });
    lines.sort();

    let alpha = 1.0 - (-0.1_f64).exp();
    assert_eq!(
        lines,
        vec![
            format!("req.rate[] {:.3}", alpha * 15.0),
            "req.total[host=h1] 5".to_string(),
            "req.total[host=h2] 7".to_string(),
        ]
    );
}

#[test]
fn aggregate_merges_across_tag_sets() {
    let registry = MetricsRegistry::new();

    registry
        .counter_with_initial::<i64>(path("req.total"), 10, tags(&[("host", "h1")]))
        .unwrap();
    registry
        .counter_with_initial::<i64>(path("req.total"), 32, tags(&[("host", "h2")]))
        .unwrap();

    let mut merged = None;
    registry.visit_registered_metrics(|_, container| {
        merged = container.aggregate_snapshot();
    });

    let snapshot = merged.unwrap();
    assert_eq!(snapshot.as_counter().unwrap().value().as_f64(), 42.0);
}

#[test]
fn typed_downcast_from_dyn_container() {
    let registry = MetricsRegistry::new();
    registry
        .counter_with_initial::<i64>(path("req.total"), 3, TagMap::default())
        .unwrap();

    let mut seen = false;
    registry.visit_registered_metrics(|_, container| {
        let typed = container
            .as_any()
            .downcast_ref::<RegisteredMetric<Counter<i64>>>()
            .unwrap();
        typed.visit(|_, snapshot| {
            assert_eq!(snapshot.value().as_f64(), 3.0);
            seen = true;
        });
    });
    assert!(seen);
}

#[test]
fn ewma_decays_through_the_registry_clock() {
    let clock = Arc::new(ManualClock::new());
    let registry = MetricsRegistry::with_clock(clock.clone());

    let ewma = registry
        .ewma_with_interval(
            path("req.rate"),
            Duration::from_secs(10),
            Duration::from_secs(1),
            TagMap::default(),
        )
        .unwrap();
    let alpha = 1.0 - (-0.1_f64).exp();

    ewma.mark(15.0);
    clock.advance(Duration::from_secs(1));
    let first = ewma.rate();
    assert!((first - alpha * 15.0).abs() < 1e-9);

    clock.advance(Duration::from_secs(2));
    let decayed = ewma.rate();
    assert!((decayed - first * (1.0 - alpha) * (1.0 - alpha)).abs() < 1e-9);
}
