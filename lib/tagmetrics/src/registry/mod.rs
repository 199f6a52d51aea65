/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ahash::AHashMap;
use log::debug;

use crate::clock::{MetricClock, SystemClock};
use crate::config::EwmaConfig;
use crate::counter::{Counter, CounterValue};
use crate::error::MetricError;
use crate::ewma::Ewma;
use crate::path::MetricPath;
use crate::snapshot::Metric;
use crate::tag::TagMap;

mod container;
pub use container::{MetricContainer, RegisteredMetric};

/// The process-wide mapping from metric path to its typed container.
///
/// The outer map is guarded by one mutex, each container guards its own tag
/// map. Lookups clone the container handle and drop the registry lock
/// before touching instruments, so registration never blocks behind a slow
/// publisher.
pub struct MetricsRegistry {
    inner: Mutex<AHashMap<Arc<MetricPath>, Arc<dyn MetricContainer>>>,
    clock: Arc<dyn MetricClock>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        MetricsRegistry::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        MetricsRegistry::with_clock(SystemClock::shared())
    }

    /// A registry whose time-based instruments read the given clock.
    pub fn with_clock(clock: Arc<dyn MetricClock>) -> Self {
        MetricsRegistry {
            inner: Mutex::new(AHashMap::new()),
            clock,
        }
    }

    /// Resolve the container at `path`, creating it when absent. A container
    /// of a different instrument kind at the same path is a
    /// [`MetricError::TypeMismatch`].
    pub fn get_or_create_container<K: Metric>(
        &self,
        path: MetricPath,
    ) -> Result<Arc<RegisteredMetric<K>>, MetricError> {
        let desired = K::type_name();

        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.get(&path) {
            let existing = existing.clone();
            drop(inner);

            let existing_type = existing.type_name().to_string();
            return existing
                .into_any()
                .downcast::<RegisteredMetric<K>>()
                .map_err(|_| MetricError::TypeMismatch {
                    existing: existing_type,
                    desired,
                });
        }

        let container = Arc::new(RegisteredMetric::<K>::new());
        let path = Arc::new(path);
        inner.insert(path.clone(), container.clone());
        drop(inner);

        debug!("registered metric {path} of type {desired}");
        Ok(container)
    }

    /// The counter at `(path, tags)`, registered with value 0 when absent.
    pub fn counter<T: CounterValue>(
        &self,
        path: MetricPath,
        tags: TagMap,
    ) -> Result<Arc<Counter<T>>, MetricError> {
        self.counter_with_initial(path, T::ZERO, tags)
    }

    /// The counter at `(path, tags)`. `initial` only applies when this call
    /// registers the instrument.
    pub fn counter_with_initial<T: CounterValue>(
        &self,
        path: MetricPath,
        initial: T,
        tags: TagMap,
    ) -> Result<Arc<Counter<T>>, MetricError> {
        let container = self.get_or_create_container::<Counter<T>>(path)?;
        container.find_or_create(tags, || Ok(Counter::new(initial)))
    }

    /// The EWMA at `(path, tags)` with the default sampling interval. The
    /// decay parameters only apply when this call registers the instrument.
    pub fn ewma(
        &self,
        path: MetricPath,
        window: Duration,
        tags: TagMap,
    ) -> Result<Arc<Ewma>, MetricError> {
        self.ewma_with_config(path, EwmaConfig::with_window(window), tags)
    }

    pub fn ewma_with_interval(
        &self,
        path: MetricPath,
        window: Duration,
        interval: Duration,
        tags: TagMap,
    ) -> Result<Arc<Ewma>, MetricError> {
        let mut config = EwmaConfig::with_window(window);
        config.set_interval(interval);
        self.ewma_with_config(path, config, tags)
    }

    pub fn ewma_with_config(
        &self,
        path: MetricPath,
        config: EwmaConfig,
        tags: TagMap,
    ) -> Result<Arc<Ewma>, MetricError> {
        let container = self.get_or_create_container::<Ewma>(path)?;
        let clock = self.clock.clone();
        container.find_or_create(tags, move || config.build(clock))
    }

    /// Call `handler` for every registered path. The registry lock is only
    /// held to snapshot the container list; the handler runs outside it.
    pub fn visit_registered_metrics<F>(&self, mut handler: F)
    where
        F: FnMut(&MetricPath, &dyn MetricContainer),
    {
        let containers: Vec<(Arc<MetricPath>, Arc<dyn MetricContainer>)> = {
            let inner = self.inner.lock().unwrap();
            inner
                .iter()
                .map(|(path, container)| (path.clone(), container.clone()))
                .collect()
        };

        for (path, container) in containers {
            handler(&path, container.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> MetricPath {
        MetricPath::parse(s).unwrap()
    }

    #[test]
    fn counter_identity_across_lookups() {
        let registry = MetricsRegistry::new();

        let a = registry
            .counter::<i64>(path("req.total"), TagMap::default())
            .unwrap();
        a.incr(3);
        let b = registry
            .counter_with_initial::<i64>(path("req.total"), 100, TagMap::default())
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.value(), 3);
    }

    #[test]
    fn type_mismatch_on_same_path() {
        let registry = MetricsRegistry::new();

        registry
            .counter_with_initial::<i64>(path("a.b"), 1, TagMap::default())
            .unwrap();
        let err = registry
            .ewma(path("a.b"), Duration::from_secs(10), TagMap::default())
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
    fn counter_value_types_are_distinct() {
        let registry = MetricsRegistry::new();

        registry
            .counter::<i64>(path("a.b"), TagMap::default())
            .unwrap();
        let err = registry
            .counter::<u64>(path("a.b"), TagMap::default())
            .unwrap_err();
        assert!(matches!(err, MetricError::TypeMismatch { .. }));
    }

    #[test]
    fn visit_runs_for_each_path() {
        let registry = MetricsRegistry::new();
        registry
            .counter::<i64>(path("a.one"), TagMap::default())
            .unwrap();
        registry
            .counter::<i64>(path("a.two"), TagMap::default())
            .unwrap();

        let mut paths = Vec::new();
        registry.visit_registered_metrics(|path, container| {
            paths.push(format!("{path}:{}", container.type_name()));
        });
        paths.sort();
        assert_eq!(paths, vec!["a.one:counter<i64>", "a.two:counter<i64>"]);
    }

    #[test]
    fn invalid_ewma_parameters_do_not_register() {
        let registry = MetricsRegistry::new();

        let err = registry
            .ewma_with_interval(
                path("lat.rate"),
                Duration::from_secs(1),
                Duration::from_secs(10),
                TagMap::default(),
            )
            .unwrap_err();
        assert!(matches!(err, MetricError::InvalidParameter(_)));

        // the path is now registered as an ewma container, but no
        // instrument was inserted
        registry.visit_registered_metrics(|_, container| {
            assert!(container.aggregate_snapshot().is_none());
        });
    }
}
