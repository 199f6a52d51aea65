/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::any::Any;
use std::sync::{Arc, Mutex};

use ahash::AHashMap;

use crate::error::MetricError;
use crate::snapshot::{Metric, MetricSnapshot, Snapshot, SnapshotVisitor};
use crate::tag::TagMap;

/// The per-path container: every tag permutation of one metric, all of the
/// same instrument kind.
///
/// Publishers either visit each tagged instrument or aggregate them all
/// into one merged snapshot. Snapshots are taken under the container lock;
/// handlers always run outside it.
pub struct RegisteredMetric<K: Metric> {
    type_name: String,
    inner: Mutex<AHashMap<Arc<TagMap>, Arc<K>>>,
}

impl<K: Metric> Default for RegisteredMetric<K> {
    fn default() -> Self {
        RegisteredMetric::new()
    }
}

impl<K: Metric> RegisteredMetric<K> {
    pub(crate) fn new() -> Self {
        RegisteredMetric {
            type_name: K::type_name(),
            inner: Mutex::new(AHashMap::new()),
        }
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn get(&self, tags: &TagMap) -> Option<Arc<K>> {
        self.inner.lock().unwrap().get(tags).cloned()
    }

    /// Return the instrument at `tags`, building and inserting it if absent.
    /// The builder runs at most once per tag set; when it fails the
    /// container is left unchanged.
    pub fn find_or_create<F>(&self, tags: TagMap, build: F) -> Result<Arc<K>, MetricError>
    where
        F: FnOnce() -> Result<K, MetricError>,
    {
        let mut inner = self.inner.lock().unwrap();
        if let Some(metric) = inner.get(&tags) {
            return Ok(metric.clone());
        }

        let metric = Arc::new(build()?);
        inner.insert(Arc::new(tags), metric.clone());
        Ok(metric)
    }

    /// Call `handler` with the tags and a snapshot of every contained
    /// instrument. Visit order is unspecified.
    pub fn visit<F>(&self, mut handler: F)
    where
        F: FnMut(&TagMap, K::Snapshot),
    {
        let snapshots: Vec<(Arc<TagMap>, K::Snapshot)> = {
            let inner = self.inner.lock().unwrap();
            inner
                .iter()
                .map(|(tags, metric)| (tags.clone(), metric.snapshot()))
                .collect()
        };

        for (tags, snapshot) in snapshots {
            handler(&tags, snapshot);
        }
    }

    /// Merge the snapshots of all tag permutations and call `handler` once
    /// with the result. An empty container calls nothing.
    pub fn aggregate<F>(&self, handler: F)
    where
        F: FnOnce(K::Snapshot),
    {
        let folded = {
            let inner = self.inner.lock().unwrap();
            let mut iter = inner.values();
            iter.next().map(|first| {
                let mut result = first.snapshot();
                for metric in iter {
                    result = result.merge(metric.snapshot());
                }
                result
            })
        };

        if let Some(snapshot) = folded {
            handler(snapshot);
        }
    }
}

/// What the registry knows about a container when the instrument kind is
/// not statically visible: enumerate snapshots, aggregate, report the type
/// name, or hand back the concrete container.
pub trait MetricContainer: Send + Sync + 'static {
    fn type_name(&self) -> &str;

    fn visit_snapshots(&self, visitor: &mut dyn SnapshotVisitor);

    fn aggregate_snapshot(&self) -> Option<MetricSnapshot>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<K: Metric> MetricContainer for RegisteredMetric<K> {
    fn type_name(&self) -> &str {
        RegisteredMetric::type_name(self)
    }

    fn visit_snapshots(&self, visitor: &mut dyn SnapshotVisitor) {
        self.visit(|tags, snapshot| visitor.visit(tags, snapshot.into()));
    }

    fn aggregate_snapshot(&self) -> Option<MetricSnapshot> {
        let mut folded = None;
        self.aggregate(|snapshot| folded = Some(snapshot.into()));
        folded
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
