/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::tag::TagMap;
use crate::value::MetricValue;

/// An immutable value describing the state of one instrument, or of a
/// merged set of instruments of the same kind.
pub trait Snapshot: Clone + Send + Into<MetricSnapshot> + 'static {
    /// Combine two snapshots of the same kind into one.
    fn merge(self, other: Self) -> Self;
}

/// A live metric object producing snapshots.
pub trait Metric: Send + Sync + 'static {
    type Snapshot: Snapshot;

    /// The kind identifier checked on registration, e.g. `counter<i64>`.
    fn type_name() -> String;

    fn snapshot(&self) -> Self::Snapshot;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterSnapshot {
    value: MetricValue,
}

impl CounterSnapshot {
    pub(crate) fn new(value: MetricValue) -> Self {
        CounterSnapshot { value }
    }

    #[inline]
    pub fn value(&self) -> MetricValue {
        self.value
    }
}

impl Snapshot for CounterSnapshot {
    fn merge(self, other: Self) -> Self {
        CounterSnapshot {
            value: self.value + other.value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EwmaSnapshot {
    rate: f64,
}

impl EwmaSnapshot {
    pub(crate) fn new(rate: f64) -> Self {
        EwmaSnapshot { rate }
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl Snapshot for EwmaSnapshot {
    fn merge(self, other: Self) -> Self {
        EwmaSnapshot {
            rate: (self.rate + other.rate) / 2.0,
        }
    }
}

/// The sum of all known snapshot kinds, used when walking containers of
/// unknown instrument type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricSnapshot {
    Counter(CounterSnapshot),
    Ewma(EwmaSnapshot),
}

impl MetricSnapshot {
    pub fn as_counter(&self) -> Option<&CounterSnapshot> {
        match self {
            MetricSnapshot::Counter(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ewma(&self) -> Option<&EwmaSnapshot> {
        match self {
            MetricSnapshot::Ewma(s) => Some(s),
            _ => None,
        }
    }
}

impl From<CounterSnapshot> for MetricSnapshot {
    fn from(value: CounterSnapshot) -> Self {
        MetricSnapshot::Counter(value)
    }
}

impl From<EwmaSnapshot> for MetricSnapshot {
    fn from(value: EwmaSnapshot) -> Self {
        MetricSnapshot::Ewma(value)
    }
}

/// Receiver for per-tag snapshots when traversing a container whose
/// instrument kind is not statically known.
///
/// Implementations must not keep references into instrument state beyond
/// the call; the snapshot is a value and may be stored freely.
pub trait SnapshotVisitor {
    fn visit(&mut self, tags: &TagMap, snapshot: MetricSnapshot);
}

impl<F> SnapshotVisitor for F
where
    F: FnMut(&TagMap, MetricSnapshot),
{
    fn visit(&mut self, tags: &TagMap, snapshot: MetricSnapshot) {
        self(tags, snapshot)
    }
}
