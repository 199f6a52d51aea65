/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::ops::Neg;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use portable_atomic::AtomicF64;

use crate::snapshot::{CounterSnapshot, Metric};
use crate::value::MetricValue;

/// A scalar type a [`Counter`] can accumulate.
pub trait CounterValue: Copy + Send + Sync + 'static {
    type Atomic: Send + Sync;

    const ZERO: Self;
    const ONE: Self;
    const TYPE_ID: &'static str;

    fn new_atomic(value: Self) -> Self::Atomic;
    fn fetch_add(atomic: &Self::Atomic, delta: Self);
    fn load(atomic: &Self::Atomic) -> Self;
    fn into_metric_value(self) -> MetricValue;
}

impl CounterValue for i64 {
    type Atomic = AtomicI64;

    const ZERO: Self = 0;
    const ONE: Self = 1;
    const TYPE_ID: &'static str = "i64";

    fn new_atomic(value: Self) -> Self::Atomic {
        AtomicI64::new(value)
    }

    fn fetch_add(atomic: &Self::Atomic, delta: Self) {
        atomic.fetch_add(delta, Ordering::Relaxed);
    }

    fn load(atomic: &Self::Atomic) -> Self {
        atomic.load(Ordering::Relaxed)
    }

    fn into_metric_value(self) -> MetricValue {
        MetricValue::Signed(self)
    }
}

impl CounterValue for u64 {
    type Atomic = AtomicU64;

    const ZERO: Self = 0;
    const ONE: Self = 1;
    const TYPE_ID: &'static str = "u64";

    fn new_atomic(value: Self) -> Self::Atomic {
        AtomicU64::new(value)
    }

    fn fetch_add(atomic: &Self::Atomic, delta: Self) {
        atomic.fetch_add(delta, Ordering::Relaxed);
    }

    fn load(atomic: &Self::Atomic) -> Self {
        atomic.load(Ordering::Relaxed)
    }

    fn into_metric_value(self) -> MetricValue {
        MetricValue::Unsigned(self)
    }
}

impl CounterValue for f64 {
    type Atomic = AtomicF64;

    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const TYPE_ID: &'static str = "f64";

    fn new_atomic(value: Self) -> Self::Atomic {
        AtomicF64::new(value)
    }

    fn fetch_add(atomic: &Self::Atomic, delta: Self) {
        atomic.fetch_add(delta, Ordering::Relaxed);
    }

    fn load(atomic: &Self::Atomic) -> Self {
        atomic.load(Ordering::Relaxed)
    }

    fn into_metric_value(self) -> MetricValue {
        MetricValue::Double(self)
    }
}

/// An accumulator over a user selected scalar type. Signed types accept
/// negative increments.
pub struct Counter<T: CounterValue = i64> {
    value: T::Atomic,
}

impl<T: CounterValue + std::fmt::Debug> std::fmt::Debug for Counter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counter").field("value", &self.value()).finish()
    }
}

impl<T: CounterValue> Default for Counter<T> {
    fn default() -> Self {
        Counter::new(T::ZERO)
    }
}

impl<T: CounterValue> Counter<T> {
    pub fn new(initial: T) -> Self {
        Counter {
            value: T::new_atomic(initial),
        }
    }

    #[inline]
    pub fn incr(&self, delta: T) {
        T::fetch_add(&self.value, delta);
    }

    #[inline]
    pub fn incr_one(&self) {
        self.incr(T::ONE);
    }

    #[inline]
    pub fn value(&self) -> T {
        T::load(&self.value)
    }
}

impl<T: CounterValue + Neg<Output = T>> Counter<T> {
    #[inline]
    pub fn decr(&self, delta: T) {
        self.incr(-delta);
    }
}

impl<T: CounterValue> Metric for Counter<T> {
    type Snapshot = CounterSnapshot;

    fn type_name() -> String {
        format!("counter<{}>", T::TYPE_ID)
    }

    fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot::new(self.value().into_metric_value())
    }
}
