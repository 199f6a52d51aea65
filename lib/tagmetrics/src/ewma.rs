/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use portable_atomic::AtomicF64;

use crate::clock::MetricClock;
use crate::error::MetricError;
use crate::snapshot::{EwmaSnapshot, Metric};

/// An exponentially weighted moving average over a decay window.
///
/// Samples recorded by [`mark`](Ewma::mark) accumulate into the bucket of
/// the in-progress interval. Whenever the average is read, elapsed
/// intervals are folded in first: the pending bucket with weight
/// `alpha = 1 - exp(-interval / window)`, and each further empty interval
/// as plain decay.
pub struct Ewma {
    alpha: f64,
    interval_nanos: u64,
    clock: Arc<dyn MetricClock>,
    start: Instant,
    // offset from start in nanos, always a multiple of interval_nanos;
    // a successful CAS here elects the one thread that applies the decay
    last_tick: AtomicU64,
    bucket: AtomicF64,
    rate: AtomicF64,
}

impl Ewma {
    pub fn new(
        window: Duration,
        interval: Duration,
        clock: Arc<dyn MetricClock>,
    ) -> Result<Self, MetricError> {
        if interval.is_zero() {
            return Err(MetricError::InvalidParameter("ewma interval must be > 0"));
        }
        if window < interval {
            return Err(MetricError::InvalidParameter(
                "ewma window must not be shorter than its interval",
            ));
        }

        let alpha = 1.0 - (-interval.as_secs_f64() / window.as_secs_f64()).exp();
        let start = clock.now();
        Ok(Ewma {
            alpha,
            interval_nanos: interval.as_nanos() as u64,
            clock,
            start,
            last_tick: AtomicU64::new(0),
            bucket: AtomicF64::new(0.0),
            rate: AtomicF64::new(0.0),
        })
    }

    /// Record a sample at the current time.
    pub fn mark(&self, value: f64) {
        self.tick();
        self.bucket.fetch_add(value, Ordering::AcqRel);
    }

    /// The decayed average, advanced to now.
    pub fn rate(&self) -> f64 {
        self.tick();
        self.rate.load(Ordering::Acquire)
    }

    fn nanos_since_start(&self) -> u64 {
        self.clock
            .now()
            .saturating_duration_since(self.start)
            .as_nanos() as u64
    }

    fn tick(&self) {
        let now = self.nanos_since_start();
        let last = self.last_tick.load(Ordering::Acquire);
        let intervals = now.saturating_sub(last) / self.interval_nanos;
        if intervals == 0 {
            return;
        }

        let next = last + intervals * self.interval_nanos;
        if self
            .last_tick
            .compare_exchange(last, next, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // another thread owns this tick
            return;
        }

        let sum = self.bucket.swap(0.0, Ordering::AcqRel);
        let mut rate = self.rate.load(Ordering::Acquire);
        rate += self.alpha * (sum - rate);
        if intervals > 1 {
            rate *= (1.0 - self.alpha).powf((intervals - 1) as f64);
        }
        self.rate.store(rate, Ordering::Release);
    }
}

impl std::fmt::Debug for Ewma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ewma")
            .field("alpha", &self.alpha)
            .field("interval_nanos", &self.interval_nanos)
            .field("rate", &self.rate.load(Ordering::Acquire))
            .finish()
    }
}

impl Metric for Ewma {
    type Snapshot = EwmaSnapshot;

    fn type_name() -> String {
        "ewma".to_string()
    }

    fn snapshot(&self) -> EwmaSnapshot {
        EwmaSnapshot::new(self.rate())
    }
}
