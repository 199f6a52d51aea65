/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic time source for time-decayed instruments.
///
/// The registry hands its clock to every instrument it creates, so tests
/// can drive decay deterministically by injecting a [`ManualClock`].
pub trait MetricClock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn shared() -> Arc<dyn MetricClock> {
        Arc::new(SystemClock)
    }
}

impl MetricClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset_nanos: AtomicU64,
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            base: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, d: Duration) {
        self.offset_nanos
            .fetch_add(d.as_nanos() as u64, Ordering::Release);
    }
}

impl MetricClock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset_nanos.load(Ordering::Acquire);
        self.base + Duration::from_nanos(offset)
    }
}
