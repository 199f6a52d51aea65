/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use crate::clock::MetricClock;
use crate::error::MetricError;
use crate::ewma::Ewma;

pub const DEFAULT_EWMA_INTERVAL: Duration = Duration::from_secs(5);

/// Decay parameters for an [`Ewma`] instrument: the full decay window and
/// the sampling interval within it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EwmaConfig {
    window: Duration,
    interval: Duration,
}

impl EwmaConfig {
    pub fn with_window(window: Duration) -> Self {
        EwmaConfig {
            window,
            interval: DEFAULT_EWMA_INTERVAL,
        }
    }

    #[inline]
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    #[inline]
    pub fn window(&self) -> Duration {
        self.window
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn build(&self, clock: Arc<dyn MetricClock>) -> Result<Ewma, MetricError> {
        Ewma::new(self.window, self.interval, clock)
    }
}
