/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! An in-process metrics library: a typed registry of instruments keyed by
//! dotted paths and tag sets, and the lock-free skiplist backing sampled
//! instruments.

mod error;
pub use error::{MetricError, ParseError};

mod clock;
pub use clock::{ManualClock, MetricClock, SystemClock};

mod path;
pub use path::{MetricPath, MetricPathDisplay, PathSegment};

mod tag;
pub use tag::{TagMap, TagMapDisplay, TagName, TagValue};

mod value;
pub use value::MetricValue;

mod snapshot;
pub use snapshot::{CounterSnapshot, EwmaSnapshot, Metric, MetricSnapshot, Snapshot, SnapshotVisitor};

mod counter;
pub use counter::{Counter, CounterValue};

mod config;
pub use config::{DEFAULT_EWMA_INTERVAL, EwmaConfig};

mod ewma;
pub use ewma::Ewma;

mod registry;
pub use registry::{MetricContainer, MetricsRegistry, RegisteredMetric};

mod skiplist;
pub use skiplist::{Entry, Iter, SkipList};
