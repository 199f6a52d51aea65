/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;
use std::fmt::{self, Write};
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::ParseError;

/// A single node of a dotted metric path: one or more ASCII alphanumerics,
/// `-` or `_`. The delimiter is never part of a segment.
#[derive(Debug, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct PathSegment(SmolStr);

impl PathSegment {
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PathSegment {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for PathSegment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        for c in s.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_') {
                return Err(ParseError::InvalidChar(c));
            }
        }
        Ok(PathSegment(s.into()))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The registered name of a metric, an ordered sequence of non-empty
/// segments. Equality and hashing are structural, so two paths parsed from
/// the same dotted string always address the same registry slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricPath {
    nodes: VecDeque<PathSegment>,
}

impl MetricPath {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        Self::parse_with_delimiter(s, '.')
    }

    pub fn parse_with_delimiter(s: &str, delimiter: char) -> Result<Self, ParseError> {
        let mut nodes = VecDeque::new();
        for node in s.split(delimiter) {
            nodes.push_back(PathSegment::from_str(node)?);
        }

        Ok(MetricPath { nodes })
    }

    pub fn add_prefix(&mut self, prefix: &MetricPath) {
        let mut new_nodes = prefix.nodes.clone();
        new_nodes.append(&mut self.nodes);
        self.nodes = new_nodes;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.nodes.iter()
    }

    pub fn display(&self, delimiter: char) -> MetricPathDisplay<'_> {
        MetricPathDisplay {
            nodes: &self.nodes,
            delimiter,
        }
    }
}

impl<T: IntoIterator<Item = PathSegment>> From<T> for MetricPath {
    fn from(value: T) -> Self {
        MetricPath {
            nodes: value.into_iter().collect(),
        }
    }
}

impl FromStr for MetricPath {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricPath::parse(s)
    }
}

impl fmt::Display for MetricPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display('.'), f)
    }
}

pub struct MetricPathDisplay<'a> {
    nodes: &'a VecDeque<PathSegment>,
    delimiter: char,
}

impl fmt::Display for MetricPathDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for node in self.nodes {
            if !first {
                f.write_char(self.delimiter)?;
            }
            first = false;
            f.write_str(node.as_str())?;
        }
        Ok(())
    }
}
