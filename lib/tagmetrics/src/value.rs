/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::ops;
use std::str::FromStr;

use crate::error::ParseError;

/// The scalar carried by a counter snapshot.
///
/// Addition keeps same-kind sums in kind (wrapping on overflow, as the
/// counters themselves do); mixing kinds promotes the result to floating
/// point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Signed(i64),
    Unsigned(u64),
    Double(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Signed(i) => *i as f64,
            MetricValue::Unsigned(u) => *u as f64,
            MetricValue::Double(f) => *f,
        }
    }
}

impl FromStr for MetricValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        if let Ok(u) = u64::from_str(s) {
            return Ok(MetricValue::Unsigned(u));
        }
        if let Ok(i) = i64::from_str(s) {
            return Ok(MetricValue::Signed(i));
        }
        match f64::from_str(s) {
            Ok(v) if v.is_finite() => Ok(MetricValue::Double(v)),
            _ => Err(ParseError::InvalidNumber),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Signed(v) => write!(f, "{v}"),
            MetricValue::Unsigned(v) => write!(f, "{v}"),
            MetricValue::Double(v) => f.write_str(ryu::Buffer::new().format(*v)),
        }
    }
}

impl ops::Add for MetricValue {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (MetricValue::Signed(a), MetricValue::Signed(b)) => {
                MetricValue::Signed(a.wrapping_add(b))
            }
            (MetricValue::Unsigned(a), MetricValue::Unsigned(b)) => {
                MetricValue::Unsigned(a.wrapping_add(b))
            }
            (MetricValue::Double(a), MetricValue::Double(b)) => MetricValue::Double(a + b),
            (a, b) => MetricValue::Double(a.as_f64() + b.as_f64()),
        }
    }
}

impl ops::AddAssign for MetricValue {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(
            MetricValue::from_str("10").unwrap(),
            MetricValue::Unsigned(10)
        );
        assert_eq!(
            MetricValue::from_str("-10").unwrap(),
            MetricValue::Signed(-10)
        );
        assert_eq!(
            MetricValue::from_str("2.5").unwrap(),
            MetricValue::Double(2.5)
        );
        assert_eq!(
            MetricValue::from_str("1e3").unwrap(),
            MetricValue::Double(1000.0)
        );

        assert!(matches!(
            MetricValue::from_str(""),
            Err(ParseError::Empty)
        ));
        assert!(matches!(
            MetricValue::from_str("x"),
            Err(ParseError::InvalidNumber)
        ));
        // non-finite values are not usable as metric scalars
        assert!(MetricValue::from_str("nan").is_err());
        assert!(MetricValue::from_str("inf").is_err());
    }

    #[test]
    fn same_kind_add_stays_in_kind() {
        assert_eq!(
            MetricValue::Signed(3) + MetricValue::Signed(-5),
            MetricValue::Signed(-2)
        );
        assert_eq!(
            MetricValue::Unsigned(1) + MetricValue::Unsigned(2),
            MetricValue::Unsigned(3)
        );
        assert_eq!(
            MetricValue::Double(0.5) + MetricValue::Double(0.25),
            MetricValue::Double(0.75)
        );
    }

    #[test]
    fn mixed_kind_add_promotes_to_double() {
        assert_eq!(
            MetricValue::Unsigned(10) + MetricValue::Signed(-4),
            MetricValue::Double(6.0)
        );
        assert_eq!(
            MetricValue::Signed(2) + MetricValue::Double(0.5),
            MetricValue::Double(2.5)
        );

        let mut v = MetricValue::Unsigned(1);
        v += MetricValue::Double(1.0);
        assert_eq!(v, MetricValue::Double(2.0));
    }

    #[test]
    fn display() {
        assert_eq!(MetricValue::Unsigned(10).to_string(), "10");
        assert_eq!(MetricValue::Signed(-3).to_string(), "-3");
        assert_eq!(MetricValue::Double(1.0).to_string(), "1.0");
        assert_eq!(MetricValue::Double(0.25).to_string(), "0.25");
    }
}
