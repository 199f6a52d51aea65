/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::ParseError;

/// A tag name: an ASCII letter followed by any mix of ASCII alphanumerics,
/// `-`, `_` and `.`.
#[derive(Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct TagName(SmolStr);

impl TagName {
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for TagName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            None => return Err(ParseError::Empty),
            Some(c) if !c.is_ascii_alphabetic() => {
                return Err(ParseError::InvalidLeadingChar(c));
            }
            Some(_) => {}
        }
        for c in chars {
            if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.') {
                return Err(ParseError::InvalidChar(c));
            }
        }
        Ok(TagName(s.into()))
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tag value: printable ASCII except `=`, `:` and `,`, which the text
/// formats use as structure. May be empty.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct TagValue(SmolStr);

impl TagValue {
    pub fn empty() -> Self {
        TagValue(SmolStr::new_static(""))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for TagValue {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for TagValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for c in s.chars() {
            if !c.is_ascii_graphic() || matches!(c, '=' | ':' | ',') {
                return Err(ParseError::InvalidChar(c));
            }
        }
        Ok(TagValue(s.into()))
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tag permutation of a metric.
///
/// The inner map is ordered, so two maps holding the same name to value
/// mapping compare and hash equal no matter the insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagMap {
    inner: BTreeMap<TagName, TagValue>,
}

impl TagMap {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn insert(&mut self, name: TagName, value: TagValue) -> Option<TagValue> {
        self.inner.insert(name, value)
    }

    #[inline]
    pub fn extend(&mut self, other: Self) {
        self.inner.extend(other.inner)
    }

    #[inline]
    pub fn contains(&self, key: &TagName) -> bool {
        self.inner.contains_key(key)
    }

    #[inline]
    pub fn get(&self, key: &TagName) -> Option<&TagValue> {
        self.inner.get(key)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&TagName, &TagValue)> {
        self.inner.iter()
    }

    #[inline]
    pub fn drop(&mut self, name: &TagName) {
        self.inner.remove(name);
    }

    /// Merge statsd formatted tags into the map: `name:value` fields
    /// separated by `,`, a bare `name` standing for an empty value. Later
    /// fields win over earlier ones with the same name.
    pub fn parse_statsd(&mut self, data: &[u8]) -> Result<(), ParseError> {
        let text = std::str::from_utf8(data)?;
        for field in text.split(',') {
            if field.is_empty() {
                continue;
            }
            let (name, value) = match field.split_once(':') {
                Some((name, value)) => (TagName::from_str(name)?, TagValue::from_str(value)?),
                None => (TagName::from_str(field)?, TagValue::empty()),
            };
            self.inner.insert(name, value);
        }
        Ok(())
    }

    pub fn display_statsd(&self) -> TagMapDisplay<'_> {
        TagMapDisplay {
            map: self,
            assign: ':',
            separator: ',',
        }
    }
}

impl FromIterator<(TagName, TagValue)> for TagMap {
    fn from_iter<T: IntoIterator<Item = (TagName, TagValue)>>(iter: T) -> Self {
        TagMap {
            inner: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for TagMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display = TagMapDisplay {
            map: self,
            assign: '=',
            separator: ',',
        };
        fmt::Display::fmt(&display, f)
    }
}

pub struct TagMapDisplay<'a> {
    map: &'a TagMap,
    assign: char,
    separator: char,
}

impl fmt::Display for TagMapDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.map.inner {
            if !first {
                f.write_char(self.separator)?;
            }
            first = false;
            f.write_str(name.as_str())?;
            f.write_char(self.assign)?;
            f.write_str(value.as_str())?;
        }
        Ok(())
    }
}
