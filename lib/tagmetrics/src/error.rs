/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::Utf8Error;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty name")]
    Empty,
    #[error("invalid leading char: {0:?}")]
    InvalidLeadingChar(char),
    #[error("unsupported char: {0:?}")]
    InvalidChar(char),
    #[error("not a numeric value")]
    InvalidNumber,
    #[error("invalid utf-8 string: {0}")]
    InvalidUtf8(#[from] Utf8Error),
}

#[derive(Debug, Error)]
pub enum MetricError {
    /// A differently typed metric is already registered at the requested path.
    #[error("registered metric is of type {existing}, not {desired}")]
    TypeMismatch { existing: String, desired: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}
