// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoded data points.
//!
//! A [`DataPoint`] leaves the protocol parser carrying a raw, device-relative
//! offset ([`PointTime::Offset`]) and is resolved to an absolute UTC instant
//! by the timestamp reconstructor before it is queued for the sink.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// A value stored in a point's field set.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit floating point.
    Float(f64),
    /// 64-bit signed integer (`42i` on the wire).
    Integer(i64),
    /// UTF-8 string.
    String(String),
    /// Boolean value.
    Boolean(bool),
}

impl FieldValue {
    /// Returns true for a floating-point NaN.
    pub fn is_nan(&self) -> bool {
        matches!(self, FieldValue::Float(v) if v.is_nan())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}i", v),
            FieldValue::String(v) => write!(f, "{:?}", v),
            FieldValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

/// Time carried by a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointTime {
    /// Raw per-line offset as encoded by the device, unit depends on the protocol version.
    Offset(i64),
    /// Resolved absolute instant.
    Absolute(DateTime<Utc>),
}

impl PointTime {
    /// Absolute instant, if resolved.
    pub fn absolute(&self) -> Option<DateTime<Utc>> {
        match self {
            PointTime::Absolute(ts) => Some(*ts),
            PointTime::Offset(_) => None,
        }
    }
}

/// Tag set (keys unique, sorted).
pub type Tags = BTreeMap<String, String>;

/// Field set (keys unique, sorted).
pub type Fields = BTreeMap<String, FieldValue>;

/// One telemetry record.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Measurement name, already prefixed.
    pub measurement: String,
    /// Tag set.
    pub tags: Tags,
    /// Field set.
    pub fields: Fields,
    /// Raw offset while decoding, absolute once reconstructed.
    pub time: PointTime,
}

impl DataPoint {
    /// Create a point with no tags or fields.
    pub fn new(measurement: impl Into<String>, time: PointTime) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Tags::new(),
            fields: Fields::new(),
            time,
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Absolute timestamp, if reconstructed.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.time.absolute()
    }

    /// True for synthetic `metric_error` points.
    pub fn is_error(&self) -> bool {
        self.fields.contains_key("error")
    }
}
