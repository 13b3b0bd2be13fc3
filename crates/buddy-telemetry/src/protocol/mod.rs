// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Versioned decoding of the serialized points body.
//!
//! The body is line oriented; every version shares the tokenizer in
//! [`line`] and differs in duration unit and line filtering
//! ([`ProtocolVersion`]).
//!
//! # Per-line outcome
//!
//! - Shape error: logged, line skipped, following lines still decoded.
//! - Too long (v4): skipped.
//! - `_seq` tagged (v3): skipped.
//! - Invalid measurement name: replaced by a `<prefix>metric_error` point.
//! - `value` field is NaN: skipped.

pub mod line;
pub mod version;

pub use line::{is_valid_metric_name, parse_line, ParsedLine};
pub use version::{ProtocolVersion, SEQUENCING_TAG, V4_MAX_LINE_LEN};

use crate::error::ParseError;
use crate::point::{DataPoint, FieldValue, PointTime};

/// Measurement suffix of synthetic error points.
pub const METRIC_ERROR_MEASUREMENT: &str = "metric_error";

/// Line protocol parser bound to one protocol version and metric prefix.
#[derive(Debug, Clone)]
pub struct LineProtocolParser {
    version: ProtocolVersion,
    prefix: String,
}

impl LineProtocolParser {
    /// Create a parser; `prefix` is prepended to every measurement name.
    pub fn new(version: ProtocolVersion, prefix: impl Into<String>) -> Self {
        Self {
            version,
            prefix: prefix.into(),
        }
    }

    /// Protocol version handled by this parser.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Decode every line of `text`, offsets left raw.
    pub fn parse(&self, text: &str) -> Vec<DataPoint> {
        let mut points = Vec::new();

        for raw_line in text.lines() {
            if let Some(max) = self.version.max_line_len() {
                if raw_line.len() > max {
                    let err = ParseError::LineTooLong {
                        len: raw_line.len(),
                        max,
                    };
                    tracing::debug!(error = %err, "line skipped");
                    continue;
                }
            }

            let ParsedLine {
                measurement,
                tags,
                mut fields,
                offset,
            } = match parse_line(raw_line) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::debug!(line = raw_line, error = %err, "line format error");
                    continue;
                }
            };

            // `v` alone is shorthand for the value field
            if fields.len() == 1 {
                if let Some(v) = fields.remove("v") {
                    fields.insert("value".to_string(), v);
                }
            }

            if self.version.drops_sequencing_lines() && tags.contains_key(SEQUENCING_TAG) {
                continue;
            }

            if !is_valid_metric_name(&measurement) {
                tracing::debug!(metric = %measurement, "invalid metric name");
                points.push(self.error_point(&measurement, raw_line));
                continue;
            }

            if fields.get("value").is_some_and(FieldValue::is_nan) {
                continue;
            }

            points.push(DataPoint {
                measurement: format!("{}{}", self.prefix, measurement),
                tags,
                fields,
                time: PointTime::Offset(offset),
            });
        }

        points
    }

    fn error_point(&self, metric_name: &str, raw_line: &str) -> DataPoint {
        DataPoint::new(
            format!("{}{}", self.prefix, METRIC_ERROR_MEASUREMENT),
            PointTime::Offset(0),
        )
        .with_field("error", "parse")
        .with_field("metric_name", metric_name)
        .with_field("message", raw_line)
    }
}
