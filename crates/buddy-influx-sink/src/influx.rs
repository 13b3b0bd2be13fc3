// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB v2 Line Protocol encoding of [`DataPoint`]s.
//!
//! Line Protocol format:
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp_ns
//! ```
//!
//! See: <https://docs.influxdata.com/influxdb/v2/reference/syntax/line-protocol/>

use buddy_telemetry::{DataPoint, FieldValue, SinkError};
use std::fmt::Write;

/// Encode one point as a Line Protocol line (no trailing newline).
///
/// Tags and fields come out sorted by key. Points without fields, without
/// an absolute timestamp, or outside the nanosecond epoch range are
/// rejected. Non-finite float fields are skipped.
pub fn encode_point(point: &DataPoint) -> Result<String, SinkError> {
    let ts = point
        .timestamp()
        .ok_or_else(|| SinkError::Rejected(format!("{}: timestamp not resolved", point.measurement)))?;
    let ts_ns = ts
        .timestamp_nanos_opt()
        .ok_or_else(|| SinkError::Rejected(format!("{}: timestamp out of range", point.measurement)))?;

    let mut line = escape_measurement(&point.measurement);

    for (key, value) in &point.tags {
        if value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    let mut written = 0;
    for (key, value) in &point.fields {
        let Some(encoded) = field_to_line_protocol(value) else {
            continue;
        };
        line.push(if written == 0 { ' ' } else { ',' });
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&encoded);
        written += 1;
    }
    if written == 0 {
        return Err(SinkError::Rejected(format!(
            "{}: no representable fields",
            point.measurement
        )));
    }

    let _ = write!(line, " {}", ts_ns);
    Ok(line)
}

/// Format a field value; `None` for NaN and infinities.
///
/// - Float: written as-is (e.g., `3.14`)
/// - Integer: suffixed with `i` (e.g., `42i`)
/// - String: quoted, inner quotes and backslashes escaped
/// - Boolean: `true` or `false`
pub fn field_to_line_protocol(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Float(v) if !v.is_finite() => None,
        FieldValue::Float(v) => Some(format!("{}", v)),
        FieldValue::Integer(v) => Some(format!("{}i", v)),
        FieldValue::String(v) => {
            let escaped = v.replace('\\', "\\\\").replace('"', "\\\"");
            Some(format!("\"{}\"", escaped))
        }
        FieldValue::Boolean(v) => Some(v.to_string()),
    }
}

/// Measurement names escape commas and spaces.
fn escape_measurement(s: &str) -> String {
    escape(s, &[',', ' '])
}

/// Tag keys, tag values and field keys escape commas, equals signs and spaces.
fn escape_key(s: &str) -> String {
    escape(s, &[',', '=', ' '])
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}
