// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-line tokenizer for the Buddy line encoding.
//!
//! ```text
//! measurement[,tag=val...] field=val[,field=val...] [offset]
//! ```
//!
//! Sections are separated by spaces, tags and fields by commas. A backslash
//! escapes the next character and double quotes protect string field values,
//! so neither separator splits inside `"a, b"` or after `\`.

use crate::error::ParseError;
use crate::point::{FieldValue, Fields, Tags};
use std::borrow::Cow;

/// Tokens of one decoded line, offset still raw.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub measurement: String,
    pub tags: Tags,
    pub fields: Fields,
    pub offset: i64,
}

/// Tokenize one line.
///
/// Fields whose value ends in `i` but is not an integer are skipped; a
/// missing or unparsable offset reads as 0.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    let sections = split_unquoted(line, ' ', 3);
    if sections.len() < 2 {
        return Err(ParseError::MissingFields);
    }

    let mut series = split_unquoted(sections[0], ',', usize::MAX).into_iter();
    let measurement = unescape(series.next().unwrap_or_default()).into_owned();
    let mut tags = Tags::new();
    for pair in series {
        if let Some((key, value)) = split_pair(pair) {
            tags.insert(unescape(key).into_owned(), unescape(value).into_owned());
        }
    }

    let mut fields = Fields::new();
    for pair in split_unquoted(sections[1], ',', usize::MAX) {
        if let Some((key, raw)) = split_pair(pair) {
            if let Some(value) = coerce_field(raw) {
                fields.insert(unescape(key).into_owned(), value);
            }
        }
    }

    let offset = sections
        .get(2)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);

    Ok(ParsedLine {
        measurement,
        tags,
        fields,
        offset,
    })
}

/// Coerce a raw field token: integer (`i` suffix), float, boolean, then string.
pub fn coerce_field(raw: &str) -> Option<FieldValue> {
    if let Some(digits) = raw.strip_suffix('i') {
        return digits.parse().ok().map(FieldValue::Integer);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return Some(FieldValue::Float(v));
    }
    match raw {
        "t" | "T" | "true" | "True" => Some(FieldValue::Boolean(true)),
        "f" | "F" | "false" | "False" => Some(FieldValue::Boolean(false)),
        _ => Some(FieldValue::String(unquote(raw))),
    }
}

/// Measurement names must match `[A-Za-z0-9_]+`.
pub fn is_valid_metric_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn unquote(raw: &str) -> String {
    let inner = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw.trim_matches('"')
    };
    unescape(inner).into_owned()
}

fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let mut parts = split_unquoted(pair, '=', 2).into_iter();
    match (parts.next(), parts.next()) {
        (Some(key), Some(value)) => Some((key, value)),
        _ => None,
    }
}

/// Split on `sep` outside quotes and escapes, producing at most `limit` parts.
fn split_unquoted(input: &str, sep: char, limit: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut quoted = false;

    for (idx, c) in input.char_indices() {
        if parts.len() + 1 >= limit {
            break;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            c if c == sep && !quoted => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_line() {
        let line = parse_line("temp,sensor=bed v=61.5 120").unwrap();
        assert_eq!(line.measurement, "temp");
        assert_eq!(line.tags.get("sensor").map(String::as_str), Some("bed"));
        assert_eq!(line.fields.get("v"), Some(&FieldValue::Float(61.5)));
        assert_eq!(line.offset, 120);
    }

    #[test]
    fn test_offset_optional() {
        let line = parse_line("fan rpm=3200i").unwrap();
        assert_eq!(line.offset, 0);
        assert_eq!(parse_line("fan rpm=3200i soon").unwrap().offset, 0);
    }

    #[test]
    fn test_missing_field_section() {
        assert_eq!(parse_line("lonely"), Err(ParseError::MissingFields));
        assert_eq!(parse_line(""), Err(ParseError::MissingFields));
    }

    #[test]
    fn test_field_coercion_order() {
        assert_eq!(coerce_field("42i"), Some(FieldValue::Integer(42)));
        assert_eq!(coerce_field("-7i"), Some(FieldValue::Integer(-7)));
        assert_eq!(coerce_field("42"), Some(FieldValue::Float(42.0)));
        assert_eq!(coerce_field("1.5e3"), Some(FieldValue::Float(1500.0)));
        for t in ["t", "T", "true", "True"] {
            assert_eq!(coerce_field(t), Some(FieldValue::Boolean(true)), "{}", t);
        }
        for f in ["f", "F", "false", "False"] {
            assert_eq!(coerce_field(f), Some(FieldValue::Boolean(false)), "{}", f);
        }
        assert_eq!(
            coerce_field("\"PLA\""),
            Some(FieldValue::String("PLA".to_string()))
        );
        assert_eq!(coerce_field("bare"), Some(FieldValue::String("bare".to_string())));
        // `i` suffix without an integer body is dropped
        assert_eq!(coerce_field("hi"), None);
    }

    #[test]
    fn test_nan_parses_as_float() {
        match coerce_field("NaN") {
            Some(FieldValue::Float(v)) => assert!(v.is_nan()),
            other => panic!("expected Float, got {:?}", other),
        }
    }

    #[test]
    fn test_quoted_string_keeps_separators() {
        let line = parse_line(r#"event msg="door open, lid up",code=3i 5"#).unwrap();
        assert_eq!(
            line.fields.get("msg"),
            Some(&FieldValue::String("door open, lid up".to_string()))
        );
        assert_eq!(line.fields.get("code"), Some(&FieldValue::Integer(3)));
        assert_eq!(line.offset, 5);
    }

    #[test]
    fn test_escaped_quotes_in_string() {
        let line = parse_line(r#"note text="say \"hi\"""#).unwrap();
        assert_eq!(
            line.fields.get("text"),
            Some(&FieldValue::String("say \"hi\"".to_string()))
        );
    }

    #[test]
    fn test_escaped_measurement_space() {
        let line = parse_line(r"bad\ name v=1").unwrap();
        assert_eq!(line.measurement, "bad name");
        assert!(!is_valid_metric_name(&line.measurement));
    }

    #[test]
    fn test_tag_without_value_skipped() {
        let line = parse_line("m,lonely,a=b v=1").unwrap();
        assert_eq!(line.tags.len(), 1);
        assert_eq!(line.tags.get("a").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_metric_name_grammar() {
        assert!(is_valid_metric_name("temp_bed"));
        assert!(is_valid_metric_name("T0"));
        assert!(!is_valid_metric_name(""));
        assert!(!is_valid_metric_name("temp-bed"));
        assert!(!is_valid_metric_name("temp.bed"));
    }
}
