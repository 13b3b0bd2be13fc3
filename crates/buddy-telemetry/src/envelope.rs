// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Syslog envelope extraction.
//!
//! Buddy firmware wraps its telemetry in an RFC 5424 shaped datagram:
//!
//! ```text
//! <PRI>1 TIMESTAMP HOST APP-NAME PROCID MSGID SD MSG
//! ```
//!
//! Header fields are separated by runs of whitespace; `MSG` takes the
//! remainder of the datagram (newlines included, the points body is
//! multi-line). `HOST` carries the printer MAC address.

use crate::error::EnvelopeError;

/// Application label emitted by the printer firmware.
pub const BUDDY_APP_LABEL: &str = "buddy";

/// Parsed syslog envelope borrowing from the datagram text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// Syslog PRI value.
    pub priority: u32,
    /// Timestamp as sent (unparsed, often `-`).
    pub timestamp: &'a str,
    /// Source identifier (printer MAC address).
    pub source: &'a str,
    /// Application label.
    pub app_label: &'a str,
    /// Process id token.
    pub proc_id: &'a str,
    /// Message id token.
    pub msg_id: &'a str,
    /// Structured-data token.
    pub structured_data: &'a str,
    /// Free-text body.
    pub message: &'a str,
}

impl<'a> Envelope<'a> {
    /// Parse the syslog envelope without checking the application label.
    pub fn parse(text: &'a str) -> Result<Self, EnvelopeError> {
        let rest = text.strip_prefix('<').ok_or(EnvelopeError::NotSyslog)?;
        let close = rest.find('>').ok_or(EnvelopeError::NotSyslog)?;
        let digits = &rest[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EnvelopeError::NotSyslog);
        }
        let priority = digits.parse().map_err(|_| EnvelopeError::NotSyslog)?;
        let rest = rest[close + 1..]
            .strip_prefix('1')
            .ok_or(EnvelopeError::NotSyslog)?;

        let mut cursor = Cursor { rest };
        Ok(Self {
            priority,
            timestamp: cursor.token()?,
            source: cursor.token()?,
            app_label: cursor.token()?,
            proc_id: cursor.token()?,
            msg_id: cursor.token()?,
            structured_data: cursor.token()?,
            message: cursor.remainder()?,
        })
    }

    /// Split the free-text body into the header token and the serialized points.
    pub fn split_body(&self) -> Result<(&'a str, &'a str), EnvelopeError> {
        self.message
            .trim()
            .split_once(' ')
            .ok_or(EnvelopeError::MissingPoints)
    }
}

/// Parse `text` and accept it only when it comes from `app_label`.
pub fn extract<'a>(text: &'a str, app_label: &str) -> Result<Envelope<'a>, EnvelopeError> {
    let envelope = Envelope::parse(text)?;
    if envelope.app_label != app_label {
        return Err(EnvelopeError::ForeignApplication(
            envelope.app_label.to_string(),
        ));
    }
    Ok(envelope)
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    /// Consume mandatory separator whitespace.
    fn separator(&mut self) -> Result<(), EnvelopeError> {
        let trimmed = self.rest.trim_start_matches(is_separator);
        if trimmed.len() == self.rest.len() {
            return Err(EnvelopeError::NotSyslog);
        }
        self.rest = trimmed;
        Ok(())
    }

    fn token(&mut self) -> Result<&'a str, EnvelopeError> {
        self.separator()?;
        let end = self.rest.find(is_separator).unwrap_or(self.rest.len());
        if end == 0 {
            return Err(EnvelopeError::NotSyslog);
        }
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(token)
    }

    fn remainder(&mut self) -> Result<&'a str, EnvelopeError> {
        self.separator()?;
        Ok(std::mem::take(&mut self.rest))
    }
}

fn is_separator(c: char) -> bool {
    c.is_ascii_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATAGRAM: &str = "<134>1 2025-01-01T00:00:00Z 10:9c:70:aa:bb:cc buddy 42 - - v=4,msg=7,tm=1500 temp_bed v=61.5 10\ntemp_noz v=215.0 20";

    #[test]
    fn test_parse_buddy_datagram() {
        let env = extract(DATAGRAM, BUDDY_APP_LABEL).expect("valid envelope");
        assert_eq!(env.priority, 134);
        assert_eq!(env.timestamp, "2025-01-01T00:00:00Z");
        assert_eq!(env.source, "10:9c:70:aa:bb:cc");
        assert_eq!(env.app_label, "buddy");
        assert_eq!(env.proc_id, "42");
        assert_eq!(env.msg_id, "-");
        assert_eq!(env.structured_data, "-");
        assert!(env.message.starts_with("v=4,msg=7,tm=1500 "));
        assert!(env.message.contains('\n'));
    }

    #[test]
    fn test_split_body_keeps_multiline_points() {
        let env = extract(DATAGRAM, BUDDY_APP_LABEL).unwrap();
        let (header, points) = env.split_body().unwrap();
        assert_eq!(header, "v=4,msg=7,tm=1500");
        assert_eq!(points.lines().count(), 2);
    }

    #[test]
    fn test_runs_of_whitespace_separate_fields() {
        let env = Envelope::parse("<13>1  -\t\tmac   buddy - -  -   hdr body").unwrap();
        assert_eq!(env.source, "mac");
        assert_eq!(env.app_label, "buddy");
        assert_eq!(env.message, "hdr body");
    }

    #[test]
    fn test_foreign_application_rejected() {
        let text = "<13>1 - mac sshd 1 - - hello world";
        match extract(text, BUDDY_APP_LABEL) {
            Err(EnvelopeError::ForeignApplication(app)) => assert_eq!(app, "sshd"),
            other => panic!("expected ForeignApplication, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_datagrams_rejected() {
        for text in [
            "",
            "hello",
            "<>1 - mac buddy - - - x y",
            "<1x>1 - mac buddy - - - x y",
            "<13>2 - mac buddy - - - x y",
            "<13>1 - mac buddy - - -",
            "<13>1- mac buddy - - - x y",
            "<99999999999>1 - mac buddy - - - x y",
        ] {
            assert_eq!(
                Envelope::parse(text),
                Err(EnvelopeError::NotSyslog),
                "input: {:?}",
                text
            );
        }
    }

    #[test]
    fn test_body_without_points_rejected() {
        let env = Envelope::parse("<13>1 - mac buddy - - - v=2,msg=1   ").unwrap();
        assert_eq!(env.split_body(), Err(EnvelopeError::MissingPoints));
    }
}
