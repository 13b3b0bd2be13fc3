// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Write-request body accumulator.
//!
//! Lines are appended to a single newline-separated body, ready to be
//! POSTed as is. A body is handed out when it reaches the line limit or
//! when it has been waiting longer than the flush interval.

use std::time::{Duration, Instant};

/// Newline-separated batch of Line Protocol lines.
#[derive(Debug)]
pub struct BatchBuffer {
    body: String,
    lines: usize,
    max_lines: usize,
    flush_interval: Duration,
    /// Arrival of the oldest line in the current body.
    oldest: Option<Instant>,
}

impl BatchBuffer {
    pub fn new(max_lines: usize, flush_interval: Duration) -> Self {
        Self {
            body: String::new(),
            lines: 0,
            max_lines: max_lines.max(1),
            flush_interval,
            oldest: None,
        }
    }

    /// Append one line; returns the full body once `max_lines` is reached.
    pub fn push(&mut self, line: &str) -> Option<String> {
        if self.lines > 0 {
            self.body.push('\n');
        }
        self.body.push_str(line);
        self.lines += 1;
        self.oldest.get_or_insert_with(Instant::now);

        if self.lines >= self.max_lines {
            self.take()
        } else {
            None
        }
    }

    /// True when a partial body has waited at least the flush interval.
    pub fn is_due(&self) -> bool {
        self.oldest
            .is_some_and(|oldest| oldest.elapsed() >= self.flush_interval)
    }

    /// Hand out the pending body, if any.
    pub fn take(&mut self) -> Option<String> {
        if self.lines == 0 {
            return None;
        }
        self.lines = 0;
        self.oldest = None;
        Some(std::mem::take(&mut self.body))
    }

    /// Lines waiting.
    pub fn len(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    /// Size of the pending body in bytes.
    pub fn byte_len(&self) -> usize {
        self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_released_when_full() {
        let mut buf = BatchBuffer::new(3, Duration::from_secs(60));
        assert!(buf.push("a f=1i 1").is_none());
        assert!(buf.push("b f=2i 2").is_none());
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.byte_len(), 17);

        let body = buf.push("c f=3i 3").expect("full batch");
        assert_eq!(body, "a f=1i 1\nb f=2i 2\nc f=3i 3");
        assert!(buf.is_empty());
        assert!(buf.take().is_none());
    }

    #[test]
    fn test_due_after_interval() {
        let mut buf = BatchBuffer::new(100, Duration::from_millis(0));
        // never due while empty
        assert!(!buf.is_due());

        buf.push("a f=1i 1");
        assert!(buf.is_due());
        assert_eq!(buf.take().as_deref(), Some("a f=1i 1"));
        assert!(!buf.is_due());
    }

    #[test]
    fn test_not_due_before_interval() {
        let mut buf = BatchBuffer::new(100, Duration::from_secs(60));
        buf.push("a f=1i 1");
        assert!(!buf.is_due());
    }
}
