// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-device message sequence tracking and drop-rate estimation.
//!
//! Arrivals are kept sorted by sequence number so duplicate detection and
//! insertion position are a binary search. Eviction is driven by arrival
//! time, which does not follow sequence order when datagrams are
//! reordered, so it scans the whole list.

use chrono::{DateTime, Duration, Utc};

/// Hard bound on tracked arrivals per device, independent of report cadence.
pub const MAX_TRACKED_ARRIVALS: usize = 65_536;

/// One received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// Device message sequence number.
    pub seq: i64,
    /// Receive-side wall clock.
    pub at: DateTime<Utc>,
}

/// Result of registering a sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// New sequence number stored.
    Inserted,
    /// Already present; nothing changed.
    Duplicate,
}

/// Loss estimate over the trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropReport {
    /// `highest_seq - lowest_seq + 1`
    pub expected: u64,
    /// Distinct sequence numbers seen.
    pub received: u64,
    /// `1 - received / expected`
    pub drop_rate: f64,
    /// Window length the report covers.
    pub window: Duration,
}

/// Sliding window of arrivals ordered by sequence number.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    arrivals: Vec<Arrival>,
    capacity: usize,
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceTracker {
    /// Create a tracker bounded by [`MAX_TRACKED_ARRIVALS`].
    pub fn new() -> Self {
        Self::with_capacity(MAX_TRACKED_ARRIVALS)
    }

    /// Create a tracker keeping at most `capacity` arrivals.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arrivals: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record the arrival of `seq` now.
    pub fn register(&mut self, seq: i64) -> Registration {
        self.register_at(seq, Utc::now())
    }

    /// Record the arrival of `seq` at `now`.
    pub fn register_at(&mut self, seq: i64, now: DateTime<Utc>) -> Registration {
        let idx = match self.arrivals.binary_search_by_key(&seq, |a| a.seq) {
            Ok(_) => return Registration::Duplicate,
            Err(idx) => idx,
        };
        self.arrivals.insert(idx, Arrival { seq, at: now });

        if self.arrivals.len() > self.capacity {
            self.arrivals.remove(0);
        }
        Registration::Inserted
    }

    /// Evict stale arrivals and report loss over the last `window`.
    pub fn create_report(&mut self, window: Duration) -> Option<DropReport> {
        self.create_report_at(window, Utc::now())
    }

    /// Evict arrivals older than `now - window`; `None` when nothing remains.
    pub fn create_report_at(&mut self, window: Duration, now: DateTime<Utc>) -> Option<DropReport> {
        let range_start = now.checked_sub_signed(window).unwrap_or(now);
        self.arrivals.retain(|a| a.at >= range_start);

        let lowest = self.arrivals.first()?.seq;
        let highest = self.arrivals.last()?.seq;

        let expected = highest.abs_diff(lowest) + 1;
        let received = self.arrivals.len() as u64;
        let drop_rate = 1.0 - received as f64 / expected as f64;

        Some(DropReport {
            expected,
            received,
            drop_rate,
            window,
        })
    }

    /// Number of arrivals currently tracked.
    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    /// True when no arrivals are tracked.
    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    /// Tracked arrivals in sequence order.
    pub fn arrivals(&self) -> &[Arrival] {
        &self.arrivals
    }
}
