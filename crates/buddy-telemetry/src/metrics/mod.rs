// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handler self-metrics.
//!
//! Counters are plain atomics updated from the hot path. Per-printer gauges
//! are written once per reporter tick and live behind a `RwLock`.

pub mod prometheus;

use crate::tracker::DropReport;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Last drop report published for one printer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrinterGauges {
    pub expected: u64,
    pub received: u64,
    pub drop_rate: f64,
}

impl From<&DropReport> for PrinterGauges {
    fn from(report: &DropReport) -> Self {
        Self {
            expected: report.expected,
            received: report.received,
            drop_rate: report.drop_rate,
        }
    }
}

/// Operational metrics of the handler.
#[derive(Debug)]
pub struct HandlerMetrics {
    /// Datagrams read from the socket.
    syslog_messages: AtomicU64,

    /// UDP read errors and sink write errors.
    syslog_errors: AtomicU64,

    /// Points accepted by the sink.
    datapoints_written: AtomicU64,

    /// Points discarded by a full queue.
    queue_dropped: AtomicU64,

    /// Points waiting for the writer.
    queue_depth: AtomicU64,

    printers: RwLock<BTreeMap<String, PrinterGauges>>,

    created: Instant,
}

impl Default for HandlerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerMetrics {
    pub fn new() -> Self {
        Self {
            syslog_messages: AtomicU64::new(0),
            syslog_errors: AtomicU64::new(0),
            datapoints_written: AtomicU64::new(0),
            queue_dropped: AtomicU64::new(0),
            queue_depth: AtomicU64::new(0),
            printers: RwLock::new(BTreeMap::new()),
            created: Instant::now(),
        }
    }

    /// Count one received datagram.
    pub fn record_message(&self) {
        self.syslog_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one receive or write failure.
    pub fn record_error(&self) {
        self.syslog_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self, count: u64) {
        self.datapoints_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_queue_dropped(&self, count: u64) {
        self.queue_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth as u64, Ordering::Relaxed);
    }

    /// Publish the latest drop report of `mac`.
    pub fn set_printer(&self, mac: &str, gauges: PrinterGauges) {
        self.printers.write().insert(mac.to_string(), gauges);
    }

    pub fn printer(&self, mac: &str) -> Option<PrinterGauges> {
        self.printers.read().get(mac).copied()
    }

    pub fn syslog_messages(&self) -> u64 {
        self.syslog_messages.load(Ordering::Relaxed)
    }

    pub fn syslog_errors(&self) -> u64 {
        self.syslog_errors.load(Ordering::Relaxed)
    }

    pub fn datapoints_written(&self) -> u64 {
        self.datapoints_written.load(Ordering::Relaxed)
    }

    pub fn queue_dropped(&self) -> u64 {
        self.queue_dropped.load(Ordering::Relaxed)
    }

    pub fn queue_depth(&self) -> u64 {
        self.queue_depth.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.created.elapsed()
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> HandlerMetricsSnapshot {
        HandlerMetricsSnapshot {
            syslog_messages: self.syslog_messages(),
            syslog_errors: self.syslog_errors(),
            datapoints_written: self.datapoints_written(),
            queue_dropped: self.queue_dropped(),
            queue_depth: self.queue_depth(),
            printers: self.printers.read().clone(),
            uptime: self.uptime(),
        }
    }
}

/// Point-in-time copy of [`HandlerMetrics`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerMetricsSnapshot {
    pub syslog_messages: u64,
    pub syslog_errors: u64,
    pub datapoints_written: u64,
    pub queue_dropped: u64,
    pub queue_depth: u64,
    /// Printer gauges keyed by MAC address.
    pub printers: BTreeMap<String, PrinterGauges>,
    pub uptime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = HandlerMetrics::new();
        metrics.record_message();
        metrics.record_message();
        metrics.record_error();
        metrics.record_written(5);
        metrics.record_queue_dropped(2);
        metrics.set_queue_depth(7);

        let snap = metrics.snapshot();
        assert_eq!(snap.syslog_messages, 2);
        assert_eq!(snap.syslog_errors, 1);
        assert_eq!(snap.datapoints_written, 5);
        assert_eq!(snap.queue_dropped, 2);
        assert_eq!(snap.queue_depth, 7);
    }

    #[test]
    fn test_printer_gauges_overwrite() {
        let metrics = HandlerMetrics::new();
        let first = PrinterGauges {
            expected: 6,
            received: 2,
            drop_rate: 2.0 / 3.0,
        };
        metrics.set_printer("aa", first);
        assert_eq!(metrics.printer("aa"), Some(first));

        let second = PrinterGauges {
            expected: 3,
            received: 3,
            drop_rate: 0.0,
        };
        metrics.set_printer("aa", second);
        assert_eq!(metrics.printer("aa"), Some(second));
        assert_eq!(metrics.snapshot().printers.len(), 1);
    }
}
