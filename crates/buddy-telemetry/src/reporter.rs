// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic drop-rate reporter.

use crate::metrics::{HandlerMetrics, PrinterGauges};
use crate::registry::DeviceRegistry;
use crate::service::StopHandle;
use chrono::{DateTime, Duration, Utc};
use crossbeam::channel;
use std::sync::Arc;

/// Publishes every device's drop report to the handler metrics.
pub struct Reporter {
    registry: Arc<DeviceRegistry>,
    metrics: Arc<HandlerMetrics>,
    window: Duration,
}

impl Reporter {
    pub fn new(registry: Arc<DeviceRegistry>, metrics: Arc<HandlerMetrics>, window: Duration) -> Self {
        Self {
            registry,
            metrics,
            window,
        }
    }

    /// One pass over the registry; returns how many devices reported.
    ///
    /// Devices are snapshotted one at a time under their own lock. A device
    /// whose window emptied keeps its last published gauges.
    pub fn report_at(&self, now: DateTime<Utc>) -> usize {
        let mut reported = 0;
        for device in self.registry.snapshot() {
            let Some(report) = device.create_report_at(self.window, now) else {
                continue;
            };
            tracing::trace!(
                mac = %device.mac(),
                expected = report.expected,
                received = report.received,
                drop_rate = report.drop_rate,
                "drop report"
            );
            self.metrics.set_printer(device.mac(), PrinterGauges::from(&report));
            reported += 1;
        }
        reported
    }

    /// Tick every `interval` until `stop` is signalled.
    pub fn run(self, interval: std::time::Duration, stop: StopHandle) {
        let ticker = channel::tick(interval);
        while stop.is_running() {
            if ticker.recv().is_err() {
                break;
            }
            if !stop.is_running() {
                break;
            }
            self.report_at(Utc::now());
        }
        tracing::debug!("reporter stopped");
    }
}
