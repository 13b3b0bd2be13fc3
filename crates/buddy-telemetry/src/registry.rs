// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device registry.
//!
//! Two lock levels: the map itself behind a `RwLock` (lookups shared,
//! creation exclusive) and one `Mutex` per device for its session anchor
//! and arrival window. Devices never contend with each other.

use crate::timestamp::SessionClock;
use crate::tracker::{DropReport, Registration, SequenceTracker};
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct DeviceState {
    session: SessionClock,
    tracker: SequenceTracker,
}

/// One printer, keyed by its MAC address.
#[derive(Debug)]
pub struct Device {
    mac: String,
    state: Mutex<DeviceState>,
}

impl Device {
    fn new(mac: String) -> Self {
        Self {
            mac,
            state: Mutex::new(DeviceState::default()),
        }
    }

    /// Device identifier.
    pub fn mac(&self) -> &str {
        &self.mac
    }

    /// Register message `seq` and return its base instant.
    ///
    /// Arrival registration and the session check-and-update happen under a
    /// single lock acquisition.
    pub fn observe_message_at(&self, seq: i64, elapsed: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut state = self.state.lock();
        if state.tracker.register_at(seq, now) == Registration::Duplicate {
            tracing::debug!(mac = %self.mac, seq, "duplicate message");
        }
        state.session.observe(seq, elapsed, now)
    }

    /// Evict stale arrivals and report loss over `window`.
    pub fn create_report_at(&self, window: Duration, now: DateTime<Utc>) -> Option<DropReport> {
        self.state.lock().tracker.create_report_at(window, now)
    }

    /// Current session start, if anchored.
    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.state.lock().session.session_start()
    }

    /// Arrivals currently held in the window.
    pub fn tracked_arrivals(&self) -> usize {
        self.state.lock().tracker.len()
    }
}

/// Concurrent map of devices; entries live for the process lifetime.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Arc<Device>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a device without creating it.
    pub fn get(&self, mac: &str) -> Option<Arc<Device>> {
        self.devices.read().get(mac).cloned()
    }

    /// Look up a device, creating it on first sighting.
    pub fn get_or_create(&self, mac: &str) -> Arc<Device> {
        if let Some(device) = self.get(mac) {
            return device;
        }
        let mut devices = self.devices.write();
        devices
            .entry(mac.to_string())
            .or_insert_with(|| {
                tracing::info!(mac = %mac, "new printer");
                Arc::new(Device::new(mac.to_string()))
            })
            .clone()
    }

    /// Number of known devices.
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Handles to every device; the map lock is released before returning.
    pub fn snapshot(&self) -> Vec<Arc<Device>> {
        self.devices.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::thread;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_get_or_create_returns_same_device() {
        let registry = DeviceRegistry::new();
        assert!(registry.get("aa").is_none());

        let a = registry.get_or_create("aa");
        let again = registry.get_or_create("aa");
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(registry.len(), 1);
        assert_eq!(a.mac(), "aa");
    }

    #[test]
    fn test_observe_registers_and_anchors() {
        let registry = DeviceRegistry::new();
        let device = registry.get_or_create("aa");

        let base = device.observe_message_at(5, Duration::milliseconds(1500), now());
        assert_eq!(base, now());
        assert_eq!(device.session_start(), Some(now() - Duration::milliseconds(1500)));

        // duplicate still returns a base but does not grow the window
        device.observe_message_at(5, Duration::milliseconds(1600), now());
        assert_eq!(device.tracked_arrivals(), 1);

        device.observe_message_at(7, Duration::milliseconds(1700), now());
        let report = device.create_report_at(Duration::seconds(3), now()).unwrap();
        assert_eq!(report.expected, 3);
        assert_eq!(report.received, 2);
    }

    #[test]
    fn test_concurrent_creation_yields_one_entry() {
        let registry = Arc::new(DeviceRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let device = registry.get_or_create("shared");
                    device.observe_message_at(i, Duration::zero(), now());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 1);
        let device = registry.get("shared").unwrap();
        assert_eq!(device.tracked_arrivals(), 8);
    }
}
