// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time-series sink boundary.

use crate::error::SinkError;
use crate::point::DataPoint;
use parking_lot::Mutex;
use std::sync::Arc;

/// Destination of reconstructed points.
///
/// Called only from the writer thread. Batching, transport and retries are
/// the implementation's concern; the writer counts and logs failures and
/// moves on.
pub trait PointSink: Send {
    /// Accept one point. It may be buffered.
    fn write(&mut self, point: &DataPoint) -> Result<(), SinkError>;

    /// Push everything buffered to the backend.
    fn flush(&mut self) -> Result<(), SinkError>;

    /// Called when the queue is idle; flush if a time-based deadline passed.
    fn flush_due(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: PointSink + ?Sized> PointSink for Box<S> {
    fn write(&mut self, point: &DataPoint) -> Result<(), SinkError> {
        (**self).write(point)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }

    fn flush_due(&mut self) -> Result<(), SinkError> {
        (**self).flush_due()
    }
}

/// Sink keeping every point in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    points: Arc<Mutex<Vec<DataPoint>>>,
    flushes: Arc<Mutex<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the points written so far.
    pub fn points(&self) -> Vec<DataPoint> {
        self.points.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.points.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.lock().is_empty()
    }

    /// Number of explicit flushes.
    pub fn flushes(&self) -> usize {
        *self.flushes.lock()
    }
}

impl PointSink for MemorySink {
    fn write(&mut self, point: &DataPoint) -> Result<(), SinkError> {
        self.points.lock().push(point.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        *self.flushes.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointTime;

    #[test]
    fn test_memory_sink_shares_storage() {
        let sink = MemorySink::new();
        let mut boxed: Box<dyn PointSink> = Box::new(sink.clone());

        boxed.write(&DataPoint::new("m", PointTime::Offset(0))).unwrap();
        boxed.flush().unwrap();
        boxed.flush_due().unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.flushes(), 1);
    }
}
