// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer loop: drains the point queue into a [`PointSink`].

use crate::metrics::HandlerMetrics;
use crate::point::DataPoint;
use crate::sink::PointSink;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Period at which the writer polls the sink's flush deadline.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Totals of one writer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: u64,
    pub failed: u64,
}

/// Drains queued points into the sink until every producer is gone.
pub struct Writer<S: PointSink> {
    rx: Receiver<DataPoint>,
    sink: S,
    metrics: Arc<HandlerMetrics>,
    idle_interval: Duration,
    stats: WriterStats,
}

impl<S: PointSink> Writer<S> {
    pub fn new(rx: Receiver<DataPoint>, sink: S, metrics: Arc<HandlerMetrics>) -> Self {
        Self {
            rx,
            sink,
            metrics,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            stats: WriterStats::default(),
        }
    }

    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Run until the queue is closed and empty, then flush the sink.
    ///
    /// The flush deadline is polled at least every idle interval, whether or
    /// not points keep arriving.
    pub fn run(mut self) -> WriterStats {
        let mut next_poll = Instant::now() + self.idle_interval;
        loop {
            let wait = next_poll.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(wait) {
                Ok(point) => self.write(&point),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            if now >= next_poll {
                self.poll_flush();
                next_poll = now + self.idle_interval;
            }
        }

        if let Err(e) = self.sink.flush() {
            self.metrics.record_error();
            tracing::warn!(error = %e, "final sink flush failed");
        }
        tracing::info!(
            written = self.stats.written,
            failed = self.stats.failed,
            "writer stopped"
        );
        self.stats
    }

    fn poll_flush(&mut self) {
        if let Err(e) = self.sink.flush_due() {
            self.metrics.record_error();
            tracing::warn!(error = %e, "periodic sink flush failed");
        }
    }

    fn write(&mut self, point: &DataPoint) {
        match self.sink.write(point) {
            Ok(()) => {
                self.stats.written += 1;
                self.metrics.record_written(1);
            }
            Err(e) => {
                self.stats.failed += 1;
                self.metrics.record_error();
                tracing::warn!(measurement = %point.measurement, error = %e, "write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::point::PointTime;
    use crate::sink::MemorySink;
    use crossbeam::channel;
    use parking_lot::Mutex;
    use std::thread;

    struct FailingSink;

    /// Counts deadline polls.
    #[derive(Clone, Default)]
    struct PollCountingSink {
        polls: Arc<Mutex<usize>>,
    }

    impl PointSink for PollCountingSink {
        fn write(&mut self, _point: &DataPoint) -> Result<(), SinkError> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), SinkError> {
            Ok(())
        }

        fn flush_due(&mut self) -> Result<(), SinkError> {
            *self.polls.lock() += 1;
            Ok(())
        }
    }

    impl PointSink for FailingSink {
        fn write(&mut self, _point: &DataPoint) -> Result<(), SinkError> {
            Err(SinkError::Transport("connection refused".into()))
        }

        fn flush(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn point(n: i64) -> DataPoint {
        DataPoint::new("m", PointTime::Offset(n))
    }

    #[test]
    fn test_drains_then_flushes_on_close() {
        let (tx, rx) = channel::bounded(8);
        for n in 0..5 {
            tx.send(point(n)).unwrap();
        }
        drop(tx);

        let sink = MemorySink::new();
        let metrics = Arc::new(HandlerMetrics::new());
        let stats = Writer::new(rx, sink.clone(), Arc::clone(&metrics)).run();

        assert_eq!(stats.written, 5);
        assert_eq!(sink.len(), 5);
        assert_eq!(sink.flushes(), 1);
        assert_eq!(metrics.datapoints_written(), 5);
        let order: Vec<_> = sink.points().into_iter().map(|p| p.time).collect();
        assert_eq!(order[0], PointTime::Offset(0));
        assert_eq!(order[4], PointTime::Offset(4));
    }

    #[test]
    fn test_sink_failure_counted_not_fatal() {
        let (tx, rx) = channel::bounded(8);
        tx.send(point(0)).unwrap();
        tx.send(point(1)).unwrap();
        drop(tx);

        let metrics = Arc::new(HandlerMetrics::new());
        let stats = Writer::new(rx, FailingSink, Arc::clone(&metrics)).run();

        assert_eq!(stats, WriterStats { written: 0, failed: 2 });
        assert_eq!(metrics.syslog_errors(), 2);
        assert_eq!(metrics.datapoints_written(), 0);
    }

    #[test]
    fn test_flush_deadline_polled_under_steady_traffic() {
        let (tx, rx) = channel::bounded(64);
        let sink = PollCountingSink::default();
        let metrics = Arc::new(HandlerMetrics::new());
        let writer = Writer::new(rx, sink.clone(), metrics).with_idle_interval(Duration::from_millis(100));
        let handle = thread::spawn(move || writer.run());

        // one point every 20 ms never lets the receive time out
        for n in 0..50 {
            tx.send(point(n)).unwrap();
            thread::sleep(Duration::from_millis(20));
        }
        drop(tx);
        let stats = handle.join().unwrap();

        assert_eq!(stats.written, 50);
        assert!(*sink.polls.lock() >= 5, "polls: {}", *sink.polls.lock());
    }
}
