// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded point queue between the receive loop and the writer.

use crate::point::DataPoint;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

/// Default queue capacity in points.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// What the producer does when the queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backpressure {
    /// Wait for the writer to make room.
    #[default]
    Block,
    /// Discard the point.
    Drop,
}

/// Outcome of a single enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Queued,
    Dropped,
    /// Writer side is gone.
    Closed,
}

/// Producer half of the point queue.
#[derive(Debug, Clone)]
pub struct PointQueue {
    tx: Sender<DataPoint>,
    policy: Backpressure,
}

impl PointQueue {
    /// Create a queue and the receiver the writer drains.
    pub fn bounded(capacity: usize, policy: Backpressure) -> (Self, Receiver<DataPoint>) {
        let (tx, rx) = channel::bounded(capacity.max(1));
        (Self { tx, policy }, rx)
    }

    /// Enqueue one point according to the backpressure policy.
    pub fn push(&self, point: DataPoint) -> Enqueue {
        match self.policy {
            Backpressure::Block => match self.tx.send(point) {
                Ok(()) => Enqueue::Queued,
                Err(_) => Enqueue::Closed,
            },
            Backpressure::Drop => match self.tx.try_send(point) {
                Ok(()) => Enqueue::Queued,
                Err(TrySendError::Full(_)) => Enqueue::Dropped,
                Err(TrySendError::Disconnected(_)) => Enqueue::Closed,
            },
        }
    }

    /// Points currently waiting.
    pub fn depth(&self) -> usize {
        self.tx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointTime;

    fn point(n: i64) -> DataPoint {
        DataPoint::new("m", PointTime::Offset(n))
    }

    #[test]
    fn test_fifo_order() {
        let (queue, rx) = PointQueue::bounded(4, Backpressure::Block);
        for n in 0..3 {
            assert_eq!(queue.push(point(n)), Enqueue::Queued);
        }
        assert_eq!(queue.depth(), 3);
        let got: Vec<_> = rx.try_iter().map(|p| p.time).collect();
        assert_eq!(
            got,
            vec![PointTime::Offset(0), PointTime::Offset(1), PointTime::Offset(2)]
        );
    }

    #[test]
    fn test_drop_policy_rejects_overflow() {
        let (queue, _rx) = PointQueue::bounded(2, Backpressure::Drop);
        assert_eq!(queue.push(point(0)), Enqueue::Queued);
        assert_eq!(queue.push(point(1)), Enqueue::Queued);
        assert_eq!(queue.push(point(2)), Enqueue::Dropped);
        assert_eq!(queue.push(point(3)), Enqueue::Dropped);
        assert_eq!(queue.depth(), 2);
    }

    #[test]
    fn test_closed_when_receiver_gone() {
        let (queue, rx) = PointQueue::bounded(2, Backpressure::Block);
        drop(rx);
        assert_eq!(queue.push(point(0)), Enqueue::Closed);
    }
}
