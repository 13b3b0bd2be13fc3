// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Absolute timestamp reconstruction.
//!
//! Devices do not send wall-clock time. Each message header carries the
//! elapsed time since the device booted, and each line an offset from
//! there. The receiver anchors a session start on the first message (and
//! again whenever the sequence number jumps) and derives every point's
//! instant from that anchor.

use crate::point::{DataPoint, PointTime};
use crate::protocol::ProtocolVersion;
use chrono::{DateTime, Duration, Utc};

/// Sequence number distance treated as a device restart.
pub const SESSION_JUMP_THRESHOLD: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SessionAnchor {
    last_seq: i64,
    start: DateTime<Utc>,
}

/// Session anchor of one device.
#[derive(Debug, Clone, Default)]
pub struct SessionClock {
    anchor: Option<SessionAnchor>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record message `seq` received at `now` and return its base instant.
    ///
    /// The session is re-anchored to `now - elapsed` when no message was
    /// seen yet or when `seq` is at least [`SESSION_JUMP_THRESHOLD`] away
    /// from the previous one. The base is `session_start + elapsed`.
    pub fn observe(&mut self, seq: i64, elapsed: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
        let restart = match self.anchor {
            None => true,
            Some(anchor) => seq.abs_diff(anchor.last_seq) >= SESSION_JUMP_THRESHOLD,
        };

        let start = match self.anchor {
            Some(anchor) if !restart => anchor.start,
            _ => {
                let start = now.checked_sub_signed(elapsed).unwrap_or(now);
                tracing::debug!(seq, session_start = %start, "session anchored");
                start
            }
        };

        self.anchor = Some(SessionAnchor {
            last_seq: seq,
            start,
        });
        start.checked_add_signed(elapsed).unwrap_or(start)
    }

    /// Current session start, if anchored.
    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.anchor.map(|a| a.start)
    }

    /// Last sequence number seen, if any.
    pub fn last_seq(&self) -> Option<i64> {
        self.anchor.map(|a| a.last_seq)
    }
}

/// Resolve the raw offsets of `points` against the message `base`.
///
/// Version 2 chains offsets (each relative to the previous point), later
/// versions make every offset relative to `base`. Points that already carry
/// an absolute time are left untouched and do not advance the chain.
pub fn reconstruct(points: &mut [DataPoint], version: ProtocolVersion, base: DateTime<Utc>) {
    let cumulative = version.offsets_are_cumulative();
    let mut running = base;

    for point in points {
        let PointTime::Offset(raw) = point.time else {
            continue;
        };
        let anchor = if cumulative { running } else { base };
        let at = anchor
            .checked_add_signed(version.make_duration(raw))
            .unwrap_or(anchor);
        if cumulative {
            running = at;
        }
        point.time = PointTime::Absolute(at);
    }
}
