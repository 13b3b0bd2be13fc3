// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protocol revisions and their per-version rules.

use crate::error::ParseError;
use chrono::Duration;
use std::fmt;

/// Maximum encoded line length accepted by protocol version 4.
pub const V4_MAX_LINE_LEN: usize = 10_000;

/// Tag injected by v3 senders on bookkeeping lines.
pub const SEQUENCING_TAG: &str = "_seq";

/// Supported telemetry protocol revisions.
///
/// | Version | Offset unit | Offsets     | Line filters         |
/// |---------|-------------|-------------|----------------------|
/// | 2       | ms          | cumulative  | -                    |
/// | 3       | ms          | independent | drop `_seq`-tagged   |
/// | 4       | us          | independent | drop > 10 000 bytes  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V2,
    V3,
    V4,
}

impl ProtocolVersion {
    /// Select the parser for a header version number.
    pub fn from_number(version: u32) -> Result<Self, ParseError> {
        match version {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            other => Err(ParseError::UnsupportedVersion(other)),
        }
    }

    /// Wire number of this version.
    pub fn number(self) -> u32 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
            Self::V4 => 4,
        }
    }

    /// Convert a raw device time value into a duration.
    pub fn make_duration(self, raw: i64) -> Duration {
        // i64::MIN is the only value chrono refuses for millisecond deltas.
        let raw = raw.max(-i64::MAX);
        match self {
            Self::V2 | Self::V3 => Duration::milliseconds(raw),
            Self::V4 => Duration::microseconds(raw),
        }
    }

    /// Per-point offsets chain from the previous point instead of the message base.
    pub fn offsets_are_cumulative(self) -> bool {
        matches!(self, Self::V2)
    }

    /// Longest line accepted, if bounded.
    pub fn max_line_len(self) -> Option<usize> {
        match self {
            Self::V4 => Some(V4_MAX_LINE_LEN),
            Self::V2 | Self::V3 => None,
        }
    }

    /// Lines tagged with [`SEQUENCING_TAG`] are sender bookkeeping, not telemetry.
    pub fn drops_sequencing_lines(self) -> bool {
        matches!(self, Self::V3)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}
