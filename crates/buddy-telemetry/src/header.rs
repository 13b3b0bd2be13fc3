// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message header: the first token of the envelope body.
//!
//! ```text
//! v=4,msg=1234,tm=560012
//! ```
//!
//! `v` is the protocol version (1 when absent), `msg` the device message
//! sequence number and `tm` the device-relative elapsed time in the
//! version's duration unit. Unknown keys are ignored.

/// Version assumed when the header carries no `v` key.
pub const DEFAULT_PROTOCOL_VERSION: u32 = 1;

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol version; 0 when the value does not parse.
    pub version: u32,
    /// Message sequence number; 0 when absent or invalid.
    pub msg: i64,
    /// Device-relative elapsed time (raw, version unit); 0 when absent or invalid.
    pub tm: i64,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: DEFAULT_PROTOCOL_VERSION,
            msg: 0,
            tm: 0,
        }
    }
}

impl Header {
    /// Parse a comma separated `key=value` header token.
    pub fn parse(token: &str) -> Self {
        let mut header = Header::default();
        for pair in token.split(',') {
            let mut parts = pair.split('=');
            let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            match key {
                "v" if value.is_empty() => header.version = DEFAULT_PROTOCOL_VERSION,
                "v" => header.version = value.parse().unwrap_or(0),
                "msg" => header.msg = value.parse().unwrap_or(0),
                "tm" => header.tm = value.parse().unwrap_or(0),
                _ => {}
            }
        }
        header
    }
}
