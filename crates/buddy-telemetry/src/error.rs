// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the ingestion pipeline.
//!
//! None of these ever reach the receive loop: the pipeline turns each one
//! into a counter increment and a log line.

use thiserror::Error;

/// Reasons a datagram is not accepted as a Buddy syslog envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Payload does not follow the `<PRI>1 TS HOST APP PROCID MSGID SD MSG` shape.
    #[error("datagram is not an RFC 5424 syslog message")]
    NotSyslog,

    /// Well-formed syslog from an application other than the firmware tag.
    #[error("unexpected application label: {0}")]
    ForeignApplication(String),

    /// The free-text body lacks either the header token or the points body.
    #[error("message body has no serialized points")]
    MissingPoints,
}

/// Errors raised while decoding the inner telemetry protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The header announced a version with no registered parser.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u32),

    /// A line has no field section.
    #[error("line has no field set")]
    MissingFields,

    /// A line is longer than the version allows.
    #[error("line exceeds {max} bytes ({len})")]
    LineTooLong { len: usize, max: usize },
}

/// Errors reported by a [`PointSink`](crate::sink::PointSink).
#[derive(Debug, Error)]
pub enum SinkError {
    /// The point cannot be represented by the sink (no fields, unresolved time).
    #[error("point rejected: {0}")]
    Rejected(String),

    /// Network or client failure while talking to the backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend endpoint cannot be built from configuration.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

/// Errors raised while starting the ingestion service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid listen address {0}")]
    Address(String),

    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
