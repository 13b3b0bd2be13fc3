// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-datagram ingestion.
//!
//! ```text
//! bytes -> envelope -> header -> version -> device -> parse
//!       -> register + anchor -> reconstruct -> tag merge -> queue
//! ```
//!
//! Every stage before the queue either succeeds or drops the whole datagram;
//! only the line parser recovers partially.

use crate::config::HandlerConfig;
use crate::envelope::extract;
use crate::error::{EnvelopeError, ParseError};
use crate::header::Header;
use crate::metrics::HandlerMetrics;
use crate::point::{DataPoint, PointTime, Tags};
use crate::protocol::{LineProtocolParser, ProtocolVersion};
use crate::queue::{Enqueue, PointQueue};
use crate::registry::DeviceRegistry;
use crate::timestamp::reconstruct;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Tag carrying the printer identifier on every point.
pub const DEVICE_TAG: &str = "mac_address";

/// Measurement suffix of the per-datagram observation point.
pub const UDP_DATAGRAM_MEASUREMENT: &str = "udp_datagram";

/// UDP header size added to the payload length.
const UDP_HEADER_LEN: usize = 8;

/// Process-wide tags merged into every decoded point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTags {
    pub hostname: String,
    pub port: u16,
    pub session_start: DateTime<Utc>,
}

impl AppTags {
    pub fn new(hostname: impl Into<String>, port: u16, session_start: DateTime<Utc>) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            session_start,
        }
    }

    /// Tags for this host, started now.
    pub fn detect(port: u16) -> Self {
        Self::new(local_hostname(), port, Utc::now())
    }

    pub fn to_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert("hostname".to_string(), self.hostname.clone());
        tags.insert("port".to_string(), self.port.to_string());
        tags.insert(
            "session_start_time".to_string(),
            self.session_start.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        tags
    }
}

/// Kernel hostname, then `$HOSTNAME`/`$HOST`, then `"localhost"`.
fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .or_else(|| std::env::var("HOST").ok())
        .unwrap_or_else(|| "localhost".to_string())
}

/// A datagram that decoded successfully, before it is queued.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDatagram {
    pub mac: String,
    pub version: ProtocolVersion,
    /// `<prefix>udp_datagram` observation.
    pub observation: DataPoint,
    /// Decoded points in line order, absolute times and merged tags.
    pub points: Vec<DataPoint>,
}

/// What happened to one datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum DatagramOutcome {
    /// Observation and points handed to the queue.
    Forwarded {
        mac: String,
        points: usize,
        dropped: usize,
    },
    /// Not a telemetry envelope.
    Ignored(EnvelopeError),
    /// Telemetry envelope that could not be decoded.
    Rejected(ParseError),
}

/// Ingestion pipeline shared by the receive loop.
#[derive(Debug)]
pub struct Pipeline {
    app_label: String,
    prefix: String,
    parsers: [LineProtocolParser; 3],
    app_tags: Tags,
    registry: Arc<DeviceRegistry>,
    queue: PointQueue,
    metrics: Arc<HandlerMetrics>,
}

impl Pipeline {
    pub fn new(
        config: &HandlerConfig,
        app_tags: &AppTags,
        registry: Arc<DeviceRegistry>,
        queue: PointQueue,
        metrics: Arc<HandlerMetrics>,
    ) -> Self {
        let prefix = config.prefix.clone();
        Self {
            app_label: config.app_label.clone(),
            parsers: [
                LineProtocolParser::new(ProtocolVersion::V2, prefix.clone()),
                LineProtocolParser::new(ProtocolVersion::V3, prefix.clone()),
                LineProtocolParser::new(ProtocolVersion::V4, prefix.clone()),
            ],
            prefix,
            app_tags: app_tags.to_tags(),
            registry,
            queue,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Process one datagram received now.
    pub fn process_datagram(&self, payload: &[u8]) -> DatagramOutcome {
        self.process_datagram_at(payload, Utc::now())
    }

    /// Process one datagram received at `now` and queue its points.
    pub fn process_datagram_at(&self, payload: &[u8], now: DateTime<Utc>) -> DatagramOutcome {
        self.metrics.record_message();

        let decoded = match self.decode_datagram_at(payload, now) {
            Ok(decoded) => decoded,
            Err(outcome) => return outcome,
        };

        let points = decoded.points.len();
        let mut dropped = 0;
        for point in std::iter::once(decoded.observation).chain(decoded.points) {
            match self.queue.push(point) {
                Enqueue::Queued => {}
                Enqueue::Dropped => dropped += 1,
                Enqueue::Closed => {
                    tracing::debug!("point queue closed");
                    break;
                }
            }
        }
        if dropped > 0 {
            self.metrics.record_queue_dropped(dropped as u64);
            tracing::debug!(mac = %decoded.mac, dropped, "queue full, points dropped");
        }
        self.metrics.set_queue_depth(self.queue.depth());

        DatagramOutcome::Forwarded {
            mac: decoded.mac,
            points,
            dropped,
        }
    }

    /// Decode one datagram and update device state, without queueing.
    pub fn decode_datagram_at(
        &self,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<DecodedDatagram, DatagramOutcome> {
        let text = String::from_utf8_lossy(payload);

        let envelope = extract(&text, &self.app_label).map_err(|e| {
            tracing::trace!(error = %e, "datagram ignored");
            DatagramOutcome::Ignored(e)
        })?;
        let (header_token, body) = envelope
            .split_body()
            .map_err(DatagramOutcome::Ignored)?;

        let header = Header::parse(header_token);
        let version = ProtocolVersion::from_number(header.version).map_err(|e| {
            tracing::info!(mac = %envelope.source, version = header.version, "received unsupported version");
            DatagramOutcome::Rejected(e)
        })?;

        let device = self.registry.get_or_create(envelope.source);
        let mut points = self.parser(version).parse(body);

        let elapsed = version.make_duration(header.tm);
        let base = device.observe_message_at(header.msg, elapsed, now);
        reconstruct(&mut points, version, base);

        for point in &mut points {
            point
                .tags
                .insert(DEVICE_TAG.to_string(), device.mac().to_string());
            point
                .tags
                .extend(self.app_tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let observation = DataPoint::new(
            format!("{}{}", self.prefix, UDP_DATAGRAM_MEASUREMENT),
            PointTime::Absolute(now),
        )
        .with_tag(DEVICE_TAG, device.mac())
        .with_field("size", (UDP_HEADER_LEN + payload.len()) as i64)
        .with_field("points", points.len() as i64);

        tracing::trace!(
            mac = %device.mac(),
            version = %version,
            msg = header.msg,
            points = points.len(),
            "datagram decoded"
        );

        Ok(DecodedDatagram {
            mac: device.mac().to_string(),
            version,
            observation,
            points,
        })
    }

    fn parser(&self, version: ProtocolVersion) -> &LineProtocolParser {
        match version {
            ProtocolVersion::V2 => &self.parsers[0],
            ProtocolVersion::V3 => &self.parsers[1],
            ProtocolVersion::V4 => &self.parsers[2],
        }
    }
}
