// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Buddy Telemetry Ingestion
//!
//! Receives syslog datagrams from Buddy printer firmware, decodes the
//! embedded telemetry and hands absolute-time data points to a sink.
//!
//! # Features
//!
//! - **Envelope**: RFC 5424 shaped syslog, filtered by application label
//! - **Protocol**: line encoding versions 2, 3 and 4
//! - **Sequence tracking**: per-printer duplicate detection and drop rate
//! - **Timestamps**: session anchoring from device-relative elapsed time
//! - **Service**: UDP receive loop, bounded queue, writer and reporter threads
//!
//! # Data flow
//!
//! ```text
//! UDP --> Envelope --> Header --> LineProtocolParser --> Device (register + anchor)
//!     --> reconstruct --> PointQueue --> Writer --> PointSink
//!
//! Reporter (tick) --> Device::create_report --> HandlerMetrics
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use buddy_telemetry::{HandlerConfig, HandlerMetrics, MemorySink, Service};
//! use std::sync::Arc;
//!
//! let config = HandlerConfig::default();
//! let service = Service::start(&config, MemorySink::new(), Arc::new(HandlerMetrics::new()))?;
//! // ...
//! service.shutdown();
//! # Ok::<(), buddy_telemetry::ServiceError>(())
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod header;
pub mod metrics;
pub mod pipeline;
pub mod point;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod reporter;
pub mod service;
pub mod sink;
pub mod timestamp;
pub mod tracker;
pub mod writer;

pub use config::{ConfigError, HandlerConfig};
pub use envelope::{extract, Envelope, BUDDY_APP_LABEL};
pub use error::{EnvelopeError, ParseError, ServiceError, SinkError};
pub use header::Header;
pub use metrics::{HandlerMetrics, HandlerMetricsSnapshot, PrinterGauges};
pub use pipeline::{AppTags, DatagramOutcome, DecodedDatagram, Pipeline};
pub use point::{DataPoint, FieldValue, Fields, PointTime, Tags};
pub use protocol::{LineProtocolParser, ProtocolVersion};
pub use queue::{Backpressure, PointQueue};
pub use registry::{Device, DeviceRegistry};
pub use reporter::Reporter;
pub use service::{Service, StopHandle};
pub use sink::{MemorySink, PointSink};
pub use timestamp::{reconstruct, SessionClock};
pub use tracker::{DropReport, SequenceTracker};
pub use writer::{Writer, WriterStats};
