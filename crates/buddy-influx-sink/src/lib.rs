// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Buddy InfluxDB Sink
//!
//! Writes decoded printer telemetry to InfluxDB v2.
//!
//! This crate provides:
//! - YAML connection settings (`influxdb:` section)
//! - InfluxDB v2 Line Protocol encoding of [`buddy_telemetry::DataPoint`]
//! - Batching with size and time-based flushing
//! - A blocking HTTP client implementing [`buddy_telemetry::PointSink`]
//!
//! ```text
//! DataPoint --> encode_point --> BatchBuffer --> LineTransport (POST /api/v2/write)
//! ```

pub mod buffer;
pub mod client;
pub mod config;
pub mod influx;

pub use buffer::BatchBuffer;
pub use client::{HttpTransport, InfluxSink, LineTransport};
pub use config::InfluxDbConfig;
pub use influx::encode_point;
