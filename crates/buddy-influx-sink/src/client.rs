// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Blocking InfluxDB v2 client and the [`PointSink`] built on it.

use crate::buffer::BatchBuffer;
use crate::config::InfluxDbConfig;
use crate::influx::encode_point;
use buddy_telemetry::{DataPoint, PointSink, SinkError};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;

/// Transport for encoded write bodies.
pub trait LineTransport: Send {
    /// Deliver one newline-separated body.
    fn send(&self, body: &str) -> Result<(), SinkError>;

    /// True when the backend reports ready.
    fn ready(&self) -> Result<bool, SinkError>;
}

/// HTTP transport for the InfluxDB v2 write API.
///
/// Uses the blocking reqwest client: it must not be called from inside an
/// async runtime.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    write_url: Url,
    ready_url: Url,
    token: String,
}

impl HttpTransport {
    pub fn new(config: &InfluxDbConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            write_url: config
                .write_url()
                .map_err(|e| SinkError::Endpoint(e.to_string()))?,
            ready_url: config
                .ready_url()
                .map_err(|e| SinkError::Endpoint(e.to_string()))?,
            token: config.token.clone(),
        })
    }
}

impl LineTransport for HttpTransport {
    fn send(&self, body: &str) -> Result<(), SinkError> {
        let mut request = self
            .client
            .post(self.write_url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body.to_string());
        if !self.token.is_empty() {
            request = request.header(AUTHORIZATION, format!("Token {}", self.token));
        }

        let response = request
            .send()
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(SinkError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn ready(&self) -> Result<bool, SinkError> {
        let response = self
            .client
            .get(self.ready_url.clone())
            .send()
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

/// Batching InfluxDB sink.
///
/// Points are encoded on write and sent in batches of `batch_size` lines, or
/// earlier when a partial batch outlives `flush_interval_ms`. A failed batch
/// is logged and discarded.
pub struct InfluxSink<T: LineTransport> {
    transport: T,
    buffer: BatchBuffer,
}

impl InfluxSink<HttpTransport> {
    /// Build an HTTP sink from configuration.
    pub fn connect(config: &InfluxDbConfig) -> Result<Self, SinkError> {
        Ok(Self::with_transport(config, HttpTransport::new(config)?))
    }
}

impl<T: LineTransport> InfluxSink<T> {
    pub fn with_transport(config: &InfluxDbConfig, transport: T) -> Self {
        Self {
            transport,
            buffer: BatchBuffer::new(config.batch_size, config.flush_interval()),
        }
    }

    /// Probe the backend readiness endpoint.
    pub fn ready(&self) -> Result<bool, SinkError> {
        self.transport.ready()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Lines waiting for the next batch.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn send(&self, body: String) -> Result<(), SinkError> {
        let lines = body.lines().count();
        match self.transport.send(&body) {
            Ok(()) => {
                tracing::trace!(lines, bytes = body.len(), "batch written");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(lines, error = %e, "batch write failed, dropped");
                Err(e)
            }
        }
    }
}

impl<T: LineTransport> PointSink for InfluxSink<T> {
    fn write(&mut self, point: &DataPoint) -> Result<(), SinkError> {
        let line = encode_point(point)?;
        match self.buffer.push(&line) {
            Some(body) => self.send(body),
            None => Ok(()),
        }
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        match self.buffer.take() {
            Some(body) => self.send(body),
            None => Ok(()),
        }
    }

    fn flush_due(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_due() {
            self.flush()
        } else {
            Ok(())
        }
    }
}
