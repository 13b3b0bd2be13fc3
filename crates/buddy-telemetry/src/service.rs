// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion service lifecycle.
//!
//! Three threads:
//!
//! - `buddy-recv`: blocking UDP reads, one datagram decoded at a time.
//! - `buddy-writer`: drains the point queue into the sink.
//! - `buddy-reporter`: publishes drop reports on a fixed tick.
//!
//! Shutdown stops the receive loop first. Dropping its pipeline closes the
//! queue, so the writer drains what is left, flushes, and exits.

use crate::config::HandlerConfig;
use crate::error::ServiceError;
use crate::metrics::HandlerMetrics;
use crate::pipeline::{AppTags, Pipeline};
use crate::queue::PointQueue;
use crate::registry::DeviceRegistry;
use crate::reporter::Reporter;
use crate::sink::PointSink;
use crate::writer::{Writer, WriterStats};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Largest UDP payload.
const MAX_DATAGRAM_LEN: usize = 65_535;

/// Read timeout bounding how long the receive loop takes to notice a stop.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Cooperative stop flag shared by the service threads.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Ask every thread holding this handle to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Running ingestion service.
pub struct Service {
    local_addr: SocketAddr,
    stop: StopHandle,
    registry: Arc<DeviceRegistry>,
    metrics: Arc<HandlerMetrics>,
    receiver: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<WriterStats>>,
    reporter: Option<JoinHandle<()>>,
}

impl Service {
    /// Bind the UDP socket and start the service threads.
    pub fn start<S>(config: &HandlerConfig, sink: S, metrics: Arc<HandlerMetrics>) -> Result<Self, ServiceError>
    where
        S: PointSink + 'static,
    {
        config.validate()?;

        let socket = bind_socket(config)?;
        let local_addr = socket.local_addr()?;
        socket.set_read_timeout(Some(RECV_POLL_INTERVAL))?;

        let registry = Arc::new(DeviceRegistry::new());
        let (queue, rx) = PointQueue::bounded(config.queue_capacity, config.backpressure);
        let app_tags = AppTags::detect(local_addr.port());

        let mut service = Self {
            local_addr,
            stop: StopHandle::new(),
            registry: Arc::clone(&registry),
            metrics: Arc::clone(&metrics),
            receiver: None,
            writer: None,
            reporter: None,
        };

        // Declared after `service` so an early return drops the queue sender
        // before Drop joins the writer.
        let pipeline = Pipeline::new(
            config,
            &app_tags,
            Arc::clone(&registry),
            queue,
            Arc::clone(&metrics),
        );

        // On a failed spawn, Drop stops and joins whatever already runs.
        let writer = Writer::new(rx, sink, Arc::clone(&metrics));
        service.writer = Some(
            thread::Builder::new()
                .name("buddy-writer".into())
                .spawn(move || writer.run())?,
        );

        let reporter = Reporter::new(Arc::clone(&registry), Arc::clone(&metrics), config.report_window());
        let interval = config.report_interval();
        let stop = service.stop.clone();
        service.reporter = Some(
            thread::Builder::new()
                .name("buddy-reporter".into())
                .spawn(move || reporter.run(interval, stop))?,
        );

        let stop = service.stop.clone();
        service.receiver = Some(
            thread::Builder::new()
                .name("buddy-recv".into())
                .spawn(move || receive_loop(socket, pipeline, metrics, stop))?,
        );

        tracing::info!(
            addr = %local_addr,
            queue_capacity = config.queue_capacity,
            backpressure = ?config.backpressure,
            "syslog listener started"
        );
        Ok(service)
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<HandlerMetrics> {
        &self.metrics
    }

    /// Stop all threads and wait for them; returns the writer totals.
    pub fn shutdown(mut self) -> WriterStats {
        self.join_all()
    }

    fn join_all(&mut self) -> WriterStats {
        self.stop.stop();

        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                tracing::error!("receive thread panicked");
            }
        }
        let stats = match self.writer.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                tracing::error!("writer thread panicked");
                WriterStats::default()
            }
            None => WriterStats::default(),
        };
        if let Some(handle) = self.reporter.take() {
            if handle.join().is_err() {
                tracing::error!("reporter thread panicked");
            }
        }
        stats
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.join_all();
    }
}

fn bind_socket(config: &HandlerConfig) -> Result<UdpSocket, ServiceError> {
    let listen = config.listen_addr();
    let addr = listen
        .to_socket_addrs()
        .map_err(|_| ServiceError::Address(listen.clone()))?
        .next()
        .ok_or_else(|| ServiceError::Address(listen.clone()))?;

    let bind = |addr: SocketAddr| -> io::Result<UdpSocket> {
        // No SO_REUSEADDR: a second instance on the same port must fail to bind.
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        if let Some(size) = config.recv_buffer_bytes {
            socket.set_recv_buffer_size(size)?;
        }
        socket.bind(&addr.into())?;
        Ok(socket.into())
    };

    bind(addr).map_err(|source| ServiceError::Bind {
        addr: listen,
        source,
    })
}

fn receive_loop(socket: UdpSocket, pipeline: Pipeline, metrics: Arc<HandlerMetrics>, stop: StopHandle) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];

    while stop.is_running() {
        match socket.recv_from(&mut buf) {
            Ok((len, _peer)) => {
                pipeline.process_datagram(&buf[..len]);
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                metrics.record_error();
                tracing::warn!(error = %e, "UDP read failed");
            }
        }
    }
    tracing::debug!("receive loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn loopback_config() -> HandlerConfig {
        HandlerConfig {
            listen_host: "127.0.0.1".into(),
            listen_port: 0,
            report_interval_ms: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_stop_handle_shared() {
        let stop = StopHandle::new();
        let other = stop.clone();
        assert!(other.is_running());
        stop.stop();
        assert!(!other.is_running());
    }

    #[test]
    fn test_start_and_shutdown_flushes_sink() {
        let sink = MemorySink::new();
        let service = Service::start(&loopback_config(), sink.clone(), Arc::new(HandlerMetrics::new())).unwrap();
        assert_ne!(service.local_addr().port(), 0);

        let stats = service.shutdown();
        assert_eq!(stats, WriterStats::default());
        assert_eq!(sink.flushes(), 1);
    }

    #[test]
    fn test_invalid_config_refused() {
        let config = HandlerConfig {
            queue_capacity: 0,
            ..loopback_config()
        };
        match Service::start(&config, MemorySink::new(), Arc::new(HandlerMetrics::new())) {
            Err(ServiceError::Config(_)) => {}
            Err(other) => panic!("expected Config error, got {}", other),
            Ok(_) => panic!("expected Config error"),
        }
    }
}
