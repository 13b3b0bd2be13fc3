// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Service over a real loopback socket with an in-memory sink.

use buddy_telemetry::{HandlerConfig, HandlerMetrics, MemorySink, Service};
use std::net::UdpSocket;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const MAC: &str = "10:9c:70:12:34:56";

fn wait_for(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

#[test]
fn test_datagrams_reach_sink_and_metrics() {
    let config = HandlerConfig {
        listen_host: "127.0.0.1".into(),
        listen_port: 0,
        report_interval_ms: 20,
        ..Default::default()
    };
    let sink = MemorySink::new();
    let metrics = Arc::new(HandlerMetrics::new());
    let service = Service::start(&config, sink.clone(), Arc::clone(&metrics)).expect("start service");

    let client = UdpSocket::bind("127.0.0.1:0").expect("bind client");
    for seq in [1, 2, 4] {
        let msg = format!(
            "<134>1 - {} buddy - - - v=4,msg={},tm=1000 temp v=20.5 0\nfan v=100i 10",
            MAC, seq
        );
        client
            .send_to(msg.as_bytes(), service.local_addr())
            .expect("send datagram");
    }
    client
        .send_to(b"not a syslog message", service.local_addr())
        .expect("send garbage");

    assert!(wait_for(Duration::from_secs(5), || metrics.syslog_messages() == 4));
    // gauges from an earlier tick may predate the last datagram
    assert!(wait_for(Duration::from_secs(5), || metrics
        .printer(MAC)
        .is_some_and(|g| g.expected == 4 && g.received == 3)));
    let gauges = metrics.printer(MAC).unwrap();
    assert!((gauges.drop_rate - 0.25).abs() < 1e-9);

    let stats = service.shutdown();
    // 3 datagrams x (observation + 2 points)
    assert_eq!(stats.written, 9);
    assert_eq!(sink.len(), 9);
    assert_eq!(sink.flushes(), 1);
    assert_eq!(metrics.datapoints_written(), 9);

    let points = sink.points();
    assert!(points.iter().all(|p| p.timestamp().is_some()));
    assert!(points.iter().all(|p| p.tags["mac_address"] == MAC));
    assert_eq!(
        points
            .iter()
            .filter(|p| p.measurement == "prusa_udp_datagram")
            .count(),
        3
    );
}

#[test]
fn test_port_in_use_is_bind_error() {
    let config = HandlerConfig {
        listen_host: "127.0.0.1".into(),
        listen_port: 0,
        ..Default::default()
    };
    let first = Service::start(&config, MemorySink::new(), Arc::new(HandlerMetrics::new())).expect("start first");
    let port = first.local_addr().port();

    let second = HandlerConfig {
        listen_port: port,
        ..config
    };
    match Service::start(&second, MemorySink::new(), Arc::new(HandlerMetrics::new())) {
        Err(buddy_telemetry::ServiceError::Bind { addr, .. }) => {
            assert_eq!(addr, format!("127.0.0.1:{}", port));
        }
        Err(other) => panic!("expected bind error, got {}", other),
        Ok(service) => {
            service.shutdown();
            panic!("second service bound port {} already in use", port);
        }
    }

    first.shutdown();
}
