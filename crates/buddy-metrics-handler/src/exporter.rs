// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Prometheus scrape endpoint.

use crate::config::HEALTH_PATH;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use buddy_telemetry::metrics::prometheus::{export_metrics, DEFAULT_NAMESPACE};
use buddy_telemetry::HandlerMetrics;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Prometheus text exposition content type.
const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Router serving the metrics page at `metrics_path` and a liveness probe.
pub fn router(metrics: Arc<HandlerMetrics>, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<HandlerMetrics>>) -> Response {
    let body = export_metrics(&metrics.snapshot(), DEFAULT_NAMESPACE);
    ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response()
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use buddy_telemetry::PrinterGauges;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn get_raw(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_metrics_handler_body() {
        let metrics = Arc::new(HandlerMetrics::new());
        metrics.record_message();
        metrics.record_written(4);

        let response = metrics_handler(State(metrics)).await;
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            TEXT_FORMAT
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("prusa_metrics_handler_syslog_messages_total{type=\"syslog\"} 1"));
        assert!(text.contains("prusa_metrics_handler_datapoints_written_total 4"));
    }

    #[tokio::test]
    async fn test_serve_custom_path_and_health() {
        let metrics = Arc::new(HandlerMetrics::new());
        metrics.set_printer(
            "10:9c:70:aa:bb:cc",
            PrinterGauges {
                expected: 10,
                received: 8,
                drop_rate: 0.2,
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, router(metrics, "/prom"), async move {
            let _ = rx.await;
        }));

        let page = get_raw(addr, "/prom").await;
        assert!(page.starts_with("HTTP/1.1 200"));
        assert!(page.contains("mac_address=\"10:9c:70:aa:bb:cc\""));

        let health = get_raw(addr, HEALTH_PATH).await;
        assert!(health.starts_with("HTTP/1.1 200"));
        assert!(health.ends_with("OK"));

        let missing = get_raw(addr, "/metrics").await;
        assert!(missing.starts_with("HTTP/1.1 404"));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
