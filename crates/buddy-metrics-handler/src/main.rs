// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Buddy Metrics Handler
//!
//! Receives printer telemetry over UDP syslog, writes it to InfluxDB and
//! exposes handler metrics for Prometheus.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: syslog on 0.0.0.0:8514, InfluxDB on localhost:8181
//! buddy-metrics-handler
//!
//! # Using configuration file
//! buddy-metrics-handler --config handler.yaml
//!
//! # Override single values
//! buddy-metrics-handler --config handler.yaml --listen-port 9514 --influx-token "$TOKEN"
//!
//! # Write an example configuration
//! buddy-metrics-handler gen-config --output handler.yaml
//! ```

mod config;
mod exporter;

use anyhow::{Context, Result};
use buddy_influx_sink::InfluxSink;
use buddy_telemetry::{HandlerMetrics, Service};
use clap::{Parser, Subcommand};
use config::{AppConfig, Overrides};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Buddy printer telemetry handler
#[derive(Parser, Debug)]
#[command(name = "buddy-metrics-handler")]
#[command(author = "naskel.com")]
#[command(about = "Syslog telemetry handler for Buddy printers - InfluxDB output and Prometheus metrics")]
#[command(version)]
struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "buddy-metrics-handler.yaml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(cmd) = cli.command {
        init_logging(cli.overrides.log_level.as_deref().unwrap_or("info"));
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => AppConfig::default(),
    };
    config.apply(&cli.overrides);

    init_logging(&config.log_level);
    config.validate().context("invalid configuration")?;

    run(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(config: AppConfig) -> Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting buddy-metrics-handler");

    // The blocking client must be built and probed outside the async runtime.
    let sink = InfluxSink::connect(&config.influxdb).context("failed to create InfluxDB client")?;
    match sink.ready() {
        Ok(true) => tracing::info!(url = %config.influxdb.url, "InfluxDB ready"),
        Ok(false) => tracing::warn!(url = %config.influxdb.url, "InfluxDB not ready, writes may fail"),
        Err(e) => tracing::warn!(url = %config.influxdb.url, error = %e, "InfluxDB unreachable, writes may fail"),
    }

    let metrics = Arc::new(HandlerMetrics::new());
    let service = Service::start(&config.handler, sink, Arc::clone(&metrics))
        .with_context(|| format!("failed to start syslog listener on {}", config.handler.listen_addr()))?;
    tracing::info!(
        addr = %service.local_addr(),
        bucket = %config.influxdb.bucket,
        "listening for syslog datagrams"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("buddy-http")
        .build()
        .context("failed to build async runtime")?;

    let served = runtime.block_on(serve_metrics(&config, metrics));

    tracing::info!("shutting down");
    let stats = service.shutdown();
    tracing::info!(written = stats.written, failed = stats.failed, "shutdown complete");

    served
}

async fn serve_metrics(config: &AppConfig, metrics: Arc<HandlerMetrics>) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.exporter.metrics_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind metrics endpoint {}", addr))?;
    tracing::info!(
        addr = %addr,
        path = %config.exporter.metrics_path,
        "serving Prometheus metrics"
    );

    let app = exporter::router(metrics, &config.exporter.metrics_path);
    exporter::serve(listener, app, shutdown_signal())
        .await
        .context("metrics endpoint failed")
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn cmd_gen_config(output: PathBuf) -> Result<()> {
    let yaml = serde_yaml::to_string(&AppConfig::default()).context("failed to serialize configuration")?;

    let content = format!(
        r#"# Buddy Metrics Handler Configuration
# Generated by buddy-metrics-handler gen-config

{}"#,
        yaml
    );

    std::fs::write(&output, content).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<()> {
    let result = AppConfig::from_file(&config_path).and_then(|config| {
        config.validate()?;
        Ok(config)
    });

    match result {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Syslog:   udp://{}", config.handler.listen_addr());
            println!("Prefix:   {}", config.handler.prefix);
            println!(
                "InfluxDB: {} (org {}, bucket {})",
                config.influxdb.url, config.influxdb.org, config.influxdb.bucket
            );
            println!(
                "Metrics:  :{}{}",
                config.exporter.metrics_port, config.exporter.metrics_path
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}
