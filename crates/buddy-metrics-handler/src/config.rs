// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process configuration: YAML file plus command-line overrides.
//!
//! ```yaml
//! listen_host: "0.0.0.0"
//! listen_port: 8514
//! prefix: "prusa_"
//! influxdb:
//!   url: "http://localhost:8181"
//!   org: "prusa"
//!   bucket: "prusa"
//!   token: ""
//! exporter:
//!   metrics_path: "/metrics"
//!   metrics_port: 10011
//! log_level: "info"
//! ```

use buddy_influx_sink::InfluxDbConfig;
use buddy_telemetry::{ConfigError, HandlerConfig};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Path of the liveness route, reserved next to the metrics path.
pub const HEALTH_PATH: &str = "/health";

/// Prometheus endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_metrics_port() -> u16 {
    10011
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            metrics_path: default_metrics_path(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.metrics_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "metrics_path '{}' must start with '/'",
                self.metrics_path
            )));
        }
        if self.metrics_path == HEALTH_PATH {
            return Err(ConfigError::Invalid(format!(
                "metrics_path must not be {}",
                HEALTH_PATH
            )));
        }
        Ok(())
    }
}

/// Whole-process configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener, parser and pipeline settings.
    #[serde(flatten)]
    pub handler: HandlerConfig,

    #[serde(default)]
    pub influxdb: InfluxDbConfig,

    #[serde(default)]
    pub exporter: ExporterConfig,

    /// Log level or `EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            handler: HandlerConfig::default(),
            influxdb: InfluxDbConfig::default(),
            exporter: ExporterConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.handler.validate()?;
        self.influxdb.validate()?;
        self.exporter.validate()
    }

    /// Apply command-line values on top of the file values.
    pub fn apply(&mut self, overrides: &Overrides) {
        let o = overrides.clone();
        if let Some(v) = o.listen_host {
            self.handler.listen_host = v;
        }
        if let Some(v) = o.listen_port {
            self.handler.listen_port = v;
        }
        if let Some(v) = o.prefix {
            self.handler.prefix = v;
        }
        if let Some(v) = o.influx_url {
            self.influxdb.url = v;
        }
        if let Some(v) = o.influx_org {
            self.influxdb.org = v;
        }
        if let Some(v) = o.influx_bucket {
            self.influxdb.bucket = v;
        }
        if let Some(v) = o.influx_token {
            self.influxdb.token = v;
        }
        if let Some(v) = o.metrics_path {
            self.exporter.metrics_path = v;
        }
        if let Some(v) = o.metrics_port {
            self.exporter.metrics_port = v;
        }
        if let Some(v) = o.log_level {
            self.log_level = v;
        }
    }
}

/// Flags that override configuration file values.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// UDP listen address
    #[arg(long)]
    pub listen_host: Option<String>,

    /// UDP listen port
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Measurement name prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// InfluxDB URL
    #[arg(long)]
    pub influx_url: Option<String>,

    /// InfluxDB organization
    #[arg(long)]
    pub influx_org: Option<String>,

    /// InfluxDB bucket
    #[arg(long)]
    pub influx_bucket: Option<String>,

    /// InfluxDB API token
    #[arg(long)]
    pub influx_token: Option<String>,

    /// Prometheus metrics path
    #[arg(long)]
    pub metrics_path: Option<String>,

    /// Prometheus metrics port
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}
