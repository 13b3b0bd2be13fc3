// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion configuration.
//!
//! Loaded from YAML; every field has a default so an empty document is a
//! valid configuration.

use crate::envelope::BUDDY_APP_LABEL;
use crate::queue::{Backpressure, DEFAULT_QUEUE_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Ingestion service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Address the UDP socket binds to.
    #[serde(default = "default_listen_host")]
    pub listen_host: String,

    /// UDP port.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Prepended to every measurement name.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Syslog application label accepted as printer telemetry.
    #[serde(default = "default_app_label")]
    pub app_label: String,

    /// Drop-rate window length (seconds).
    #[serde(default = "default_report_window")]
    pub report_window_secs: f64,

    /// Reporter tick (milliseconds).
    #[serde(default = "default_report_interval")]
    pub report_interval_ms: u64,

    /// Point queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Full queue policy.
    #[serde(default)]
    pub backpressure: Backpressure,

    /// SO_RCVBUF override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recv_buffer_bytes: Option<usize>,
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    8514
}

fn default_prefix() -> String {
    "prusa_".to_string()
}

fn default_app_label() -> String {
    BUDDY_APP_LABEL.to_string()
}

fn default_report_window() -> f64 {
    3.0
}

fn default_report_interval() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
            prefix: default_prefix(),
            app_label: default_app_label(),
            report_window_secs: default_report_window(),
            report_interval_ms: default_report_interval(),
            queue_capacity: default_queue_capacity(),
            backpressure: Backpressure::default(),
            recv_buffer_bytes: None,
        }
    }
}

impl HandlerConfig {
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

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be > 0".into()));
        }
        if !(self.report_window_secs.is_finite() && self.report_window_secs > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "report_window_secs must be positive, got {}",
                self.report_window_secs
            )));
        }
        if self.report_interval_ms == 0 {
            return Err(ConfigError::Invalid("report_interval_ms must be > 0".into()));
        }
        if !self
            .prefix
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(ConfigError::Invalid(format!(
                "prefix '{}' must match [A-Za-z0-9_]*",
                self.prefix
            )));
        }
        if self.app_label.trim().is_empty() {
            return Err(ConfigError::Invalid("app_label must not be empty".into()));
        }
        Ok(())
    }

    /// `host:port` the socket binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }

    /// Drop-rate window as a signed duration.
    pub fn report_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.report_window_secs * 1000.0).round() as i64)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}
