// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB v2 connection settings.

use buddy_telemetry::ConfigError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// InfluxDB v2 connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluxDbConfig {
    /// Server URL (e.g., "http://localhost:8181").
    #[serde(default = "default_url")]
    pub url: String,

    /// Organization.
    #[serde(default = "default_org")]
    pub org: String,

    /// Bucket.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// API token; empty disables the `Authorization` header.
    #[serde(default)]
    pub token: String,

    /// Lines per write request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum age of a partial batch (milliseconds).
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,

    /// HTTP request timeout (milliseconds).
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_url() -> String {
    "http://localhost:8181".to_string()
}

fn default_org() -> String {
    "prusa".to_string()
}

fn default_bucket() -> String {
    "prusa".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_flush_interval() -> u64 {
    1000
}

fn default_timeout() -> u64 {
    5000
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            org: default_org(),
            bucket: default_bucket(),
            token: String::new(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval(),
            timeout_ms: default_timeout(),
        }
    }
}

impl InfluxDbConfig {
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
        self.base_url()?;
        if self.org.is_empty() {
            return Err(ConfigError::Invalid("influxdb org must not be empty".into()));
        }
        if self.bucket.is_empty() {
            return Err(ConfigError::Invalid("influxdb bucket must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("influxdb batch_size must be > 0".into()));
        }
        Ok(())
    }

    /// Parsed server URL with a trailing `/` so endpoints join under it.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| ConfigError::Invalid(format!("influxdb url '{}': {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "influxdb url '{}' must use http or https",
                self.url
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Invalid(format!(
                "influxdb url '{}' must not carry a query or fragment",
                self.url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// `/api/v2/write` endpoint with nanosecond precision.
    pub fn write_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.endpoint("api/v2/write")?;
        url.query_pairs_mut()
            .append_pair("org", &self.org)
            .append_pair("bucket", &self.bucket)
            .append_pair("precision", "ns");
        Ok(url)
    }

    /// Readiness endpoint.
    pub fn ready_url(&self) -> Result<Url, ConfigError> {
        self.endpoint("ready")
    }

    fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        self.base_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid(format!("influxdb url '{}': {}", self.url, e)))
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InfluxDbConfig::default();
        assert_eq!(config.url, "http://localhost:8181");
        assert_eq!(config.org, "prusa");
        assert_eq!(config.bucket, "prusa");
        assert_eq!(config.batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = InfluxDbConfig::from_yaml("url: \"https://influx.example.com/\"\ntoken: \"t0k\"\n")
            .expect("parse yaml");
        assert_eq!(config.token, "t0k");
        assert_eq!(config.bucket, "prusa");
        assert_eq!(config.ready_url().unwrap().as_str(), "https://influx.example.com/ready");
    }

    #[test]
    fn test_write_url_encodes_query() {
        let config = InfluxDbConfig {
            org: "my org".into(),
            bucket: "farm/1".into(),
            ..Default::default()
        };
        assert_eq!(
            config.write_url().unwrap().as_str(),
            "http://localhost:8181/api/v2/write?org=my+org&bucket=farm%2F1&precision=ns"
        );
    }

    #[test]
    fn test_endpoints_keep_base_path() {
        let config = InfluxDbConfig {
            url: "https://proxy.example.com/influx".into(),
            ..Default::default()
        };
        assert_eq!(
            config.write_url().unwrap().as_str(),
            "https://proxy.example.com/influx/api/v2/write?org=prusa&bucket=prusa&precision=ns"
        );
        assert_eq!(
            config.ready_url().unwrap().as_str(),
            "https://proxy.example.com/influx/ready"
        );
    }

    #[test]
    fn test_validation() {
        let bad = [
            InfluxDbConfig {
                url: "localhost:8181".into(),
                ..Default::default()
            },
            InfluxDbConfig {
                url: "http://influx:8086/?db=x".into(),
                ..Default::default()
            },
            InfluxDbConfig {
                url: "http://".into(),
                ..Default::default()
            },
            InfluxDbConfig {
                url: "ftp://influx:8086".into(),
                ..Default::default()
            },
            InfluxDbConfig {
                bucket: String::new(),
                ..Default::default()
            },
            InfluxDbConfig {
                batch_size: 0,
                ..Default::default()
            },
        ];
        for config in &bad {
            match config.validate() {
                Err(ConfigError::Invalid(_)) => {}
                other => panic!("expected Invalid for {:?}, got {:?}", config, other),
            }
        }
    }
}
