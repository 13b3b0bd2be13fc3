// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Prometheus text exposition of [`HandlerMetricsSnapshot`].
//!
//! ```rust,ignore
//! let body = prometheus::export_metrics(&metrics.snapshot(), prometheus::DEFAULT_NAMESPACE);
//! ```

use super::HandlerMetricsSnapshot;
use std::fmt::Write;

/// Namespace of every exported series.
pub const DEFAULT_NAMESPACE: &str = "prusa_metrics_handler";

/// Label value attached to the syslog counters.
const SYSLOG_TYPE: &str = "syslog";

#[derive(Clone, Copy, Debug)]
pub enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

struct MetricDef {
    name: &'static str,
    help: &'static str,
    metric_type: MetricType,
}

const HANDLER_METRICS: &[MetricDef] = &[
    MetricDef {
        name: "syslog_messages_total",
        help: "Total number of syslog messages received",
        metric_type: MetricType::Counter,
    },
    MetricDef {
        name: "syslog_messages_errors_total",
        help: "Total number of syslog receive and write errors",
        metric_type: MetricType::Counter,
    },
    MetricDef {
        name: "datapoints_written_total",
        help: "Total number of data points written to the sink",
        metric_type: MetricType::Counter,
    },
    MetricDef {
        name: "queue_dropped_total",
        help: "Total number of data points dropped by a full queue",
        metric_type: MetricType::Counter,
    },
    MetricDef {
        name: "queue_depth",
        help: "Data points waiting to be written",
        metric_type: MetricType::Gauge,
    },
];

const PRINTER_METRICS: &[MetricDef] = &[
    MetricDef {
        name: "printer_expected_messages",
        help: "Messages expected from the printer in the report window",
        metric_type: MetricType::Gauge,
    },
    MetricDef {
        name: "printer_received_messages",
        help: "Messages received from the printer in the report window",
        metric_type: MetricType::Gauge,
    },
    MetricDef {
        name: "printer_drop_rate",
        help: "Fraction of printer messages lost in the report window",
        metric_type: MetricType::Gauge,
    },
];

/// Render `snapshot` in Prometheus text format under `namespace`.
pub fn export_metrics(snapshot: &HandlerMetricsSnapshot, namespace: &str) -> String {
    let mut output = String::with_capacity(2048);

    for def in HANDLER_METRICS {
        let full_name = format!("{}_{}", namespace, def.name);
        write_header(&mut output, &full_name, def);

        let labels: &[(&str, &str)] = if def.name.starts_with("syslog_") {
            &[("type", SYSLOG_TYPE)]
        } else {
            &[]
        };
        let _ = write!(
            output,
            "{}",
            format_labeled_metric(&full_name, labels, handler_value(snapshot, def.name))
        );
        let _ = writeln!(output);
    }

    if snapshot.printers.is_empty() {
        return output;
    }

    for def in PRINTER_METRICS {
        let full_name = format!("{}_{}", namespace, def.name);
        write_header(&mut output, &full_name, def);

        for (mac, gauges) in &snapshot.printers {
            let value = match def.name {
                "printer_expected_messages" => gauges.expected as f64,
                "printer_received_messages" => gauges.received as f64,
                _ => gauges.drop_rate,
            };
            let _ = write!(
                output,
                "{}",
                format_labeled_metric(&full_name, &[("mac_address", mac.as_str())], value)
            );
        }
        let _ = writeln!(output);
    }

    output
}

fn write_header(output: &mut String, full_name: &str, def: &MetricDef) {
    let _ = writeln!(output, "# TYPE {} {}", full_name, def.metric_type.as_str());
    let _ = writeln!(output, "# HELP {} {}", full_name, def.help);
}

fn handler_value(snapshot: &HandlerMetricsSnapshot, name: &str) -> f64 {
    match name {
        "syslog_messages_total" => snapshot.syslog_messages as f64,
        "syslog_messages_errors_total" => snapshot.syslog_errors as f64,
        "datapoints_written_total" => snapshot.datapoints_written as f64,
        "queue_dropped_total" => snapshot.queue_dropped as f64,
        "queue_depth" => snapshot.queue_depth as f64,
        _ => 0.0,
    }
}

/// Format one sample line, escaping label values.
pub fn format_labeled_metric(name: &str, labels: &[(&str, &str)], value: f64) -> String {
    if labels.is_empty() {
        format!("{} {}\n", name, value)
    } else {
        let label_str: String = labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}{{{}}} {}\n", name, label_str, value)
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
