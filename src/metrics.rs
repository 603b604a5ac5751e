// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for dnsclaim runs.
//!
//! All metrics use the `dnsclaim_` prefix. A run is a one-shot batch, so
//! there is no scrape endpoint; the registry is written once at the end of
//! the run in text exposition format (see [`write_textfile`]), suitable for
//! the node exporter textfile collector.
//!
//! # Example
//!
//! ```rust,no_run
//! use dnsclaim::metrics::{record_operation, write_textfile};
//!
//! record_operation("create", true);
//! write_textfile(std::path::Path::new("/var/lib/node_exporter/dnsclaim.prom")).ok();
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "dnsclaim";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Provider writes by action and result
///
/// Labels:
/// - `action`: `create`, `update` or `delete`
/// - `result`: `success` or `failure`
pub static OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_operations_total"),
        "Total number of provider writes by action and result",
    );
    let counter = CounterVec::new(opts, &["action", "result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Validation diagnostics by kind
///
/// Labels:
/// - `kind`: `malformed`, `schema`, `security` or `policy`
pub static DIAGNOSTICS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_diagnostics_total"),
        "Total number of validation diagnostics by kind",
    );
    let counter = CounterVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of a full run in seconds
///
/// Labels:
/// - `result`: `success` or `failure`
pub static RECONCILE_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconcile_duration_seconds"),
        "Duration of reconciliation runs in seconds",
    )
    .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]);
    let histogram = HistogramVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

fn result_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Record one provider write.
pub fn record_operation(action: &str, success: bool) {
    OPERATIONS_TOTAL
        .with_label_values(&[action, result_label(success)])
        .inc();
}

/// Record one validation diagnostic.
pub fn record_diagnostic(kind: &str) {
    DIAGNOSTICS_TOTAL.with_label_values(&[kind]).inc();
}

/// Record the duration of a reconciliation run.
pub fn record_reconcile_duration(duration: Duration, success: bool) {
    RECONCILE_DURATION_SECONDS
        .with_label_values(&[result_label(success)])
        .observe(duration.as_secs_f64());
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

/// Write the registry to `path`.
///
/// The text is written to a sibling temporary file first and renamed into
/// place, so collectors never read a partial file.
///
/// # Errors
/// Returns error if encoding or any filesystem operation fails
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    let text = gather_metrics().map_err(|e| std::io::Error::other(e.to_string()))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, path)
}
