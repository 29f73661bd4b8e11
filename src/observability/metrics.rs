//! Metrics collection and exposition.
//!
//! # Metrics
//! - `html2pdf_conversions_total` (counter): finished conversions by outcome
//! - `html2pdf_conversion_duration_seconds` (histogram): render + write latency
//! - `html2pdf_upload_bytes` (histogram): accepted upload sizes
//! - `html2pdf_renders_in_flight` (gauge): engine instances alive
//! - `html2pdf_reaped_files_total` (counter): retained inputs deleted by the reaper
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter is optional and bound to its own address

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished conversion attempt.
pub fn record_conversion(outcome: &'static str, start: Instant) {
    counter!("html2pdf_conversions_total", "outcome" => outcome).increment(1);
    histogram!("html2pdf_conversion_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upload_size(bytes: u64) {
    histogram!("html2pdf_upload_bytes").record(bytes as f64);
}

pub fn render_started() {
    gauge!("html2pdf_renders_in_flight").increment(1.0);
}

pub fn render_finished() {
    gauge!("html2pdf_renders_in_flight").decrement(1.0);
}

pub fn record_reaped(count: usize) {
    counter!("html2pdf_reaped_files_total").increment(count as u64);
}
