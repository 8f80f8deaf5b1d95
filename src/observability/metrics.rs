//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_admitted_total` (counter)
//! - `gate_requests_rejected_total` (counter): by `reason`
//! - `gate_requests_blocked_total` (counter): admissions that had to wait
//! - `gate_block_wait_seconds` (histogram): time spent waiting for a slot
//! - `gate_concurrent_requests` (gauge): requests counted in the gate
//! - `gate_http_requests_total` (counter): by method, status
//! - `gate_http_request_duration_seconds` (histogram)
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter is optional and owns its own listener

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics exporter started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_admitted() {
    counter!("gate_requests_admitted_total").increment(1);
}

pub fn record_rejected(reason: &'static str) {
    counter!("gate_requests_rejected_total", "reason" => reason).increment(1);
}

pub fn record_blocked() {
    counter!("gate_requests_blocked_total").increment(1);
}

pub fn record_block_wait(waited: Duration) {
    histogram!("gate_block_wait_seconds").record(waited.as_secs_f64());
}

pub fn set_concurrent_requests(current: usize) {
    gauge!("gate_concurrent_requests").set(current as f64);
}

/// Record a completed HTTP request.
pub fn record_request(method: &str, status: u16, started: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("gate_http_requests_total", &labels).increment(1);
    histogram!("gate_http_request_duration_seconds", &labels)
        .record(started.elapsed().as_secs_f64());
}


#[cfg(test)]
mod tests {
    use super::capture::CapturingRecorder;
    use super::*;

    #[test]
    fn request_metrics_carry_method_and_status() {
        let recorder = CapturingRecorder::default();
        ::metrics::with_local_recorder(&recorder, || {
            record_request("GET", 503, Instant::now());
            record_request("GET", 200, Instant::now());
            record_request("POST", 200, Instant::now());
        });

        assert_eq!(recorder.counter_total("gate_http_requests_total", ("status", "503")), 1);
        assert_eq!(recorder.counter_total("gate_http_requests_total", ("status", "200")), 2);
        assert_eq!(recorder.counter_total("gate_http_requests_total", ("method", "POST")), 1);
    }

    #[test]
    fn concurrency_gauge_reports_last_value() {
        let recorder = CapturingRecorder::default();
        ::metrics::with_local_recorder(&recorder, || {
            set_concurrent_requests(3);
            set_concurrent_requests(0);
        });
        assert_eq!(recorder.last_gauge("gate_concurrent_requests"), Some(0.0));
    }
}
