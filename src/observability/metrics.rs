//! Metrics collection and exposition.
//!
//! # Metrics
//! - `forge_http_requests_total` (counter): requests by method, route, status
//! - `forge_http_request_duration_seconds` (histogram): handler latency
//! - `forge_tasks_submitted_total` (counter): accepted submissions by cloud type
//! - `forge_tasks_finished_total` (counter): terminal writes by cloud type, status
//! - `forge_provision_duration_seconds` (histogram): driver call duration
//! - `forge_workers_running` (gauge): unreaped worker handles
//!
//! Without an installed recorder every call here is a no-op.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn describe() {
    metrics::describe_counter!("forge_http_requests_total", "HTTP requests handled");
    metrics::describe_histogram!(
        "forge_http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP handler latency"
    );
    metrics::describe_counter!("forge_tasks_submitted_total", "Provisioning tasks accepted");
    metrics::describe_counter!("forge_tasks_finished_total", "Provisioning tasks that reached a terminal state");
    metrics::describe_histogram!(
        "forge_provision_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent inside provider drivers"
    );
    metrics::describe_gauge!("forge_workers_running", "Provisioning workers not yet reaped");
}

/// Axum middleware recording request count and latency.
pub async fn track_http(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "forge_http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "forge_http_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(start.elapsed().as_secs_f64());

    response
}

pub fn record_task_submitted(cloud_type: &str) {
    metrics::counter!("forge_tasks_submitted_total", "cloud_type" => cloud_type.to_string()).increment(1);
}

pub fn record_task_finished(cloud_type: &str, status: &'static str) {
    metrics::counter!(
        "forge_tasks_finished_total",
        "cloud_type" => cloud_type.to_string(),
        "status" => status
    )
    .increment(1);
}

pub fn record_provision_duration(cloud_type: &str, started: Instant) {
    metrics::histogram!("forge_provision_duration_seconds", "cloud_type" => cloud_type.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn set_workers_running(count: usize) {
    metrics::gauge!("forge_workers_running").set(count as f64);
}
