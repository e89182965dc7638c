use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: HTTP requests handled. Labels: route, status.
pub const REQUESTS_TOTAL: &str = "roombook_requests_total";

/// Histogram: HTTP request latency in seconds. Labels: route.
pub const REQUEST_DURATION_SECONDS: &str = "roombook_request_duration_seconds";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: reservations admitted.
pub const ADMISSIONS_TOTAL: &str = "roombook_admissions_total";

/// Counter: candidates rejected. Labels: rule.
pub const REJECTIONS_TOTAL: &str = "roombook_rejections_total";

/// Counter: reservations cancelled.
pub const CANCELLATIONS_TOTAL: &str = "roombook_cancellations_total";

/// Gauge: reservations currently stored.
pub const RESERVATIONS_ACTIVE: &str = "roombook_reservations_active";

/// Install Prometheus metrics exporter on the given address. No-op if `addr` is None.
pub fn init(addr: Option<SocketAddr>) -> Result<(), BuildError> {
    let Some(addr) = addr else { return Ok(()) };
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://{addr}/metrics");
    Ok(())
}

/// Collapse a request path into a bounded route label for metrics.
pub fn route_label(method: &str, path: &str) -> &'static str {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        ("POST", ["reservations"]) => "create_reservation",
        ("DELETE", ["reservations", _]) => "cancel_reservation",
        ("GET", ["rooms", _, "reservations"]) => "list_room_reservations",
        ("GET", ["health"]) => "health",
        _ => "other",
    }
}
