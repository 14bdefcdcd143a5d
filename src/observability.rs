use std::net::SocketAddr;
use std::time::Instant;

use crate::engine::EngineError;
use crate::source::SourceKind;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total engine queries. Labels: operation, status.
pub const QUERIES_TOTAL: &str = "fleetplan_queries_total";

/// Histogram: query latency in seconds. Labels: operation.
pub const QUERY_DURATION_SECONDS: &str = "fleetplan_query_duration_seconds";

// ── Upstream collaborators ──────────────────────────────────────

/// Histogram: latency of one source fetch in seconds. Labels: source.
pub const SOURCE_FETCH_DURATION_SECONDS: &str = "fleetplan_source_fetch_duration_seconds";

/// Counter: failed or timed-out source calls. Labels: source.
pub const UPSTREAM_FAILURES_TOTAL: &str = "fleetplan_upstream_failures_total";

// ── Domain ──────────────────────────────────────────────────────

/// Counter: preparation windows created already violated by the next booking.
pub const LATE_PREPARATIONS_TOTAL: &str = "fleetplan_late_preparations_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Record outcome and latency of one engine operation.
pub fn record_query<T>(operation: &'static str, started: Instant, result: &Result<T, EngineError>) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.label(),
    };
    metrics::counter!(QUERIES_TOTAL, "operation" => operation, "status" => status).increment(1);
    metrics::histogram!(QUERY_DURATION_SECONDS, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_fetch(source: SourceKind, started: Instant, ok: bool) {
    metrics::histogram!(SOURCE_FETCH_DURATION_SECONDS, "source" => source.as_str())
        .record(started.elapsed().as_secs_f64());
    if !ok {
        metrics::counter!(UPSTREAM_FAILURES_TOTAL, "source" => source.as_str()).increment(1);
    }
}
