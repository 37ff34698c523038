use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: suggestion queries answered. Labels: outcome (`found`, `empty`).
pub const SUGGESTIONS_TOTAL: &str = "deskslot_suggestions_total";

/// Histogram: time spent ranking candidates, in seconds.
pub const RANK_DURATION_SECONDS: &str = "deskslot_rank_duration_seconds";

/// Counter: conflict checks. Labels: outcome (`clear`, `conflicted`).
pub const CONFLICT_CHECKS_TOTAL: &str = "deskslot_conflict_checks_total";

/// Counter: bookings committed.
pub const BOOKINGS_CREATED_TOTAL: &str = "deskslot_bookings_created_total";

/// Counter: bookings cancelled.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "deskslot_bookings_cancelled_total";

// ── Errors ──────────────────────────────────────────────────────

/// Counter: data service failures. Labels: op.
pub const UPSTREAM_FAILURES_TOTAL: &str = "deskslot_upstream_failures_total";

/// Counter: rejected requests. Labels: kind.
pub const REJECTED_TOTAL: &str = "deskslot_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
