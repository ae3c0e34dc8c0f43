//! Metric names shared across mmrag crates.
//!
//! Call sites use the re-exported `metrics` macros with the constants below so
//! names stay consistent. Without an installed recorder every call is a no-op.

pub use metrics::{counter, histogram};

/// Label keys.
pub mod labels {
    pub const COLLECTION: &str = "collection";
    pub const QUERY_KIND: &str = "query_kind";
    pub const MODEL: &str = "model";
    pub const OUTCOME: &str = "outcome";
}

/// Schema management.
pub mod schema {
    pub const COLLECTIONS_CREATED_TOTAL: &str = "mmrag_collections_created_total";
    pub const COLLECTION_CREATE_FAILURES_TOTAL: &str = "mmrag_collection_create_failures_total";
}

/// Batch import.
pub mod import {
    pub const OBJECTS_IMPORTED_TOTAL: &str = "mmrag_objects_imported_total";
    pub const OBJECTS_SKIPPED_TOTAL: &str = "mmrag_objects_skipped_total";
    pub const OBJECTS_DEGRADED_TOTAL: &str = "mmrag_objects_degraded_total";
    pub const BATCH_FLUSH_DURATION_SECONDS: &str = "mmrag_batch_flush_duration_seconds";
}

/// Similarity search.
pub mod search {
    pub const QUERIES_TOTAL: &str = "mmrag_search_queries_total";
    pub const RESULTS_RETURNED: &str = "mmrag_search_results_returned";
}

/// Answer generation.
pub mod generation {
    pub const REQUESTS_TOTAL: &str = "mmrag_generation_requests_total";
    pub const DURATION_SECONDS: &str = "mmrag_generation_duration_seconds";
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install metrics recorder: {0}")]
    Install(String),
}

/// Install a Prometheus exporter serving `/metrics` on `addr`.
///
/// Must run inside a tokio runtime.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(addr: std::net::SocketAddr) -> Result<(), MetricsError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
