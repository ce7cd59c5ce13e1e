//! Prometheus /metrics + health check HTTP endpoints
//!
//! Endpoints:
//!   GET /metrics  - Prometheus text format
//!   GET /healthz  - Liveness check (always 200 if process is running)

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus_client::{
    encoding::text::encode,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::Registry,
};
use std::time::Duration;

use crate::server::AppState;

type Labels = Vec<(String, String)>;

/// Counters and timings for encrypt/decrypt requests.
#[derive(Clone)]
pub struct OperationMetrics {
    operations: Family<Labels, Counter>,
    duration: Family<Labels, Histogram>,
}

impl OperationMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let operations = Family::default();
        let duration = Family::<Labels, Histogram>::new_with_constructor(|| {
            Histogram::new([0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
        });

        registry.register(
            "lockbox_operations",
            "Encrypt/decrypt requests by operation and status",
            operations.clone(),
        );
        registry.register(
            "lockbox_operation_duration_seconds",
            "Time spent in the codec per request",
            duration.clone(),
        );

        Self {
            operations,
            duration,
        }
    }

    pub fn record(&self, operation: &str, success: bool, elapsed: Duration) {
        let status = if success { "success" } else { "failure" };
        self.operations
            .get_or_create(&vec![
                ("operation".to_string(), operation.to_string()),
                ("status".to_string(), status.to_string()),
            ])
            .inc();
        self.duration
            .get_or_create(&vec![("operation".to_string(), operation.to_string())])
            .observe(elapsed.as_secs_f64());
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = String::new();
    match encode(&mut body, &state.registry) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::error!("metrics encode failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string(),
            )
        }
    }
}

/// Liveness check: returns 200 if the process is running.
pub async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_labelled_by_operation_and_status() {
        let mut registry = Registry::default();
        let metrics = OperationMetrics::new(&mut registry);

        metrics.record("encrypt", true, Duration::from_millis(20));
        metrics.record("decrypt", false, Duration::from_millis(5));
        metrics.record("decrypt", false, Duration::from_millis(5));

        let mut out = String::new();
        encode(&mut out, &registry).unwrap();

        let encrypt_ok = r#"lockbox_operations_total{operation="encrypt",status="success"} 1"#;
        let decrypt_failed = r#"lockbox_operations_total{operation="decrypt",status="failure"} 2"#;
        let decrypt_timed = r#"lockbox_operation_duration_seconds_count{operation="decrypt"} 2"#;
        assert!(out.contains(encrypt_ok));
        assert!(out.contains(decrypt_failed));
        assert!(out.contains(decrypt_timed));
    }
}
