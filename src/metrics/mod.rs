//! Prometheus metrics for the factory floor.
//!
//! Every collector lives in one registry so `/metrics` can export them with a
//! single gather. Services bump the counters through the small helpers at the
//! bottom of this module.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref STOCK_MOVEMENTS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "factory_stock_movements_total",
            "Stock ledger entries by transaction type"
        ),
        &["transaction_type"]
    )
    .expect("metric can be created");
    pub static ref STOCK_MOVEMENT_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "factory_stock_movement_failures_total",
            "Rejected stock ledger operations"
        ),
        &["transaction_type", "error_type"]
    )
    .expect("metric can be created");
    pub static ref RESERVATIONS_CREATED: IntCounter = IntCounter::new(
        "factory_reservations_total",
        "Total number of stock reservations created"
    )
    .expect("metric can be created");
    pub static ref RESERVATION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "factory_reservation_failures_total",
            "Total number of failed stock reservations"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
    pub static ref JOB_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "factory_job_transitions_total",
            "Production job status transitions by target status"
        ),
        &["to_status"]
    )
    .expect("metric can be created");
    pub static ref AUDIT_WRITE_FAILURES: IntCounter = IntCounter::new(
        "factory_audit_write_failures_total",
        "Audit entries that could not be persisted"
    )
    .expect("metric can be created");
    pub static ref NOTIFICATION_PUSHES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "factory_notification_pushes_total",
            "Outbound messaging pushes by outcome"
        ),
        &["outcome"]
    )
    .expect("metric can be created");
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry
            .register(Box::new(STOCK_MOVEMENTS.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(STOCK_MOVEMENT_FAILURES.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(RESERVATIONS_CREATED.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(RESERVATION_FAILURES.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(JOB_TRANSITIONS.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(AUDIT_WRITE_FAILURES.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(NOTIFICATION_PUSHES.clone()))
            .expect("collector can be registered");
        registry
    };
}

pub fn record_stock_movement(transaction_type: &str) {
    STOCK_MOVEMENTS.with_label_values(&[transaction_type]).inc();
}

pub fn record_stock_movement_failure(transaction_type: &str, error_type: &str) {
    STOCK_MOVEMENT_FAILURES
        .with_label_values(&[transaction_type, error_type])
        .inc();
}

pub fn record_reservation_created() {
    RESERVATIONS_CREATED.inc();
}

pub fn record_reservation_failure(error_type: &str) {
    RESERVATION_FAILURES.with_label_values(&[error_type]).inc();
}

pub fn record_job_transition(to_status: &str) {
    JOB_TRANSITIONS.with_label_values(&[to_status]).inc();
}

pub fn record_audit_failure() {
    AUDIT_WRITE_FAILURES.inc();
}

pub fn record_notification_push(outcome: &str) {
    NOTIFICATION_PUSHES.with_label_values(&[outcome]).inc();
}

/// Render every registered collector in the Prometheus text format.
pub fn export_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// `GET /metrics`
pub async fn metrics_handler() -> Response {
    match export_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to export metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_text_contains_recorded_counters() {
        record_stock_movement("IN");
        record_job_transition("printing");

        let text = export_metrics().unwrap();
        assert!(text.contains("factory_stock_movements_total"));
        assert!(text.contains("transaction_type=\"IN\""));
        assert!(text.contains("factory_job_transitions_total"));
    }
}
