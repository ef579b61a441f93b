use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /livez
/// Process liveness; does not touch the backend.
pub async fn liveness_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME")
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHealth {
    pub success: bool,
    pub event_count: u64,
    pub has_data: bool,
    pub error: Option<String>,
}

/// GET /health
/// Connection test against the events backend: row count only, no records.
pub async fn connection_health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<ConnectionHealth>) {
    let report = state.store.health_check().await;
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ConnectionHealth {
        success: report.success,
        event_count: report.event_count,
        has_data: report.has_data(),
        error: report.error,
    };
    (status, Json(body))
}
