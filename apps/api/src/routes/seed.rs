use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::models::event::Event;
use crate::routes::auth::AdminAuth;
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResponse {
    pub success: bool,
    pub message: String,
    pub events_count: usize,
    pub total_count: u64,
    pub error_count: usize,
    /// False when the backend refused to clear the previous rows.
    pub cleared: bool,
    pub events: Vec<Event>,
}

/// POST /seed
/// Replaces the events collection with the seed catalog. Partial insert
/// failures are reported as counts; only zero successes is a failure.
pub async fn seed_handler(_admin: AdminAuth, State(state): State<AppState>) -> Response {
    match state.store.seed(&state.seed_catalog.events()).await {
        Ok(report) => Json(SeedResponse {
            success: true,
            message: format!(
                "Database seeded successfully with {} events",
                report.success_count
            ),
            events_count: report.success_count,
            total_count: report.total_count,
            error_count: report.error_count,
            cleared: report.cleared,
            events: report.events,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Seeding failed: {e}");
            seed_failure(e).into_response()
        }
    }
}

fn seed_failure(e: StoreError) -> (StatusCode, Json<serde_json::Value>) {
    let body = match e {
        StoreError::NothingSeeded {
            error_count,
            last_error,
        } => json!({
            "error": "Failed to insert any events",
            "details": last_error.unwrap_or_else(|| "All insertions failed".to_string()),
            "successCount": 0,
            "errorCount": error_count,
        }),
        StoreError::ClearFailed(source) => json!({
            "error": "Failed to clear existing events",
            "details": source.to_string(),
        }),
        other => json!({
            "error": "Internal server error",
            "details": other.to_string(),
        }),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
}
