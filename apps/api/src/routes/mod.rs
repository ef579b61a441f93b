pub mod auth;
pub mod events;
pub mod health;
pub mod seed;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/livez", get(health::liveness_handler))
        .route("/health", get(health::connection_health_handler))
        .route("/seed", post(seed::seed_handler))
        .route(
            "/events",
            get(events::list_events_handler).post(events::create_event_handler),
        )
        .route("/events/sample", get(events::sample_events_handler))
        .route("/tiers", get(events::tiers_handler))
        .with_state(state)
}
