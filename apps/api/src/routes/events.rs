use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::event::{Event, NewEvent};
use crate::models::tier::{Tier, TIER_LADDER};
use crate::presentation::{EventListView, ListingSession, TierInfo};
use crate::routes::auth::{AdminAuth, CurrentUser};
use crate::state::AppState;
use crate::store::DEFAULT_SAMPLE_LIMIT;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub signed_in: bool,
    #[serde(flatten)]
    pub view: EventListView,
}

#[derive(Deserialize)]
pub struct ListQuery {
    /// View the list as a lower tier would. Capped at the caller's own tier.
    pub tier: Option<String>,
}

/// GET /events
/// The event list for the caller's tier. Backend failures still answer 200
/// with `status: "error"` so clients can render the error state.
pub async fn list_events_handler(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<EventsResponse>, AppError> {
    let mut session = ListingSession::new(principal.tier);
    if let Some(requested) = params.tier.as_deref() {
        session.select_tier(Tier::from_claim(Some(requested)).min(principal.tier));
    }
    session.begin().map_err(anyhow::Error::from)?;

    let tier = session.tier();
    let result = state.store.list_for_tier(tier).await;
    if let Err(e) = &result {
        tracing::error!("Failed to list events for tier {tier}: {e}");
    }
    session.complete(result).map_err(anyhow::Error::from)?;
    tracing::debug!("Event list for tier {tier} finished as {:?}", session.status());

    Ok(Json(EventsResponse {
        signed_in: principal.is_signed_in(),
        view: session.view(),
    }))
}

#[derive(Deserialize)]
pub struct SampleQuery {
    pub limit: Option<usize>,
}

/// GET /events/sample
pub async fn sample_events_handler(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    params: Result<Query<SampleQuery>, QueryRejection>,
) -> Result<Json<Vec<Event>>, AppError> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;
    let limit = params.limit.unwrap_or(DEFAULT_SAMPLE_LIMIT);
    let events = state.store.sample_for_tier(principal.tier, limit).await?;
    Ok(Json(events))
}

/// POST /events
pub async fn create_event_handler(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Json(event): Json<NewEvent>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let created = state.store.create_event(event).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Serialize)]
pub struct TiersResponse {
    pub tier: Tier,
    pub tiers: Vec<TierInfo>,
}

/// GET /tiers
pub async fn tiers_handler(CurrentUser(principal): CurrentUser) -> Json<TiersResponse> {
    let tiers = TIER_LADDER
        .iter()
        .map(|t| TierInfo {
            tier: *t,
            label: t.label(),
            accessible: principal.tier.can_view(*t),
        })
        .collect();
    Json(TiersResponse {
        tier: principal.tier,
        tiers,
    })
}
