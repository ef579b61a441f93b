use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::errors::AppError;
use crate::models::user::Principal;
use crate::state::AppState;

/// The caller, resolved from identity headers. Never rejects: a request
/// without identity is an anonymous `Free` principal.
pub struct CurrentUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(Principal::from_headers(&parts.headers)))
    }
}

/// Guards administrative routes with the configured bearer token.
/// With no `ADMIN_TOKEN` configured every caller passes.
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if authorize(state.config.admin_token.as_deref(), &parts.headers) {
            Ok(AdminAuth)
        } else {
            tracing::warn!("Rejected admin request to {}", parts.uri.path());
            Err(AppError::Unauthorized)
        }
    }
}

fn authorize(admin_token: Option<&str>, headers: &HeaderMap) -> bool {
    match admin_token {
        Some(expected) => extract_bearer(headers).is_some_and(|token| token == expected),
        None => true,
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
