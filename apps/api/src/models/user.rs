use axum::http::HeaderMap;
use serde::Serialize;

use crate::models::tier::Tier;

/// Header carrying the signed-in user's id, forwarded by the identity provider.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the `tier` value from the user's profile metadata.
pub const USER_TIER_HEADER: &str = "x-user-tier";

/// The caller as seen by this service. Identity is owned upstream; this is a
/// read-only view of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: Option<String>,
    pub tier: Tier,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            tier: Tier::Free,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }

    /// Signed-out requests are always `Free`, whatever tier header they carry.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let user_id = header_str(headers, USER_ID_HEADER).map(str::to_string);
        let Some(user_id) = user_id else {
            return Self::anonymous();
        };
        Self {
            tier: Tier::from_claim(header_str(headers, USER_TIER_HEADER)),
            user_id: Some(user_id),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
