//! Presentation: the event list view served to clients.
//!
//! No business rules live here: tiers come from [`crate::models::tier`] and
//! events from [`crate::store::EventStore`]. This module only shapes them for
//! display and tracks the load status.

use serde::Serialize;
use thiserror::Error;

use crate::models::event::Event;
use crate::models::tier::{access_summary, visible_tiers, Tier};
use crate::store::{FilteringMode, Listing, StoreError};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load events";
pub const EMPTY_MESSAGE: &str = "No events available for your tier.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot go from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: LoadStatus,
    pub to: LoadStatus,
}

/// Load state for one tier's event list: `idle → loading → {success, error}`.
/// Changing the tier starts over from `idle`.
#[derive(Debug, Clone)]
pub struct ListingSession {
    tier: Tier,
    status: LoadStatus,
    outcome: Option<Result<Listing, String>>,
}

impl ListingSession {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            status: LoadStatus::Idle,
            outcome: None,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    /// Switches to `tier`. Returns whether anything changed; a change drops
    /// the previous result and returns to `idle`.
    pub fn select_tier(&mut self, tier: Tier) -> bool {
        if tier == self.tier {
            return false;
        }
        *self = Self::new(tier);
        true
    }

    pub fn begin(&mut self) -> Result<(), InvalidTransition> {
        self.transition(LoadStatus::Idle, LoadStatus::Loading)?;
        Ok(())
    }

    /// Records the store's answer. Errors are logged by the caller; the view
    /// only ever shows [`LOAD_FAILED_MESSAGE`].
    pub fn complete(&mut self, result: Result<Listing, StoreError>) -> Result<(), InvalidTransition> {
        let to = if result.is_ok() {
            LoadStatus::Success
        } else {
            LoadStatus::Error
        };
        self.transition(LoadStatus::Loading, to)?;
        self.outcome = Some(result.map_err(|e| e.to_string()));
        Ok(())
    }

    fn transition(&mut self, expected: LoadStatus, to: LoadStatus) -> Result<(), InvalidTransition> {
        if self.status != expected {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn view(&self) -> EventListView {
        let (events, mode) = match &self.outcome {
            Some(Ok(listing)) => (
                listing.events.iter().map(EventCard::from).collect::<Vec<_>>(),
                Some(listing.mode),
            ),
            _ => (Vec::new(), None),
        };
        let error = matches!(self.outcome, Some(Err(_))).then(|| LOAD_FAILED_MESSAGE.to_string());
        let empty_message = (self.status == LoadStatus::Success && events.is_empty())
            .then(|| EMPTY_MESSAGE.to_string());

        EventListView {
            tier: self.tier,
            tier_label: self.tier.label(),
            accessible_tiers: visible_tiers(self.tier).to_vec(),
            access_summary: access_summary(self.tier),
            status: self.status,
            filtering: mode,
            events,
            error,
            empty_message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListView {
    pub tier: Tier,
    pub tier_label: &'static str,
    pub accessible_tiers: Vec<Tier>,
    pub access_summary: String,
    pub status: LoadStatus,
    pub filtering: Option<FilteringMode>,
    pub events: Vec<EventCard>,
    pub error: Option<String>,
    pub empty_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tier: Tier,
    pub tier_label: &'static str,
    pub event_date: chrono::DateTime<chrono::Utc>,
    /// `YYYY-MM-DD` in UTC.
    pub display_date: String,
    pub image_url: String,
}

impl From<&Event> for EventCard {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            tier: event.tier,
            tier_label: event.tier.label(),
            event_date: event.event_date,
            display_date: event.event_date.format("%Y-%m-%d").to_string(),
            image_url: event.image_or_placeholder().to_string(),
        }
    }
}

/// One rung of the tier ladder, as shown in the tier overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierInfo {
    pub tier: Tier,
    pub label: &'static str,
    pub accessible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::models::event::PLACEHOLDER_IMAGE_URL;
    use chrono::{TimeZone, Utc};

    fn event(tier: Tier) -> Event {
        Event {
            id: "e1".into(),
            title: "Meetup".into(),
            description: "Talks".into(),
            event_date: Utc.with_ymd_and_hms(2027, 1, 15, 18, 0, 0).unwrap(),
            image_url: None,
            tier,
            created_at: None,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut session = ListingSession::new(Tier::Silver);
        assert_eq!(session.status(), LoadStatus::Idle);
        session.begin().unwrap();
        assert_eq!(session.status(), LoadStatus::Loading);
        session
            .complete(Ok(Listing {
                events: vec![event(Tier::Free)],
                mode: FilteringMode::Server,
            }))
            .unwrap();

        let view = session.view();
        assert_eq!(view.status, LoadStatus::Success);
        assert_eq!(view.access_summary, "Free + Silver");
        assert_eq!(view.accessible_tiers, vec![Tier::Free, Tier::Silver]);
        assert_eq!(view.events.len(), 1);
        assert_eq!(view.events[0].display_date, "2027-01-15");
        assert_eq!(view.events[0].image_url, PLACEHOLDER_IMAGE_URL);
        assert!(view.error.is_none());
        assert!(view.empty_message.is_none());
    }

    #[test]
    fn test_error_outcome() {
        let mut session = ListingSession::new(Tier::Gold);
        session.begin().unwrap();
        session
            .complete(Err(StoreError::Backend(BackendError::Transport("down".into()))))
            .unwrap();
        let view = session.view();
        assert_eq!(view.status, LoadStatus::Error);
        assert_eq!(view.error.as_deref(), Some(LOAD_FAILED_MESSAGE));
        assert!(view.events.is_empty());
        assert!(view.empty_message.is_none());
    }

    #[test]
    fn test_empty_success_shows_empty_message() {
        let mut session = ListingSession::new(Tier::Free);
        session.begin().unwrap();
        session
            .complete(Ok(Listing {
                events: vec![],
                mode: FilteringMode::ClientFallback,
            }))
            .unwrap();
        let view = session.view();
        assert_eq!(view.empty_message.as_deref(), Some(EMPTY_MESSAGE));
        assert_eq!(view.filtering, Some(FilteringMode::ClientFallback));
    }

    #[test]
    fn test_out_of_order_transitions_are_rejected() {
        let mut session = ListingSession::new(Tier::Free);
        let err = session
            .complete(Ok(Listing {
                events: vec![],
                mode: FilteringMode::Server,
            }))
            .unwrap_err();
        assert_eq!(err.from, LoadStatus::Idle);

        session.begin().unwrap();
        assert!(session.begin().is_err());
    }

    #[test]
    fn test_tier_change_resets_to_idle() {
        let mut session = ListingSession::new(Tier::Free);
        session.begin().unwrap();
        assert!(!session.select_tier(Tier::Free));
        assert_eq!(session.status(), LoadStatus::Loading);

        assert!(session.select_tier(Tier::Platinum));
        assert_eq!(session.status(), LoadStatus::Idle);
        assert_eq!(session.tier(), Tier::Platinum);
        assert_eq!(session.view().accessible_tiers.len(), 4);
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let view = ListingSession::new(Tier::Gold).view();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["tierLabel"], "Gold");
        assert_eq!(json["status"], "idle");
        assert_eq!(json["accessibleTiers"][2], "gold");
    }
}
