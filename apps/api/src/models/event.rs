use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use crate::models::tier::{Tier, UnknownTier};

/// Shown in place of a missing event image.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/400x225?text=Event+Image";

/// A stored event. The tier is always one of the known tiers; rows that
/// carry anything else never become an `Event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub image_url: Option<String>,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn image_or_placeholder(&self) -> &str {
        match self.image_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => PLACEHOLDER_IMAGE_URL,
        }
    }
}

/// Insert payload: an event before the backend has assigned `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub tier: Tier,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("image_url must be an http(s) URL, got '{0}'")]
    BadImageUrl(String),
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.title.trim().is_empty() {
            return Err(EventValidationError::EmptyTitle);
        }
        if let Some(url) = &self.image_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(EventValidationError::BadImageUrl(url.clone()));
            }
        }
        Ok(())
    }
}

/// Raw row as the backend returns it, before the tier has been checked.
#[derive(Debug, Clone, Deserialize, FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub tier: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventRow> for Event {
    type Error = UnknownTier;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            tier: row.tier.parse()?,
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            event_date: row.event_date,
            image_url: row.image_url,
            created_at: row.created_at,
        })
    }
}

/// Converts backend rows into events, dropping rows with an unrecognised tier.
pub fn events_from_rows(rows: Vec<EventRow>) -> Vec<Event> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match Event::try_from(row) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Dropping event {id}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Ascending by scheduled date, ties broken by id so repeated listings agree.
pub fn sort_by_schedule(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.event_date
            .cmp(&b.event_date)
            .then_with(|| a.id.cmp(&b.id))
    });
}
