//! Seed catalog: the fixed set of sample events written by the seed operation.
//!
//! Demo fixture data. The compiled-in events are dated relative to the moment
//! they are seeded, so they always lie ahead. The catalog can be replaced at
//! startup with a JSON array of events (`SEED_FILE`).

use std::path::Path;

use chrono::{DateTime, Duration, SubsecRound, Timelike, Utc};
use thiserror::Error;

use crate::models::event::{EventValidationError, NewEvent};
use crate::models::tier::{Tier, TIER_LADDER};

/// Bump when the compiled-in catalog changes.
pub const SEED_CATALOG_VERSION: u32 = 3;

/// Every tier needs at least this many catalog events.
pub const MIN_EVENTS_PER_TIER: usize = 2;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("seed catalog is empty")]
    Empty,

    #[error("seed catalog has {count} {tier} event(s), needs at least {MIN_EVENTS_PER_TIER}")]
    TooFewForTier { tier: Tier, count: usize },

    #[error("seed event '{title}' is dated in the past ({event_date})")]
    PastDate {
        title: String,
        event_date: DateTime<Utc>,
    },

    #[error("seed event '{title}' is invalid: {source}")]
    InvalidEvent {
        title: String,
        #[source]
        source: EventValidationError,
    },

    #[error("could not read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Events written by `POST /seed`.
#[derive(Debug, Clone)]
pub enum SeedCatalog {
    /// Compiled-in sample events, re-dated on every seed.
    Builtin,
    /// Replacement events read from `SEED_FILE`, used as given.
    File(Vec<NewEvent>),
}

impl SeedCatalog {
    pub fn events(&self) -> Vec<NewEvent> {
        match self {
            SeedCatalog::Builtin => default_catalog(),
            SeedCatalog::File(events) => events.clone(),
        }
    }
}

struct SampleEvent {
    title: &'static str,
    description: &'static str,
    /// Whole days after the seed date.
    days_ahead: i64,
    /// Start hour (UTC) on that day.
    hour: i64,
    image_url: &'static str,
    tier: Tier,
}

const SAMPLE_EVENTS: [SampleEvent; 8] = [
    SampleEvent {
        title: "Community Meetup",
        description: "Join us for a casual community meetup where you can network with fellow enthusiasts and share your experiences.",
        days_ahead: 14,
        hour: 18,
        image_url: "https://images.unsplash.com/photo-1515187029135-18ee286d815b?w=400&h=225&fit=crop",
        tier: Tier::Free,
    },
    SampleEvent {
        title: "Introduction to Web Development",
        description: "Learn the basics of HTML, CSS, and JavaScript in this beginner-friendly workshop.",
        days_ahead: 19,
        hour: 14,
        image_url: "https://images.unsplash.com/photo-1461749280684-dccba630e2f6?w=400&h=225&fit=crop",
        tier: Tier::Free,
    },
    SampleEvent {
        title: "Advanced JavaScript Workshop",
        description: "Deep dive into modern JavaScript features including ES6+, async/await, and functional programming concepts.",
        days_ahead: 24,
        hour: 10,
        image_url: "https://images.unsplash.com/photo-1555066931-4365d14bab8c?w=400&h=225&fit=crop",
        tier: Tier::Silver,
    },
    SampleEvent {
        title: "React Fundamentals",
        description: "Master React basics including components, props, state, and hooks with hands-on exercises.",
        days_ahead: 31,
        hour: 15,
        image_url: "https://images.unsplash.com/photo-1633356122544-f134324a6cee?w=400&h=225&fit=crop",
        tier: Tier::Silver,
    },
    SampleEvent {
        title: "Full-Stack Development Bootcamp",
        description: "Comprehensive 3-day bootcamp covering frontend, backend, and database development with real-world projects.",
        days_ahead: 40,
        hour: 9,
        image_url: "https://images.unsplash.com/photo-1516321318423-f06f85e504b3?w=400&h=225&fit=crop",
        tier: Tier::Gold,
    },
    SampleEvent {
        title: "System Design Masterclass",
        description: "Learn to design scalable systems with expert guidance on architecture patterns and best practices.",
        days_ahead: 45,
        hour: 13,
        image_url: "https://images.unsplash.com/photo-1551288049-bebda4e38f71?w=400&h=225&fit=crop",
        tier: Tier::Gold,
    },
    SampleEvent {
        title: "AI/ML Innovation Summit",
        description: "Exclusive summit featuring industry leaders discussing the future of AI and machine learning technologies.",
        days_ahead: 50,
        hour: 8,
        image_url: "https://images.unsplash.com/photo-1677442136019-21780ecad995?w=400&h=225&fit=crop",
        tier: Tier::Platinum,
    },
    SampleEvent {
        title: "Tech Leadership Retreat",
        description: "Intimate 2-day retreat for tech leaders to discuss strategy, innovation, and industry trends.",
        days_ahead: 55,
        hour: 10,
        image_url: "https://images.unsplash.com/photo-1522202176988-66273c2fd55f?w=400&h=225&fit=crop",
        tier: Tier::Platinum,
    },
];

/// The compiled-in catalog dated from now: two events per tier.
pub fn default_catalog() -> Vec<NewEvent> {
    catalog_from(Utc::now())
}

fn catalog_from(now: DateTime<Utc>) -> Vec<NewEvent> {
    let midnight =
        now.trunc_subsecs(0) - Duration::seconds(i64::from(now.num_seconds_from_midnight()));
    SAMPLE_EVENTS
        .iter()
        .map(|s| NewEvent {
            title: s.title.to_string(),
            description: s.description.to_string(),
            event_date: midnight + Duration::days(s.days_ahead) + Duration::hours(s.hour),
            image_url: Some(s.image_url.to_string()),
            tier: s.tier,
        })
        .collect()
}

/// Loads a replacement catalog from a JSON array of events.
pub fn load_catalog(path: &Path) -> Result<Vec<NewEvent>, CatalogError> {
    let raw = std::fs::read_to_string(path)?;
    let events: Vec<NewEvent> = serde_json::from_str(&raw)?;
    validate_catalog(&events, Utc::now())?;
    Ok(events)
}

/// A usable catalog is non-empty, holds only valid events dated after `now`
/// and has at least [`MIN_EVENTS_PER_TIER`] events for every tier.
pub fn validate_catalog(events: &[NewEvent], now: DateTime<Utc>) -> Result<(), CatalogError> {
    if events.is_empty() {
        return Err(CatalogError::Empty);
    }
    for event in events {
        event.validate().map_err(|source| CatalogError::InvalidEvent {
            title: event.title.clone(),
            source,
        })?;
        if event.event_date <= now {
            return Err(CatalogError::PastDate {
                title: event.title.clone(),
                event_date: event.event_date,
            });
        }
    }
    for tier in TIER_LADDER {
        let count = events.iter().filter(|e| e.tier == tier).count();
        if count < MIN_EVENTS_PER_TIER {
            return Err(CatalogError::TooFewForTier { tier, count });
        }
    }
    Ok(())
}
