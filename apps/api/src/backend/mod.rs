//! Event Backend: the generic query interface to the remote `events` collection.
//!
//! Every read and write of event rows goes through [`EventBackend`]. The store
//! layer never talks to a concrete client. Implementations:
//! - [`rest::RestBackend`]: PostgREST-style HTTP API (hosted Supabase project).
//! - [`postgres::PgBackend`]: direct Postgres connection via sqlx.
//! - [`memory::MemoryBackend`]: in-process collection for demos and tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::event::{Event, NewEvent};
use crate::models::tier::Tier;

pub mod memory;
pub mod postgres;
pub mod rest;

/// Postgres SQLSTATE for `insufficient_privilege`, raised by row-level security.
pub const PG_INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend's access-control layer refused the query.
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("could not decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, BackendError::AccessDenied(_))
    }
}

/// A select against the events collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Restrict to these tiers. `None` selects every tier.
    pub tiers: Option<Vec<Tier>>,
    /// Order by `event_date` ascending.
    pub order_by_date: bool,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn all() -> Self {
        Self {
            tiers: None,
            order_by_date: true,
            limit: None,
        }
    }

    pub fn for_tiers(tiers: &[Tier]) -> Self {
        Self {
            tiers: Some(tiers.to_vec()),
            ..Self::all()
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Generic query client over the events collection.
///
/// `context` is the per-request access-control hint: the tier whose
/// visibility rules the backend should apply. `None` sends no hint.
#[async_trait]
pub trait EventBackend: Send + Sync {
    /// Short name for logs ("rest", "postgres", "memory").
    fn name(&self) -> &'static str;

    async fn select(
        &self,
        query: &EventQuery,
        context: Option<Tier>,
    ) -> Result<Vec<Event>, BackendError>;

    /// Inserts rows and returns them as stored.
    async fn insert(&self, rows: &[NewEvent]) -> Result<Vec<Event>, BackendError>;

    /// Deletes every row in the collection.
    async fn delete_all(&self) -> Result<(), BackendError>;

    async fn count(&self) -> Result<u64, BackendError>;
}
