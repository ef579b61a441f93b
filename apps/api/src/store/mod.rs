//! Event Store: list, seed, health-check and create operations over an
//! [`EventBackend`].
//!
//! The caller's tier is an explicit argument on every read; nothing here
//! remembers a "current tier" between calls.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, EventBackend, EventQuery};
use crate::models::event::{sort_by_schedule, Event, EventValidationError, NewEvent};
use crate::models::tier::{filter_visible, visible_tiers, Tier};

pub mod seed;

/// Default and maximum sizes for the diagnostics sample.
pub const DEFAULT_SAMPLE_LIMIT: usize = 5;
pub const MAX_SAMPLE_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to clear existing events: {0}")]
    ClearFailed(#[source] BackendError),

    #[error("failed to insert any events ({error_count} failed)")]
    NothingSeeded {
        error_count: usize,
        last_error: Option<String>,
    },

    #[error("invalid event: {0}")]
    Invalid(#[from] EventValidationError),
}

/// Which path produced a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilteringMode {
    /// Unrestricted select accepted under the caller's access context.
    Server,
    /// Select with an explicit tier filter.
    ServerFiltered,
    /// Context-free select, filtered here.
    ClientFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub events: Vec<Event>,
    pub mode: FilteringMode,
}

#[derive(Debug, Clone)]
pub struct SeedReport {
    pub success_count: usize,
    pub error_count: usize,
    /// Rows in the collection after seeding.
    pub total_count: u64,
    /// Whether the existing rows were cleared first.
    pub cleared: bool,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub success: bool,
    pub event_count: u64,
    pub error: Option<String>,
}

impl HealthReport {
    pub fn has_data(&self) -> bool {
        self.event_count > 0
    }
}

#[derive(Clone)]
pub struct EventStore {
    backend: Arc<dyn EventBackend>,
}

impl EventStore {
    pub fn new(backend: Arc<dyn EventBackend>) -> Self {
        Self { backend }
    }

    /// Events visible to `tier`, ascending by scheduled date.
    ///
    /// Access-denied answers walk down the fallback chain: unrestricted select
    /// under the tier's context, then an explicit tier filter, then a
    /// context-free select filtered locally. Any other error is returned.
    pub async fn list_for_tier(&self, tier: Tier) -> Result<Listing, StoreError> {
        self.fetch_visible(tier, None).await
    }

    /// Up to `limit` events visible to `tier`, for diagnostics.
    pub async fn sample_for_tier(&self, tier: Tier, limit: usize) -> Result<Vec<Event>, StoreError> {
        let limit = limit.clamp(1, MAX_SAMPLE_LIMIT);
        Ok(self.fetch_visible(tier, Some(limit)).await?.events)
    }

    async fn fetch_visible(&self, tier: Tier, limit: Option<usize>) -> Result<Listing, StoreError> {
        let allowed = visible_tiers(tier);

        let (events, mode) = match self.backend.select(&EventQuery::all(), Some(tier)).await {
            Ok(events) => (events, FilteringMode::Server),
            Err(e) if e.is_access_denied() => {
                warn!("Unrestricted select denied for tier {tier}: {e}; retrying with tier filter");
                // Only this query is exact on the server, so only it can carry the limit.
                let filtered = EventQuery::for_tiers(allowed).with_limit(limit);
                match self.backend.select(&filtered, Some(tier)).await {
                    Ok(events) => (events, FilteringMode::ServerFiltered),
                    Err(e) if e.is_access_denied() => {
                        warn!("Filtered select denied for tier {tier}: {e}; filtering locally");
                        let events = self.backend.select(&EventQuery::all(), None).await?;
                        (events, FilteringMode::ClientFallback)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let fetched = events.len();
        let mut events = filter_visible(events, tier, |e| e.tier);
        sort_by_schedule(&mut events);
        if let Some(limit) = limit {
            events.truncate(limit);
        }
        debug!(
            "Listed {} of {fetched} fetched event(s) for tier {tier} via {mode:?}",
            events.len()
        );

        Ok(Listing { events, mode })
    }

    /// Replaces the collection with `catalog`.
    ///
    /// Rows go in one at a time so a rejected row does not abort the rest.
    /// Clearing and inserting are separate calls: a failure in between leaves
    /// the collection empty.
    pub async fn seed(&self, catalog: &[NewEvent]) -> Result<SeedReport, StoreError> {
        info!(
            "Seeding {} event(s) through the {} backend",
            catalog.len(),
            self.backend.name()
        );

        let cleared = match self.backend.delete_all().await {
            Ok(()) => true,
            Err(e) if e.is_access_denied() => {
                warn!("Could not clear existing events ({e}), continuing with inserts");
                false
            }
            Err(e) => return Err(StoreError::ClearFailed(e)),
        };

        let mut inserted = Vec::with_capacity(catalog.len());
        let mut error_count = 0;
        let mut last_error = None;

        for event in catalog {
            match self.backend.insert(std::slice::from_ref(event)).await {
                Ok(rows) => {
                    debug!("Inserted event \"{}\"", event.title);
                    inserted.extend(rows);
                }
                Err(e) => {
                    warn!("Error inserting event \"{}\": {e}", event.title);
                    error_count += 1;
                    last_error = Some(e.to_string());
                }
            }
        }

        let success_count = catalog.len() - error_count;
        info!("Seeding completed: {success_count} successful, {error_count} failed");

        if success_count == 0 {
            return Err(StoreError::NothingSeeded {
                error_count,
                last_error,
            });
        }

        let total_count = match self.backend.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Could not read event count after seeding: {e}");
                success_count as u64
            }
        };

        Ok(SeedReport {
            success_count,
            error_count,
            total_count,
            cleared,
            events: inserted,
        })
    }

    /// Counts rows without returning any of them.
    pub async fn health_check(&self) -> HealthReport {
        match self.backend.count().await {
            Ok(event_count) => HealthReport {
                success: true,
                event_count,
                error: None,
            },
            Err(e) => {
                warn!("Health check against {} backend failed: {e}", self.backend.name());
                HealthReport {
                    success: false,
                    event_count: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Administrative insert of a single event.
    pub async fn create_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        event.validate()?;
        let mut rows = self.backend.insert(std::slice::from_ref(&event)).await?;
        let created = rows
            .pop()
            .ok_or_else(|| BackendError::Decode("insert returned no row".to_string()))?;
        info!("Created {} event \"{}\" ({})", created.tier, created.title, created.id);
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{FaultPlan, MemoryBackend};
    use crate::models::tier::TIER_LADDER;
    use crate::store::seed::default_catalog;

    fn store_with(backend: MemoryBackend) -> (EventStore, Arc<MemoryBackend>) {
        let backend = Arc::new(backend);
        (EventStore::new(backend.clone()), backend)
    }

    async fn seeded(backend: MemoryBackend) -> (EventStore, Arc<MemoryBackend>) {
        let (store, backend) = store_with(backend);
        store.seed(&default_catalog()).await.unwrap();
        (store, backend)
    }

    fn titles(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_only_returns_visible_tiers() {
        let (store, _) = seeded(MemoryBackend::new()).await;
        for tier in TIER_LADDER {
            let listing = store.list_for_tier(tier).await.unwrap();
            assert_eq!(listing.mode, FilteringMode::Server);
            assert_eq!(listing.events.len(), 2 * (tier.rank() + 1));
            assert!(listing.events.iter().all(|e| e.tier <= tier));
        }
    }

    #[tokio::test]
    async fn test_list_filters_even_without_server_policies() {
        let (store, _) = seeded(MemoryBackend::new().without_row_policies()).await;
        let listing = store.list_for_tier(Tier::Silver).await.unwrap();
        assert_eq!(listing.events.len(), 4);
        assert!(listing.events.iter().all(|e| e.tier <= Tier::Silver));
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_stable() {
        let (store, _) = seeded(MemoryBackend::new()).await;
        let first = store.list_for_tier(Tier::Platinum).await.unwrap();
        let second = store.list_for_tier(Tier::Platinum).await.unwrap();
        assert_eq!(first, second);
        assert!(first
            .events
            .windows(2)
            .all(|w| w[0].event_date <= w[1].event_date));
    }

    #[tokio::test]
    async fn test_list_falls_back_to_tier_filter() {
        let (store, backend) = seeded(MemoryBackend::new().without_row_policies()).await;
        backend
            .set_faults(FaultPlan {
                deny_unrestricted: true,
                ..FaultPlan::default()
            })
            .await;

        let listing = store.list_for_tier(Tier::Gold).await.unwrap();
        assert_eq!(listing.mode, FilteringMode::ServerFiltered);
        assert_eq!(listing.events.len(), 6);
        assert!(listing.events.iter().all(|e| e.tier <= Tier::Gold));
    }

    #[tokio::test]
    async fn test_list_falls_back_to_client_filtering() {
        let (store, backend) = seeded(MemoryBackend::new()).await;
        backend
            .set_faults(FaultPlan {
                deny_unrestricted: true,
                deny_filtered: true,
                ..FaultPlan::default()
            })
            .await;

        let listing = store.list_for_tier(Tier::Free).await.unwrap();
        assert_eq!(listing.mode, FilteringMode::ClientFallback);
        assert_eq!(
            titles(&listing.events),
            vec!["Community Meetup", "Introduction to Web Development"]
        );
    }

    #[tokio::test]
    async fn test_list_errors_when_every_path_is_denied() {
        let (store, backend) = seeded(MemoryBackend::new()).await;
        backend
            .set_faults(FaultPlan {
                deny_unrestricted: true,
                deny_filtered: true,
                deny_anonymous: true,
                ..FaultPlan::default()
            })
            .await;

        let err = store.list_for_tier(Tier::Gold).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(BackendError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_list_propagates_transport_errors_without_fallback() {
        let (store, backend) = seeded(MemoryBackend::new()).await;
        backend
            .set_faults(FaultPlan {
                fail_selects: true,
                ..FaultPlan::default()
            })
            .await;

        let err = store.list_for_tier(Tier::Gold).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(BackendError::Transport(_))));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent_in_content() {
        let catalog = default_catalog();
        let (store, backend) = store_with(MemoryBackend::new());

        let first = store.seed(&catalog).await.unwrap();
        let second = store.seed(&catalog).await.unwrap();

        assert_eq!(first.success_count, 8);
        assert_eq!(second.total_count, catalog.len() as u64);
        assert!(second.cleared);

        let rows = backend.snapshot().await;
        let mut stored: Vec<_> = rows.iter().map(|e| e.title.clone()).collect();
        let mut expected: Vec<_> = catalog.iter().map(|e| e.title.clone()).collect();
        stored.sort();
        expected.sort();
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn test_seed_reports_partial_failure() {
        let catalog = default_catalog();
        let failing = catalog.iter().take(3).map(|e| e.title.clone()).collect();
        let (store, _) = store_with(MemoryBackend::with_faults(FaultPlan {
            fail_insert_titles: failing,
            ..FaultPlan::default()
        }));

        let report = store.seed(&catalog).await.unwrap();
        assert_eq!(report.success_count, 5);
        assert_eq!(report.error_count, 3);
        assert_eq!(report.total_count, 5);
        assert_eq!(report.events.len(), 5);
    }

    #[tokio::test]
    async fn test_seed_with_zero_successes_fails() {
        let (store, _) = store_with(MemoryBackend::with_faults(FaultPlan {
            fail_inserts: true,
            ..FaultPlan::default()
        }));

        match store.seed(&default_catalog()).await {
            Err(StoreError::NothingSeeded {
                error_count,
                last_error,
            }) => {
                assert_eq!(error_count, 8);
                assert!(last_error.is_some());
            }
            other => panic!("expected NothingSeeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_between_clear_and_insert_leaves_collection_empty() {
        let (store, backend) = seeded(MemoryBackend::new()).await;
        assert_eq!(backend.count().await.unwrap(), 8);

        backend
            .set_faults(FaultPlan {
                fail_inserts: true,
                ..FaultPlan::default()
            })
            .await;
        assert!(store.seed(&default_catalog()).await.is_err());
        assert_eq!(backend.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_seed_continues_when_clear_is_denied() {
        let (store, backend) = seeded(MemoryBackend::new()).await;
        backend
            .set_faults(FaultPlan {
                deny_delete: true,
                ..FaultPlan::default()
            })
            .await;

        let report = store.seed(&default_catalog()).await.unwrap();
        assert!(!report.cleared);
        assert_eq!(report.total_count, 16);
    }

    #[tokio::test]
    async fn test_seed_aborts_when_clear_fails() {
        let (store, backend) = store_with(MemoryBackend::with_faults(FaultPlan {
            fail_delete: true,
            ..FaultPlan::default()
        }));

        let err = store.seed(&default_catalog()).await.unwrap_err();
        assert!(matches!(err, StoreError::ClearFailed(_)));
        assert_eq!(backend.snapshot().await.len(), 0);
    }

    #[tokio::test]
    async fn test_health_check_on_empty_collection() {
        let (store, _) = store_with(MemoryBackend::new());
        let report = store.health_check().await;
        assert_eq!(
            report,
            HealthReport {
                success: true,
                event_count: 0,
                error: None
            }
        );
        assert!(!report.has_data());
    }

    #[tokio::test]
    async fn test_health_check_reports_failure() {
        let (store, _) = store_with(MemoryBackend::with_faults(FaultPlan {
            fail_count: true,
            ..FaultPlan::default()
        }));
        let report = store.health_check().await;
        assert!(!report.success);
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn test_sample_is_limited_and_tier_scoped() {
        let (store, _) = seeded(MemoryBackend::new()).await;
        let sample = store.sample_for_tier(Tier::Platinum, 3).await.unwrap();
        assert_eq!(sample.len(), 3);

        let free = store.sample_for_tier(Tier::Free, 10).await.unwrap();
        assert_eq!(free.len(), 2);
    }

    #[tokio::test]
    async fn test_create_event_validates_and_inserts() {
        let (store, backend) = store_with(MemoryBackend::new());
        let mut event = default_catalog().remove(0);

        let created = store.create_event(event.clone()).await.unwrap();
        assert_eq!(created.title, event.title);
        assert_eq!(backend.count().await.unwrap(), 1);

        event.title = String::new();
        assert!(matches!(
            store.create_event(event).await,
            Err(StoreError::Invalid(EventValidationError::EmptyTitle))
        ));
    }
}
