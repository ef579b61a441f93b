use std::sync::Arc;

use crate::config::Config;
use crate::store::seed::SeedCatalog;
use crate::store::EventStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: EventStore,
    /// Events written by `POST /seed`.
    pub seed_catalog: Arc<SeedCatalog>,
    pub config: Config,
}
