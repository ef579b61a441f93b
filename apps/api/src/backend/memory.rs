use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::{BackendError, EventBackend, EventQuery};
use crate::models::event::{sort_by_schedule, Event, NewEvent};
use crate::models::tier::{filter_visible, Tier};

/// In-process events collection.
///
/// With `row_policies` on, a select that carries a context only sees rows that
/// context may view, the way row-level security would filter on the server.
pub struct MemoryBackend {
    rows: RwLock<Vec<Event>>,
    #[cfg(test)]
    faults: RwLock<fault::FaultPlan>,
    row_policies: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            #[cfg(test)]
            faults: RwLock::new(fault::FaultPlan::default()),
            row_policies: true,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub use fault::FaultPlan;


#[cfg(not(test))]
impl MemoryBackend {
    async fn select_fault(&self, _: &EventQuery, _: Option<Tier>) -> Result<(), BackendError> {
        Ok(())
    }

    async fn insert_fault(&self, _: &[NewEvent]) -> Result<(), BackendError> {
        Ok(())
    }

    async fn delete_fault(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn count_fault(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[async_trait]
impl EventBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn select(
        &self,
        query: &EventQuery,
        context: Option<Tier>,
    ) -> Result<Vec<Event>, BackendError> {
        self.select_fault(query, context).await?;

        let mut rows: Vec<Event> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|e| query.tiers.as_ref().map_or(true, |t| t.contains(&e.tier)))
            .cloned()
            .collect();

        if let (true, Some(tier)) = (self.row_policies, context) {
            rows = filter_visible(rows, tier, |e| e.tier);
        }
        if query.order_by_date {
            sort_by_schedule(&mut rows);
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, rows: &[NewEvent]) -> Result<Vec<Event>, BackendError> {
        self.insert_fault(rows).await?;

        let now = Utc::now();
        let inserted: Vec<Event> = rows
            .iter()
            .map(|r| Event {
                id: Uuid::new_v4().to_string(),
                title: r.title.clone(),
                description: r.description.clone(),
                event_date: r.event_date,
                image_url: r.image_url.clone(),
                tier: r.tier,
                created_at: Some(now),
            })
            .collect();

        self.rows.write().await.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn delete_all(&self) -> Result<(), BackendError> {
        self.delete_fault().await?;
        self.rows.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<u64, BackendError> {
        self.count_fault().await?;
        Ok(self.rows.read().await.len() as u64)
    }
}
