//! Postgres backend: talks to the events table over a direct sqlx connection.
//!
//! The access-control context is applied per transaction as the
//! `app.user_tier` setting, which row-level policies can read with
//! `current_setting('app.user_tier', true)`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::backend::{BackendError, EventBackend, EventQuery, PG_INSUFFICIENT_PRIVILEGE};
use crate::models::event::{events_from_rows, Event, EventRow, NewEvent};
use crate::models::tier::Tier;

const EVENT_COLUMNS: &str =
    "id::text AS id, title, description, event_date, image_url, tier, created_at";

#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(PG_INSUFFICIENT_PRIVILEGE) => {
                BackendError::AccessDenied(db.message().to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                BackendError::Transport(e.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                BackendError::Decode(e.to_string())
            }
            _ => BackendError::Database(e.to_string()),
        }
    }
}

fn build_select(query: &EventQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events"));
    if let Some(tiers) = &query.tiers {
        let names: Vec<String> = tiers.iter().map(|t| t.as_str().to_string()).collect();
        qb.push(" WHERE tier = ANY(").push_bind(names).push(")");
    }
    if query.order_by_date {
        qb.push(" ORDER BY event_date ASC");
    }
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ").push_bind(limit as i64);
    }
    qb
}

#[async_trait]
impl EventBackend for PgBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn select(
        &self,
        query: &EventQuery,
        context: Option<Tier>,
    ) -> Result<Vec<Event>, BackendError> {
        let mut tx = self.pool.begin().await?;
        if let Some(tier) = context {
            sqlx::query("SELECT set_config('app.user_tier', $1, true)")
                .bind(tier.as_str())
                .execute(&mut *tx)
                .await?;
        }

        let mut qb = build_select(query);
        debug!("Postgres select: {}", qb.sql());
        let rows: Vec<EventRow> = qb.build_query_as().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        Ok(events_from_rows(rows))
    }

    /// All rows go in one transaction: either every row is stored or none is.
    async fn insert(&self, rows: &[NewEvent]) -> Result<Vec<Event>, BackendError> {
        let sql = format!(
            r#"
            INSERT INTO events (title, description, event_date, image_url, tier)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {EVENT_COLUMNS}
            "#
        );
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(rows.len());

        for row in rows {
            let stored: EventRow = sqlx::query_as(&sql)
                .bind(&row.title)
                .bind(&row.description)
                .bind(row.event_date)
                .bind(&row.image_url)
                .bind(row.tier.as_str())
                .fetch_one(&mut *tx)
                .await?;
            inserted.push(stored);
        }

        tx.commit().await?;
        Ok(events_from_rows(inserted))
    }

    async fn delete_all(&self) -> Result<(), BackendError> {
        let result = sqlx::query("DELETE FROM events").execute(&self.pool).await?;
        debug!("Deleted {} event row(s)", result.rows_affected());
        Ok(())
    }

    async fn count(&self) -> Result<u64, BackendError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_select_unfiltered() {
        let qb = build_select(&EventQuery::all());
        assert_eq!(
            qb.sql(),
            format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY event_date ASC")
        );
    }

    #[test]
    fn test_build_select_with_tiers_and_limit() {
        let qb = build_select(&EventQuery::for_tiers(&[Tier::Free, Tier::Silver]).with_limit(Some(3)));
        assert_eq!(
            qb.sql(),
            format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE tier = ANY($1) ORDER BY event_date ASC LIMIT $2"
            )
        );
    }
}
