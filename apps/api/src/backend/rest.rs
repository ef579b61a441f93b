//! REST backend: PostgREST-style HTTP API in front of the hosted events table.
//!
//! The access-control context travels as the `x-user-tier` request header.
//! PostgREST exposes request headers to row-level policies through
//! `current_setting('request.headers')`, so policies can scope rows per tier.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::backend::{BackendError, EventBackend, EventQuery, PG_INSUFFICIENT_PRIVILEGE};
use crate::models::event::{events_from_rows, Event, EventRow, NewEvent};
use crate::models::tier::Tier;
use crate::models::user::USER_TIER_HEADER;

const TABLE: &str = "events";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: table_endpoint(base_url),
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method) -> RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Sends the request built by `build`, retrying 5xx and connection
    /// failures with exponential backoff. Only use for idempotent requests.
    async fn send_idempotent<F>(&self, build: F) -> Result<Response, BackendError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error: Option<BackendError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 250ms, 500ms
                let delay = Duration::from_millis(250 * (1 << (attempt - 1)));
                warn!(
                    "Backend request attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match build().send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(BackendError::Transport(e.to_string()));
                    continue;
                }
            };

            if response.status().is_server_error() {
                last_error = Some(error_from_response(response).await);
                continue;
            }

            return check_status(response).await;
        }

        Err(last_error.unwrap_or_else(|| BackendError::Transport("no attempts made".into())))
    }
}

#[async_trait]
impl EventBackend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn select(
        &self,
        query: &EventQuery,
        context: Option<Tier>,
    ) -> Result<Vec<Event>, BackendError> {
        let params = select_params(query);
        debug!("REST select on {TABLE}: {params:?} (context: {context:?})");

        let response = self
            .send_idempotent(|| {
                let mut req = self.request(reqwest::Method::GET).query(&params);
                if let Some(tier) = context {
                    req = req.header(USER_TIER_HEADER, tier.as_str());
                }
                req
            })
            .await?;

        let rows: Vec<EventRow> = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(events_from_rows(rows))
    }

    async fn insert(&self, rows: &[NewEvent]) -> Result<Vec<Event>, BackendError> {
        debug!("REST insert of {} row(s) into {TABLE}", rows.len());

        let response = self
            .request(reqwest::Method::POST)
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        let inserted: Vec<EventRow> = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(events_from_rows(inserted))
    }

    async fn delete_all(&self) -> Result<(), BackendError> {
        debug!("REST delete of all rows in {TABLE}");
        // PostgREST refuses unfiltered deletes; `id IS NOT NULL` matches every row.
        self.send_idempotent(|| {
            self.request(reqwest::Method::DELETE)
                .query(&[("id", "not.is.null")])
        })
        .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, BackendError> {
        let response = self
            .send_idempotent(|| {
                self.request(reqwest::Method::HEAD)
                    .query(&[("select", "id")])
                    .header("Prefer", "count=exact")
            })
            .await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BackendError::Decode("missing Content-Range header".into()))?;
        parse_content_range(range)
            .ok_or_else(|| BackendError::Decode(format!("bad Content-Range '{range}'")))
    }
}

fn table_endpoint(base_url: &str) -> String {
    format!("{}/rest/v1/{TABLE}", base_url.trim_end_matches('/'))
}

fn select_params(query: &EventQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", "*".to_string())];
    if let Some(tiers) = &query.tiers {
        let list = tiers.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(",");
        params.push(("tier", format!("in.({list})")));
    }
    if query.order_by_date {
        params.push(("order", "event_date.asc".to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

/// Total from a `Content-Range` header: `0-9/42` or `*/0`.
fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    classify_error(status, &body)
}

fn classify_error(status: StatusCode, body: &str) -> BackendError {
    let parsed = serde_json::from_str::<PostgrestError>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| body.to_string());
    let code = parsed.and_then(|e| e.code);

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || code.as_deref() == Some(PG_INSUFFICIENT_PRIVILEGE)
    {
        return BackendError::AccessDenied(message);
    }
    BackendError::Api {
        status: status.as_u16(),
        message,
    }
}
