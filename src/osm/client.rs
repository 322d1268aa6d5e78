//! Upstream OSM API client.
//!
//! # Responsibilities
//! - Fetch a relation with its geometry elements (`relation/{id}/full`)
//! - Distinguish not-found, rate-limited, and transient failures
//! - Retry transient failures with exponential backoff + jitter
//!
//! # Design Decisions
//! - Not-found and decode failures are never retried
//! - Backoff is capped and jittered to avoid hammering the public API

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::osm::types::{Element, RelationBundle, RelationId};

/// Errors from the upstream map-data service.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The relation does not exist upstream.
    #[error("relation {0} not found upstream")]
    NotFound(RelationId),

    /// The upstream API throttled us.
    #[error("upstream rate limit hit")]
    RateLimited,

    /// The request timed out.
    #[error("upstream request timed out")]
    Timeout,

    /// Connection-level failure.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// Upstream answered with an unexpected status.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("could not decode upstream response: {0}")]
    Decode(String),

    /// The response did not contain the requested relation element.
    #[error("response for relation {0} did not contain the relation")]
    MissingRelation(RelationId),
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout | Self::Transport(_) => true,
            Self::Status(code) => *code >= 500,
            Self::NotFound(_) | Self::Decode(_) | Self::MissingRelation(_) => false,
        }
    }
}

/// The upstream collaborator seam: anything that can fetch a relation
/// by id. The production implementation is [`OsmClient`]; tests use an
/// in-memory graph.
pub trait RelationFetcher: Send + Sync {
    fn fetch_relation(
        &self,
        id: RelationId,
    ) -> impl Future<Output = Result<RelationBundle, FetchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct ElementDoc {
    #[serde(default)]
    elements: Vec<Element>,
}

/// Client for the OSM API v0.6.
#[derive(Debug, Clone)]
pub struct OsmClient {
    http: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    backoff_base_ms: u64,
    backoff_max_ms: u64,
}

impl OsmClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            backoff_base_ms: config.backoff_base_ms,
            backoff_max_ms: config.backoff_max_ms,
        })
    }

    async fn fetch_once(&self, id: RelationId) -> Result<RelationBundle, FetchError> {
        let url = format!("{}/api/0.6/relation/{}/full.json", self.endpoint, id);
        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(FetchError::NotFound(id));
        }
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let doc: ElementDoc = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        RelationBundle::from_elements(id, doc.elements)
    }
}

impl RelationFetcher for OsmClient {
    async fn fetch_relation(&self, id: RelationId) -> Result<RelationBundle, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(id).await {
                Ok(bundle) => return Ok(bundle),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay =
                        calculate_backoff(attempt, self.backoff_base_ms, self.backoff_max_ms);
                    tracing::info!(
                        relation = %id,
                        attempt,
                        delay = ?delay,
                        error = %err,
                        "Retrying upstream fetch"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
