// Game-history fetching: one upstream page per request, retried, fanned out
// over a user's aliases and the configured page numbers.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use showstand_core::config::{Config, FetchConfig};
use showstand_core::record::{GameRecord, UserHistory};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),
}

// ---------------------------------------------------------------------------
// HistorySource
// ---------------------------------------------------------------------------

/// Single-attempt access to one page of a user's game history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_page(&self, user: &str, page: u32) -> Result<Vec<GameRecord>, FetchError>;
}

/// Response body of the game-history endpoint.
#[derive(Debug, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    game_history: Option<Vec<GameRecord>>,
}

/// HTTP client for the upstream game-history endpoint.
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: String,
    platform: String,
}

impl ApiClient {
    /// Build a client whose requests are bounded by `fetch.timeout_secs`.
    pub fn from_config(fetch: &FetchConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(fetch.timeout()).build()?;
        Ok(Self {
            http,
            endpoint: fetch.endpoint.clone(),
            platform: fetch.platform.clone(),
        })
    }
}

#[async_trait]
impl HistorySource for ApiClient {
    async fn fetch_page(&self, user: &str, page: u32) -> Result<Vec<GameRecord>, FetchError> {
        let page_param = page.to_string();
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("username", user),
                ("platform", self.platform.as_str()),
                ("page", page_param.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: Option<HistoryPage> = resp.json().await?;
        Ok(body.and_then(|b| b.game_history).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// HistoryFetcher
// ---------------------------------------------------------------------------

/// Retry policy and page fan-out over a [`HistorySource`].
pub struct HistoryFetcher<S> {
    source: S,
    pages: Vec<u32>,
    attempts: u32,
    retry_delay: Duration,
    concurrency: usize,
}

impl<S: HistorySource> HistoryFetcher<S> {
    pub fn new(source: S, fetch: &FetchConfig) -> Self {
        Self {
            source,
            pages: fetch.pages.clone(),
            attempts: fetch.attempts.max(1),
            retry_delay: fetch.retry_delay(),
            concurrency: fetch.concurrency.max(1),
        }
    }

    /// One page for `user`. Failed attempts are retried after a fixed delay;
    /// once attempts run out the page is treated as empty and a warning is
    /// logged.
    pub async fn fetch_page(&self, user: &str, page: u32) -> Vec<GameRecord> {
        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match self.source.fetch_page(user, page).await {
                Ok(records) => {
                    debug!(user, page, count = records.len(), "fetched page");
                    return records;
                }
                Err(e) => {
                    debug!(user, page, attempt, error = %e, "page fetch failed");
                    last_error = Some(e);
                }
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        let error = last_error.map(|e| e.to_string()).unwrap_or_default();
        warn!(user, page, attempts = self.attempts, %error, "no data for page");
        Vec::new()
    }

    /// Every configured page for each handle in order, concatenated.
    /// Duplicates are expected and left for the dedup passes.
    pub async fn fetch_all_for_user(&self, handles: &[String]) -> Vec<GameRecord> {
        let mut records = Vec::new();
        for handle in handles {
            for &page in &self.pages {
                records.extend(self.fetch_page(handle, page).await);
            }
        }
        records
    }

    /// Histories for the whole roster. Up to `concurrency` users are fetched
    /// at once; the result is in roster order.
    pub async fn fetch_league(&self, config: &Config) -> Vec<UserHistory> {
        info!(
            users = config.league.roster.len(),
            concurrency = self.concurrency,
            "fetching league histories"
        );
        stream::iter(&config.league.roster)
            .map(|entry| async move {
                let handles = config.fetch_handles(&entry.user);
                UserHistory {
                    entry: entry.clone(),
                    records: self.fetch_all_for_user(&handles).await,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
