//! Client for the subscription service: the system of record for whether a
//! user is subscribed and which Discord account they linked.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::{AuthorityConfig, RetryPolicy};
use crate::error::{Result, SyncError};
use crate::types::SubscriptionRecord;

const STATUS_PATH: &str = "/api/user-subscription-status";

#[async_trait]
pub trait SubscriptionAuthority: Send + Sync {
    /// Read the current subscription status for `external_user_id`.
    async fn fetch_status(&self, external_user_id: &str) -> Result<SubscriptionRecord>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default)]
    discord_id: Option<String>,
    is_subscribed: bool,
}

/// Outcome of a single failed attempt.
enum AttemptError {
    /// Worth another try, optionally after a server-requested delay.
    Retryable(String, Option<Duration>),
    Fatal(SyncError),
}

// ---------------------------------------------------------------------------
// HttpAuthority
// ---------------------------------------------------------------------------

pub struct HttpAuthority {
    client: reqwest::Client,
    status_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl HttpAuthority {
    pub fn new(config: &AuthorityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            status_url: format!("{}{STATUS_PATH}", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            retry: config.retry.clone(),
        })
    }

    async fn fetch_once(
        &self,
        external_user_id: &str,
    ) -> std::result::Result<SubscriptionRecord, AttemptError> {
        let resp = self
            .client
            .get(&self.status_url)
            .query(&[("userId", external_user_id)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(format!("request failed: {e}"), None))?;

        let status = resp.status();
        if !status.is_success() {
            let msg = format!("subscription service returned {status}");
            return Err(if is_retryable(status) {
                AttemptError::Retryable(msg, retry_after(resp.headers()))
            } else {
                AttemptError::Fatal(SyncError::UpstreamUnavailable(msg))
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| {
                AttemptError::Retryable(format!("failed to read response body: {e}"), None)
            })?;
        let parsed: StatusResponse = serde_json::from_str(&body)
            .map_err(|e| AttemptError::Fatal(SyncError::MalformedResponse(e.to_string())))?;

        Ok(SubscriptionRecord::new(
            external_user_id,
            parsed.discord_id,
            parsed.is_subscribed,
        ))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Parse a `Retry-After` header given in (possibly fractional) seconds.
/// HTTP-date values are ignored.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

#[async_trait]
impl SubscriptionAuthority for HttpAuthority {
    async fn fetch_status(&self, external_user_id: &str) -> Result<SubscriptionRecord> {
        if external_user_id.trim().is_empty() {
            return Err(SyncError::InvalidInput("user id must not be empty".into()));
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let (last_error, hint) = match self.fetch_once(external_user_id).await {
                Ok(record) => {
                    tracing::debug!(
                        user_id = external_user_id,
                        linked = record.platform_user_id.is_some(),
                        subscribed = record.is_subscribed,
                        "fetched subscription status"
                    );
                    return Ok(record);
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(msg, hint)) => (msg, hint),
            };

            if attempt >= max_attempts {
                return Err(if max_attempts == 1 {
                    SyncError::UpstreamUnavailable(last_error)
                } else {
                    SyncError::UpstreamExhausted {
                        attempts: attempt,
                        last_error,
                    }
                });
            }

            let delay = self.retry.delay_for(attempt, hint);
            tracing::warn!(
                user_id = external_user_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "subscription service read failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
