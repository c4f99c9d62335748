//! Bounded exponential back-off for provider HTTP calls.
//!
//! A request is attempted once plus up to [`BackoffPolicy::max_retries`] more
//! times. Only errors whose [`RetryPolicy`] is `Retryable` (HTTP 429 and 5xx)
//! are retried; everything else surfaces on the first attempt. The delay before
//! retry `n` (zero-based) is `min(base_delay * 2^n, max_delay)`, with no jitter.

use std::future::Future;
use std::time::Duration;

use pipeline::{truncate_error_body, GenerationError, ProviderKind, RetryPolicy};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Retry budget and delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each later retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(8_000),
        }
    }
}

impl BackoffPolicy {
    /// Default schedule with a different retry budget.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Runs `operation` until it succeeds, fails non-retryably, or the retry
/// budget is spent. The closure receives the zero-based attempt number.
///
/// After the budget is exhausted the last error is returned unchanged.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &BackoffPolicy,
    mut operation: F,
) -> Result<T, GenerationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err)
                if err.retry_policy() == RetryPolicy::Retryable && attempt < policy.max_retries =>
            {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient provider error; backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ---------------------------------------------------------------------------

/// A `reqwest` client paired with a [`BackoffPolicy`].
///
/// Shared by the Anthropic and OpenAI generators; each call is one logical
/// request retried on the policy's schedule.
#[derive(Debug, Clone)]
pub struct RetryingClient {
    http: reqwest::Client,
    policy: BackoffPolicy,
}

impl RetryingClient {
    pub fn new(http: reqwest::Client, policy: BackoffPolicy) -> Self {
        Self { http, policy }
    }

    /// POSTs `body` as JSON and decodes a 2xx response as `R`.
    pub async fn post_json<B, R>(
        &self,
        provider: ProviderKind,
        url: &str,
        headers: HeaderMap,
        body: &B,
    ) -> Result<R, GenerationError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        retry_with_backoff(&self.policy, |attempt| {
            let request = self.http.post(url).headers(headers.clone()).json(body);
            async move {
                debug!(%provider, attempt, url, "Sending provider request");
                let response = request
                    .send()
                    .await
                    .map_err(|e| GenerationError::Transport {
                        provider,
                        message: e.to_string(),
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    return Err(GenerationError::Http {
                        provider,
                        status: status.as_u16(),
                        body: truncate_error_body(&text),
                    });
                }

                response
                    .json::<R>()
                    .await
                    .map_err(|e| GenerationError::InvalidResponse {
                        provider,
                        message: e.to_string(),
                    })
            }
        })
        .await
    }
}
