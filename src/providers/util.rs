use crate::core::config::FetchSettings;
use crate::core::error::{FxError, Result};
use chrono::NaiveDate;
use reqwest::StatusCode;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `attempts`: Total number of runs, including the first one
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error of the last attempt
pub async fn with_retry<F, Fut, T, E>(mut operation: F, attempts: usize, delay_ms: u64) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt >= attempts {
                    return Err(err);
                }
                debug!("Attempt {}/{} failed: {}. Retrying...", attempt, attempts, err);
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

pub fn http_client(settings: &FetchSettings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("fxledger/1.0")
        .timeout(settings.timeout())
        .build()
        .map_err(|e| FxError::UpstreamError(format!("Failed to build HTTP client: {e}")))
}

/// GETs `url` and returns the body of a successful response.
///
/// Only transport failures are retried. Status codes map onto the error
/// taxonomy: 404 is an unavailable rate, 429 a rate limit, anything else
/// non-2xx an upstream failure.
pub async fn get_text(
    client: &reqwest::Client,
    url: &str,
    settings: &FetchSettings,
    pair: (&str, &str, NaiveDate),
) -> Result<String> {
    debug!("Requesting {}", url);
    let response = with_retry(
        || async { client.get(url).send().await },
        settings.retry_attempts,
        settings.retry_delay_ms,
    )
    .await
    .map_err(|e| FxError::UpstreamError(format!("Request to {url} failed: {e}")))?;

    let status = response.status();
    let (from, to, date) = pair;
    match status {
        s if s.is_success() => {}
        StatusCode::NOT_FOUND => {
            return Err(FxError::RateUnavailable {
                from: from.to_string(),
                to: to.to_string(),
                date,
            });
        }
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(FxError::RateLimited(format!("{url} answered {status}")));
        }
        _ => return Err(FxError::UpstreamError(format!("{url} answered {status}"))),
    }

    response
        .text()
        .await
        .map_err(|e| FxError::UpstreamError(format!("Failed to read body from {url}: {e}")))
}
