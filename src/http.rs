//! Shared outbound HTTP plumbing for provider clients
//!
//! One pooled client with optional transient-retry middleware, status-code
//! classification, and URL redaction so API keys never reach the logs.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Response;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, warn};

use crate::config::HttpConfig;
use crate::error::{DineScoutError, ErrorCode};

static KEY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&]key=)[^&]*").expect("valid key pattern"));

const SLOW_RESPONSE: Duration = Duration::from_secs(5);
const ERROR_BODY_LIMIT: usize = 300;

/// Build the pooled client every provider shares
pub fn build_client(config: &HttpConfig) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(concat!("DineScout/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Hide the value of any `key=` query parameter
pub fn redact(url: &str) -> String {
    KEY_PARAM.replace_all(url, "${1}***").into_owned()
}

/// GET a URL and classify the response status
pub async fn get(client: &ClientWithMiddleware, service: &str, url: &str) -> Result<Response> {
    send(client.get(url), service, url).await
}

/// POST a JSON body and classify the response status
pub async fn post_json<B: Serialize>(
    client: &ClientWithMiddleware,
    service: &str,
    url: &str,
    body: &B,
) -> Result<Response> {
    let payload = serde_json::to_vec(body).context("Failed to serialize request body")?;
    let request = client
        .post(url)
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(payload);
    send(request, service, url).await
}

/// Read a successful response body as JSON
pub async fn read_json<T: DeserializeOwned>(response: Response, service: &str) -> Result<T> {
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read {service} response body"))?;
    serde_json::from_str(&body).map_err(|e| {
        error!("Failed to parse {} response: {}", service, e);
        debug!("Unparseable {} body: {}", service, truncate(&body, ERROR_BODY_LIMIT));
        DineScoutError::api(
            format!("Invalid response from {service}: {e}"),
            ErrorCode::ApiInvalidResponse,
        )
        .into()
    })
}

async fn send(request: RequestBuilder, service: &str, url: &str) -> Result<Response> {
    let redacted = redact(url);
    debug!("{} request: {}", service, redacted);
    let start = Instant::now();

    let response = request.send().await.map_err(|e| {
        warn!("Network error calling {}: {}", service, e);
        DineScoutError::api(
            format!("Network error calling {service}: {e}"),
            ErrorCode::ApiNetworkError,
        )
    })?;

    let elapsed = start.elapsed();
    let status = response.status();
    debug!("{} responded {} in {:.3}s", service, status, elapsed.as_secs_f64());
    if elapsed > SLOW_RESPONSE {
        warn!("Slow {} response: {:.3}s", service, elapsed.as_secs_f64());
    }

    if status.is_success() {
        return Ok(response);
    }

    let code = match status.as_u16() {
        401 | 403 => ErrorCode::ApiUnauthorized,
        404 => ErrorCode::ApiNotFound,
        429 => ErrorCode::ApiRateLimit,
        _ => ErrorCode::ApiNetworkError,
    };
    let body = response.text().await.unwrap_or_default();
    warn!("{} returned {} for {}", service, status, redacted);

    Err(DineScoutError::api(
        format!(
            "{service} request failed with status {status}: {}",
            truncate(body.trim(), ERROR_BODY_LIMIT)
        ),
        code,
    )
    .into())
}

/// Truncate to at most `max_bytes` on a character boundary
pub fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_key() {
        let url = "https://maps.googleapis.com/maps/api/geocode/json?address=MG%20Road&key=AIzaSecret";
        assert_eq!(
            redact(url),
            "https://maps.googleapis.com/maps/api/geocode/json?address=MG%20Road&key=***"
        );
    }

    #[test]
    fn test_redact_key_first_param() {
        let url = "https://example.com/models/m:generateContent?key=abc123&alt=json";
        assert_eq!(
            redact(url),
            "https://example.com/models/m:generateContent?key=***&alt=json"
        );
    }

    #[test]
    fn test_redact_leaves_other_params() {
        let url = "https://example.com/search?monkey=1&query=pizza";
        assert_eq!(redact(url), url);
    }

    #[test]
    fn test_truncate_char_boundary() {
        let text = "Hello 世界";
        let cut = truncate(text, 8);
        assert!(cut.len() <= 8);
        assert!(text.starts_with(cut));
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn test_build_client() {
        let config = HttpConfig {
            timeout_seconds: 5,
            max_retries: 2,
        };
        assert!(build_client(&config).is_ok());
    }
}
