//! HTTP client creation and request handling for feed sources.

use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::error::PipelineError;
use crate::TARGET_WEB_REQUEST;

/// Raw payload of one feed request, before decompression and parsing.
pub struct FeedPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
}

/// Create the shared HTTP client for feed requests.
pub fn create_http_client() -> Result<reqwest::Client, PipelineError> {
    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(|e| PipelineError::Fetch(format!("failed to build HTTP client: {}", e)))
}

/// Fetch one feed URL with a bounded timeout. A hang, transport error, or
/// non-success status is a `Fetch` error for the caller to count against
/// this source's retries.
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    request_timeout: Duration,
) -> Result<FeedPayload, PipelineError> {
    debug!(target: TARGET_WEB_REQUEST, "Requesting feed from {}", url);

    let response = match timeout(
        request_timeout,
        client
            .get(url)
            .header(header::USER_AGENT, "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .header(header::ACCEPT, "application/feed+json, application/json, application/rss+xml, application/atom+xml, application/xml, text/xml, */*;q=0.9")
            .header(header::ACCEPT_ENCODING, "gzip, deflate, br")
            .send(),
    )
    .await
    {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            return Err(PipelineError::Fetch(format!("request to {} failed: {}", url, err)));
        }
        Err(_) => {
            return Err(PipelineError::Fetch(format!(
                "request to {} timed out after {}s",
                url,
                request_timeout.as_secs()
            )));
        }
    };

    if !response.status().is_success() {
        return Err(PipelineError::Fetch(format!(
            "non-success status {} from {}",
            response.status(),
            url
        )));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|s| s.to_lowercase());

    let content_encoding = response
        .headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_lowercase());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PipelineError::Fetch(format!("failed to read response bytes from {}: {}", url, e)))?;

    Ok(FeedPayload {
        bytes: bytes.to_vec(),
        content_type,
        content_encoding,
    })
}
