//! Article body extraction.

use readability::extractor;
use tokio::task;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

use super::types::{MAX_RETRIES, RETRY_DELAY};
use crate::TARGET_WEB_REQUEST;

/// Scrape the readable body text of an article page, with bounded retries.
///
/// The extractor is blocking (it drives its own HTTP request), so it runs
/// on the blocking pool with the timeout applied outside. Returns None when
/// every attempt fails; the caller decides on a fallback.
pub async fn scrape_article(url: &str, scrape_timeout: Duration) -> Option<String> {
    for attempt in 0..MAX_RETRIES {
        let target = url.to_string();
        let scrape = task::spawn_blocking(move || extractor::scrape(&target));

        match timeout(scrape_timeout, scrape).await {
            Ok(Ok(Ok(product))) => {
                debug!(target: TARGET_WEB_REQUEST, "Scraped article body from {}", url);
                let text = product.text.trim().to_string();
                if text.is_empty() {
                    warn!(target: TARGET_WEB_REQUEST, "Scrape of {} produced no text", url);
                    return None;
                }
                return Some(text);
            }
            Ok(Ok(Err(e))) => {
                warn!(target: TARGET_WEB_REQUEST, "Error extracting page {}: {}", url, e);
            }
            Ok(Err(join_err)) => {
                warn!(target: TARGET_WEB_REQUEST, "Scrape task for {} failed: {}", url, join_err);
            }
            Err(_) => {
                warn!(target: TARGET_WEB_REQUEST, "Scrape of {} timed out", url);
            }
        }

        if attempt < MAX_RETRIES - 1 {
            debug!(target: TARGET_WEB_REQUEST, "Retrying scrape of {} ({}/{})", url, attempt + 1, MAX_RETRIES);
            sleep(RETRY_DELAY).await;
        }
    }

    None
}
