//! Feed fetching: retrieve candidate articles from configured sources.
//!
//! One invocation produces one finite batch. A failing source is logged and
//! skipped; it never aborts the other sources.

mod client;
mod parser;
mod scrape;
mod types;
mod util;

pub use client::create_http_client;
pub use types::FeedEntry;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use self::client::fetch_feed;
use self::parser::parse_feed;
use self::scrape::scrape_article;
use self::types::{MAX_RETRIES, RETRY_DELAY};
use self::util::{is_valid_url, try_decompressions};
use crate::config::Config;
use crate::db::Database;
use crate::db::UpsertOutcome;
use crate::error::PipelineError;
use crate::models::RawArticle;
use crate::TARGET_WEB_REQUEST;

/// Counters for one ingest pass over the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Fetch candidate articles from every configured source.
pub async fn fetch_sources(client: &reqwest::Client, config: &Config) -> Vec<RawArticle> {
    let mut articles = Vec::new();

    for source_url in &config.feed_urls {
        if source_url.trim().is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Skipping empty feed URL");
            continue;
        }

        if !is_valid_url(source_url) {
            debug!(target: TARGET_WEB_REQUEST, "Skipping invalid URL: {}", source_url);
            continue;
        }

        match fetch_source(client, source_url, config).await {
            Ok(mut found) => {
                if !found.is_empty() {
                    info!(target: TARGET_WEB_REQUEST, "Fetched {} candidate articles from {}", found.len(), source_url);
                }
                articles.append(&mut found);
            }
            Err(err) => {
                // Source isolation: log and move to the next feed.
                error!(target: TARGET_WEB_REQUEST, "Failed to process source {}: {}", source_url, err);
            }
        }
    }

    articles
}

/// Fetch and parse one source, with bounded retries, then resolve each
/// entry into a raw article.
async fn fetch_source(
    client: &reqwest::Client,
    source_url: &str,
    config: &Config,
) -> Result<Vec<RawArticle>, PipelineError> {
    let mut attempts = 0;

    let entries = loop {
        match fetch_and_parse(client, source_url, config).await {
            Ok(entries) => break entries,
            Err(err) => {
                attempts += 1;
                if attempts >= MAX_RETRIES {
                    return Err(err);
                }
                warn!(target: TARGET_WEB_REQUEST, "Retrying {} in {:?}: {}", source_url, RETRY_DELAY, err);
                sleep(RETRY_DELAY).await;
            }
        }
    };

    let mut articles = Vec::new();
    for entry in entries {
        if let Some(article) = resolve_entry(entry, source_url, config).await {
            articles.push(article);
        }
    }
    Ok(articles)
}

async fn fetch_and_parse(
    client: &reqwest::Client,
    source_url: &str,
    config: &Config,
) -> Result<Vec<FeedEntry>, PipelineError> {
    let payload = fetch_feed(client, source_url, config.request_timeout).await?;

    let decompressed = try_decompressions(
        &payload.bytes,
        payload.content_encoding.as_deref(),
        source_url,
    );

    let text = String::from_utf8(decompressed).map_err(|_| {
        PipelineError::Fetch(format!("failed to decode content as UTF-8 from {}", source_url))
    })?;

    parse_feed(&text, payload.content_type.as_deref(), source_url)
}

/// Turn a feed entry into a raw article: age filter, then scrape for the
/// body with the feed's own summary as fallback.
async fn resolve_entry(entry: FeedEntry, source_url: &str, config: &Config) -> Option<RawArticle> {
    if let Some(published_at) = entry.published_at {
        if Utc::now().signed_duration_since(published_at) > config.max_article_age {
            debug!(target: TARGET_WEB_REQUEST, "Skipping old article: {} ({})", entry.url, published_at);
            return None;
        }
    }

    if !is_valid_url(&entry.url) {
        debug!(target: TARGET_WEB_REQUEST, "Skipping entry with invalid URL: {}", entry.url);
        return None;
    }

    let content = match scrape_article(&entry.url, config.scrape_timeout).await {
        Some(text) => text,
        None => match &entry.summary {
            Some(summary) if !summary.trim().is_empty() => {
                debug!(target: TARGET_WEB_REQUEST, "Falling back to feed summary for {}", entry.url);
                summary.trim().to_string()
            }
            _ => {
                warn!(target: TARGET_WEB_REQUEST, "No usable content for {}, skipping", entry.url);
                return None;
            }
        },
    };

    Some(RawArticle {
        title: entry.title.unwrap_or_default(),
        content,
        url: entry.url,
        published_at: entry.published_at,
        source: Some(source_url.to_string()),
    })
}

/// Persist a fetched batch. Storage failures skip the item for this run and
/// leave it for the next fetch.
pub async fn ingest(db: &Database, articles: &[RawArticle]) -> IngestStats {
    let mut stats = IngestStats::default();

    for article in articles {
        match db.upsert_raw(article).await {
            Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
            Ok(UpsertOutcome::Updated) => stats.updated += 1,
            Ok(UpsertOutcome::Unchanged) => stats.unchanged += 1,
            Err(err) => {
                stats.failed += 1;
                error!(target: TARGET_WEB_REQUEST, "Failed to store article {}: {}", article.url, err);
            }
        }
    }

    info!(
        target: TARGET_WEB_REQUEST,
        "Ingest complete: {} inserted, {} updated, {} unchanged, {} failed",
        stats.inserted, stats.updated, stats.unchanged, stats.failed
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ingest_counts_outcomes() {
        let db = Database::in_memory().await.unwrap();
        let articles = vec![
            RawArticle::new("https://example.com/a", "A", "body a"),
            RawArticle::new("https://example.com/b", "B", "body b"),
            RawArticle::new("https://example.com/a", "A", "body a"),
            RawArticle::new("", "bad", "no url"),
        ];

        let stats = ingest(&db, &articles).await;
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(db.count_articles().await.unwrap(), 2);
    }
}
