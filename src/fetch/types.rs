//! Type definitions for the fetch module.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::time::Duration;

/// A single feed entry before the article body is scraped.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub url: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// JSON feed structure for parsing
#[derive(Debug, Deserialize)]
pub struct JsonFeed {
    #[serde(default)]
    pub items: Vec<JsonFeedItem>,
}

/// JSON feed item structure
#[derive(Debug, Deserialize)]
pub struct JsonFeedItem {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub content_text: Option<String>,
    pub date_published: Option<String>,
}

// Constants
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
pub const MAX_RETRIES: usize = 3;
