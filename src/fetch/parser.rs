//! Feed parsing logic for RSS, Atom, and JSON Feed formats.

use feed_rs::parser;
use std::io::Cursor;
use tracing::{debug, warn};

use super::types::{FeedEntry, JsonFeed};
use super::util::{cleanup_xml, parse_date};
use crate::error::PipelineError;
use crate::TARGET_WEB_REQUEST;

/// Parse a feed payload into entries. JSON Feeds are detected by content
/// type; everything else goes through the RSS/Atom parser, with one reparse
/// attempt after XML cleanup.
pub fn parse_feed(
    text: &str,
    content_type: Option<&str>,
    source_url: &str,
) -> Result<Vec<FeedEntry>, PipelineError> {
    if content_type.map_or(false, |ct| ct.contains("json")) {
        debug!(target: TARGET_WEB_REQUEST, "Processing as JSON feed: {}", source_url);
        let feed: JsonFeed = serde_json::from_str(text)
            .map_err(|e| PipelineError::Fetch(format!("JSON feed parsing error: {}", e)))?;

        let entries = feed
            .items
            .into_iter()
            .filter_map(|item| {
                let url = item.url.or(item.id)?;
                Some(FeedEntry {
                    url,
                    title: item.title,
                    summary: item.content_text,
                    published_at: item.date_published.as_deref().and_then(parse_date),
                })
            })
            .collect();
        return Ok(entries);
    }

    debug!(target: TARGET_WEB_REQUEST, "Processing as XML feed: {}", source_url);
    match parser::parse(Cursor::new(text)) {
        Ok(feed) => Ok(collect_entries(feed)),
        Err(first_err) => {
            // One reparse attempt after cleaning the XML.
            let cleaned = cleanup_xml(text);
            if cleaned.contains("<rss") || cleaned.contains("<feed") {
                match parser::parse(Cursor::new(cleaned.as_str())) {
                    Ok(feed) => {
                        warn!(target: TARGET_WEB_REQUEST, "Feed from {} parsed only after XML cleanup", source_url);
                        Ok(collect_entries(feed))
                    }
                    Err(second_err) => Err(PipelineError::Fetch(format!(
                        "failed to parse feed from {} even after cleanup: {}; {}",
                        source_url, first_err, second_err
                    ))),
                }
            } else {
                Err(PipelineError::Fetch(format!(
                    "content from {} is not an RSS, Atom, or JSON feed",
                    source_url
                )))
            }
        }
    }
}

fn collect_entries(feed: feed_rs::model::Feed) -> Vec<FeedEntry> {
    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry.links.first().map(|link| link.href.clone())?;
            Some(FeedEntry {
                url,
                title: entry.title.map(|t| t.content),
                summary: entry.summary.map(|s| s.content),
                published_at: entry.published,
            })
        })
        .collect()
}
