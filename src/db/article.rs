use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, instrument, warn};
use url::Url;
use urlnorm::UrlNormalizer;

use super::core::{Database, DbLockErrorExt};
use crate::error::PipelineError;
use crate::models::{EnrichedArticle, RawArticle, Sentiment};
use crate::TARGET_DB;

/// Result of an upsert keyed by canonical URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Canonical form of an article URL, used as the dedup key.
pub fn normalize_url(url: &str) -> Result<String, PipelineError> {
    if url.trim().is_empty() {
        return Err(PipelineError::Validation("empty URL".to_string()));
    }
    let parsed = Url::parse(url)
        .map_err(|e| PipelineError::Validation(format!("invalid URL {}: {}", url, e)))?;
    let normalizer = UrlNormalizer::default();
    Ok(normalizer.compute_normalization_string(&parsed))
}

fn content_hash(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn unix_now() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time travel")
        .as_secs()
        .to_string()
}

impl Database {
    /// Insert or refresh a raw article, keyed by its normalized URL.
    ///
    /// An identical re-fetch refreshes `seen_at` only. Changed content
    /// replaces the stored text and clears the enrichment columns so the
    /// article returns to the pending set. Concurrent upserts of the same
    /// URL serialize on the UNIQUE constraint, not in application code.
    #[instrument(target = "db_query", level = "info", skip(self, article))]
    pub async fn upsert_raw(&self, article: &RawArticle) -> Result<UpsertOutcome, PipelineError> {
        let normalized_url = normalize_url(&article.url)?;
        let hash = content_hash(&article.title, &article.content);
        let seen_at = unix_now();
        let pub_date = article.published_at.map(|d| d.to_rfc3339());

        debug!(target: TARGET_DB, "Upserting article: {}", article.url);

        let mut backoff = 100; // initial delay in milliseconds
        let max_retries = 5;

        for attempt in 1..=max_retries {
            let result = self
                .try_upsert_raw(article, &normalized_url, &hash, &seen_at, pub_date.as_deref())
                .await;

            match result {
                Ok(outcome) => {
                    debug!(target: TARGET_DB, "Article {}: {:?}", article.url, outcome);
                    return Ok(outcome);
                }
                Err(err) if err.is_database_lock_error() => {
                    warn!(target: TARGET_DB, "Database is locked, waiting {}ms before retrying attempt {}/{}: {}", backoff, attempt, max_retries, article.url);
                    let jitter = rand::rng().random_range(0..100);
                    sleep(Duration::from_millis(backoff + jitter)).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(err) => {
                    error!(target: TARGET_DB, "Failed to upsert article {}: {}", article.url, err);
                    return Err(err.into());
                }
            }
        }

        Err(PipelineError::Storage(sqlx::Error::Protocol(
            "maximum retries exceeded for article upsert".into(),
        )))
    }

    async fn try_upsert_raw(
        &self,
        article: &RawArticle,
        normalized_url: &str,
        hash: &str,
        seen_at: &str,
        pub_date: Option<&str>,
    ) -> Result<UpsertOutcome, sqlx::Error> {
        let existing = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, content_hash FROM articles WHERE normalized_url = ?1",
        )
        .bind(normalized_url)
        .fetch_optional(self.pool())
        .await?;

        match existing {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO articles (url, normalized_url, title, content, content_hash, source, pub_date, seen_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(normalized_url) DO UPDATE SET
                        seen_at = excluded.seen_at
                    "#,
                )
                .bind(&article.url)
                .bind(normalized_url)
                .bind(&article.title)
                .bind(&article.content)
                .bind(hash)
                .bind(&article.source)
                .bind(pub_date)
                .bind(seen_at)
                .execute(self.pool())
                .await?;
                Ok(UpsertOutcome::Inserted)
            }
            Some((id, stored_hash)) if stored_hash == hash => {
                sqlx::query("UPDATE articles SET seen_at = ?1 WHERE id = ?2")
                    .bind(seen_at)
                    .bind(id)
                    .execute(self.pool())
                    .await?;
                Ok(UpsertOutcome::Unchanged)
            }
            Some((id, _)) => {
                // Content changed: refresh the raw fields and clear the
                // enrichment columns so the row is pending again.
                sqlx::query(
                    r#"
                    UPDATE articles SET
                        url = ?1, title = ?2, content = ?3, content_hash = ?4,
                        pub_date = ?5, seen_at = ?6,
                        sentiment = NULL, sentiment_score = NULL,
                        category = NULL, summary = NULL, enriched_at = NULL
                    WHERE id = ?7
                    "#,
                )
                .bind(&article.url)
                .bind(&article.title)
                .bind(&article.content)
                .bind(hash)
                .bind(pub_date)
                .bind(seen_at)
                .bind(id)
                .execute(self.pool())
                .await?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    /// Articles with no published enrichment yet, oldest sighting first.
    #[instrument(target = "db_query", level = "info", skip(self))]
    pub async fn unenriched(&self, limit: i64) -> Result<Vec<RawArticle>, PipelineError> {
        let rows = sqlx::query_as::<_, (String, String, String, Option<String>, Option<String>)>(
            r#"
            SELECT url, title, content, pub_date, source
            FROM articles
            WHERE enriched_at IS NULL
            ORDER BY seen_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(PipelineError::Storage)?;

        Ok(rows
            .into_iter()
            .map(|(url, title, content, pub_date, source)| RawArticle {
                url,
                title,
                content,
                published_at: pub_date.as_deref().and_then(parse_rfc3339),
                source,
            })
            .collect())
    }

    /// Write a fully enriched record, overwriting any prior enrichment for
    /// the same canonical URL.
    #[instrument(target = "db_query", level = "info", skip(self, record))]
    pub async fn publish_enriched(&self, record: &EnrichedArticle) -> Result<(), PipelineError> {
        let normalized_url = normalize_url(&record.url)?;
        let hash = content_hash(&record.title, &record.content);
        let seen_at = unix_now();
        let enriched_at = Utc::now().to_rfc3339();
        let pub_date = record.published_at.map(|d| d.to_rfc3339());

        sqlx::query(
            r#"
            INSERT INTO articles (
                url, normalized_url, title, content, content_hash, pub_date, seen_at,
                sentiment, sentiment_score, category, summary, enriched_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(normalized_url) DO UPDATE SET
                sentiment = excluded.sentiment,
                sentiment_score = excluded.sentiment_score,
                category = excluded.category,
                summary = excluded.summary,
                enriched_at = excluded.enriched_at
            "#,
        )
        .bind(&record.url)
        .bind(&normalized_url)
        .bind(&record.title)
        .bind(&record.content)
        .bind(&hash)
        .bind(pub_date)
        .bind(seen_at)
        .bind(record.sentiment.as_str())
        .bind(record.sentiment_score)
        .bind(&record.category)
        .bind(&record.summary)
        .bind(&enriched_at)
        .execute(self.pool())
        .await
        .map_err(PipelineError::Storage)?;

        debug!(target: TARGET_DB, "Published enriched article: {}", record.url);
        Ok(())
    }

    /// Fetch the published enrichment for a URL, if any.
    pub async fn find_enriched(&self, url: &str) -> Result<Option<EnrichedArticle>, PipelineError> {
        let normalized_url = normalize_url(url)?;

        let row = sqlx::query_as::<_, (
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            Option<f64>,
            Option<String>,
            Option<String>,
            Option<String>,
        )>(
            r#"
            SELECT url, title, content, pub_date, sentiment, sentiment_score, category, summary, enriched_at
            FROM articles
            WHERE normalized_url = ?1
            "#,
        )
        .bind(&normalized_url)
        .fetch_optional(self.pool())
        .await
        .map_err(PipelineError::Storage)?;

        Ok(row.and_then(
            |(url, title, content, pub_date, sentiment, score, category, summary, enriched_at)| {
                // Only rows that completed every stage count as published.
                enriched_at?;
                Some(EnrichedArticle {
                    url,
                    title,
                    content,
                    published_at: pub_date.as_deref().and_then(parse_rfc3339),
                    sentiment: Sentiment::from_str_lossy(sentiment.as_deref().unwrap_or("neutral")),
                    sentiment_score: score.unwrap_or(0.0),
                    category: category.unwrap_or_default(),
                    summary: summary.unwrap_or_default(),
                })
            },
        ))
    }

    pub async fn count_articles(&self) -> Result<i64, PipelineError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(self.pool())
            .await
            .map_err(PipelineError::Storage)?;
        Ok(count)
    }

    pub async fn count_unenriched(&self) -> Result<i64, PipelineError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE enriched_at IS NULL")
                .fetch_one(self.pool())
                .await
                .map_err(PipelineError::Storage)?;
        Ok(count)
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawArticle;

    fn article(url: &str, content: &str) -> RawArticle {
        RawArticle::new(url, "Test title", content)
    }

    #[tokio::test]
    async fn upsert_same_url_twice_keeps_one_row() {
        let db = Database::in_memory().await.unwrap();
        let a = article("https://example.com/a", "same body");

        assert_eq!(db.upsert_raw(&a).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(db.upsert_raw(&a).await.unwrap(), UpsertOutcome::Unchanged);
        assert_eq!(db.count_articles().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn changed_content_updates_and_clears_enrichment() {
        let db = Database::in_memory().await.unwrap();
        let a = article("https://example.com/a", "old body");
        db.upsert_raw(&a).await.unwrap();

        db.publish_enriched(&EnrichedArticle {
            url: a.url.clone(),
            title: a.title.clone(),
            content: a.content.clone(),
            published_at: None,
            sentiment: Sentiment::Neutral,
            sentiment_score: 0.0,
            category: "World".to_string(),
            summary: "A summary.".to_string(),
        })
        .await
        .unwrap();
        assert!(db.find_enriched(&a.url).await.unwrap().is_some());

        let refreshed = article("https://example.com/a", "new body");
        assert_eq!(
            db.upsert_raw(&refreshed).await.unwrap(),
            UpsertOutcome::Updated
        );
        assert_eq!(db.count_articles().await.unwrap(), 1);
        // Back in the pending set, no longer published.
        assert!(db.find_enriched(&a.url).await.unwrap().is_none());
        assert_eq!(db.count_unenriched().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn republication_overwrites_whole_record() {
        let db = Database::in_memory().await.unwrap();
        let a = article("https://example.com/a", "body");
        db.upsert_raw(&a).await.unwrap();

        for (category, summary) in [("Markets", "First."), ("Business", "Second.")] {
            db.publish_enriched(&EnrichedArticle {
                url: a.url.clone(),
                title: a.title.clone(),
                content: a.content.clone(),
                published_at: None,
                sentiment: Sentiment::Negative,
                sentiment_score: -0.5,
                category: category.to_string(),
                summary: summary.to_string(),
            })
            .await
            .unwrap();
        }

        let stored = db.find_enriched(&a.url).await.unwrap().unwrap();
        assert_eq!(stored.category, "Business");
        assert_eq!(stored.summary, "Second.");
        assert_eq!(db.count_articles().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unenriched_excludes_published_rows() {
        let db = Database::in_memory().await.unwrap();
        db.upsert_raw(&article("https://example.com/a", "a"))
            .await
            .unwrap();
        db.upsert_raw(&article("https://example.com/b", "b"))
            .await
            .unwrap();

        let pending = db.unenriched(100).await.unwrap();
        assert_eq!(pending.len(), 2);

        db.publish_enriched(&EnrichedArticle {
            url: "https://example.com/a".to_string(),
            title: "Test title".to_string(),
            content: "a".to_string(),
            published_at: None,
            sentiment: Sentiment::Neutral,
            sentiment_score: 0.0,
            category: "World".to_string(),
            summary: "S.".to_string(),
        })
        .await
        .unwrap();

        let pending = db.unenriched(100).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].url, "https://example.com/b");
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(
            normalize_url("  "),
            Err(PipelineError::Validation(_))
        ));
        assert!(matches!(
            normalize_url("not a url"),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn query_strings_normalize_to_same_key() {
        let a = normalize_url("https://example.com/story?utm_source=feed").unwrap();
        let b = normalize_url("https://example.com/story").unwrap();
        assert_eq!(a, b);
    }
}
