//! Publication of enriched records.

use tracing::debug;

use crate::db::Database;
use crate::error::PipelineError;
use crate::models::EnrichedArticle;
use crate::TARGET_DB;

/// Writes fully enriched records to the store, keyed by canonical URL.
///
/// The batch processor's state machine guarantees records arrive complete;
/// the field checks here are a last defensive line, not a re-validation of
/// the pipeline.
pub struct Publisher {
    db: Database,
}

impl Publisher {
    pub fn new(db: Database) -> Self {
        Publisher { db }
    }

    pub async fn publish(&self, record: &EnrichedArticle) -> Result<(), PipelineError> {
        if record.url.trim().is_empty() {
            return Err(PipelineError::Validation(
                "refusing to publish record without a URL".to_string(),
            ));
        }
        if record.category.trim().is_empty() {
            return Err(PipelineError::Validation(format!(
                "refusing to publish {} without a category",
                record.url
            )));
        }
        if record.summary.trim().is_empty() {
            return Err(PipelineError::Validation(format!(
                "refusing to publish {} without a summary",
                record.url
            )));
        }

        self.db.publish_enriched(record).await?;
        debug!(target: TARGET_DB, "Published {} ({})", record.url, record.category);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;

    fn record(summary: &str) -> EnrichedArticle {
        EnrichedArticle {
            url: "https://example.com/a".to_string(),
            title: "T".to_string(),
            content: "C".to_string(),
            published_at: None,
            sentiment: Sentiment::Neutral,
            sentiment_score: 0.0,
            category: "World".to_string(),
            summary: summary.to_string(),
        }
    }

    #[tokio::test]
    async fn publishes_a_complete_record() {
        let db = Database::in_memory().await.unwrap();
        let publisher = Publisher::new(db.clone());

        publisher.publish(&record("A summary.")).await.unwrap();
        assert!(db
            .find_enriched("https://example.com/a")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn rejects_a_record_with_an_empty_summary() {
        let db = Database::in_memory().await.unwrap();
        let publisher = Publisher::new(db.clone());

        let err = publisher.publish(&record("   ")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        // Nothing reached the store.
        assert!(db
            .find_enriched("https://example.com/a")
            .await
            .unwrap()
            .is_none());
    }
}
