use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                normalized_url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                source TEXT,
                pub_date TEXT,
                seen_at TEXT NOT NULL,
                sentiment TEXT,
                sentiment_score REAL,
                category TEXT,
                summary TEXT,
                enriched_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_articles_enriched_at ON articles (enriched_at);
            CREATE INDEX IF NOT EXISTS idx_articles_content_hash ON articles (content_hash);
            CREATE INDEX IF NOT EXISTS idx_articles_pub_date ON articles (pub_date);
            CREATE INDEX IF NOT EXISTS idx_articles_category ON articles (category);
            "#,
        )
        .execute(&mut *conn)
        .await?;

        info!(target: TARGET_DB, "Database schema initialized");
        Ok(())
    }
}
