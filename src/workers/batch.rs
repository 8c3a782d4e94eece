//! Batch enrichment: drives raw articles through sentiment scoring and the
//! remote completion stages, isolating failures at the item boundary.

use futures::stream::{self, StreamExt};
use tokio::sync::{watch, Mutex};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use crate::config::Config;
use crate::db::Database;
use crate::error::PipelineError;
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::models::{EnrichedArticle, RawArticle};
use crate::prompt;
use crate::publish::Publisher;
use crate::sentiment;
use crate::TARGET_LLM_REQUEST;

/// Per-item processing states. `Failed` is terminal and reachable from any
/// non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    SentimentDone,
    EnrichmentRequested,
    Enriched,
    Published,
    Failed(String),
}

/// A permanently failed item, retained for inspection.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub url: String,
    pub reason: String,
    pub attempts: u32,
}

/// Outcome counts for one batch run. The run itself never fails: errors are
/// converted to per-item terminal states.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub published: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
}

enum ItemOutcome {
    Published,
    Failed(ItemFailure),
    Skipped,
}

fn fail_item(url: String, reason: String, attempts: u32) -> ItemOutcome {
    let state = ItemState::Failed(reason.clone());
    debug!(target: TARGET_LLM_REQUEST, "Article {}: {:?}", url, state);
    ItemOutcome::Failed(ItemFailure {
        url,
        reason,
        attempts,
    })
}

enum StageError {
    Cancelled,
    Failed(String),
}

/// Shared backpressure gate. A rate-limited response closes the gate for a
/// cooldown; every enrichment call waits for it to open before sending.
struct RateGate {
    state: Mutex<GateState>,
}

struct GateState {
    next_allowed: Instant,
    strikes: u32,
}

impl RateGate {
    fn new() -> Self {
        RateGate {
            state: Mutex::new(GateState {
                next_allowed: Instant::now(),
                strikes: 0,
            }),
        }
    }

    async fn wait_ready(&self) {
        loop {
            let wait = {
                let state = self.state.lock().await;
                state.next_allowed.saturating_duration_since(Instant::now())
            };
            if wait.is_zero() {
                return;
            }
            sleep(wait).await;
        }
    }

    /// Close the gate after a 429. The server's Retry-After wins when
    /// present; otherwise the cooldown grows with consecutive strikes.
    async fn throttle(&self, retry_after: Option<Duration>, policy: &RetryPolicy) {
        let mut state = self.state.lock().await;
        state.strikes += 1;
        let cooldown = retry_after.unwrap_or_else(|| policy.delay_for(state.strikes));
        let candidate = Instant::now() + cooldown;
        if candidate > state.next_allowed {
            state.next_allowed = candidate;
        }
        warn!(target: TARGET_LLM_REQUEST, "Rate limited (strike {}), pausing enrichment for {:?}", state.strikes, cooldown);
    }

    async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.strikes = 0;
    }
}

/// Orchestrates the enrichment pipeline over a set of raw articles.
pub struct BatchProcessor<P: CompletionProvider> {
    provider: P,
    publisher: Publisher,
    policy: RetryPolicy,
    concurrency: usize,
    rate_limit_retries: u32,
    gate: RateGate,
}

impl<P: CompletionProvider> BatchProcessor<P> {
    pub fn new(db: Database, provider: P, config: &Config) -> Self {
        BatchProcessor {
            provider,
            publisher: Publisher::new(db),
            policy: RetryPolicy::new(&config.retry),
            concurrency: config.concurrency.max(1),
            rate_limit_retries: config.rate_limit_retries,
            gate: RateGate::new(),
        }
    }

    /// Process a batch. Items run independently up to the concurrency
    /// limit; the report aggregates terminal states and never raises on a
    /// per-item error.
    pub async fn run(
        &self,
        articles: Vec<RawArticle>,
        cancel: watch::Receiver<bool>,
    ) -> BatchReport {
        let total = articles.len();
        info!(target: TARGET_LLM_REQUEST, "Starting batch enrichment of {} articles", total);

        let outcomes: Vec<(String, ItemOutcome)> = stream::iter(articles.into_iter().map(|article| {
            let cancel = cancel.clone();
            async move {
                let url = article.url.clone();
                let outcome = self.process_item(article, &cancel).await;
                (url, outcome)
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let mut report = BatchReport::default();
        for (url, outcome) in outcomes {
            match outcome {
                ItemOutcome::Published => {
                    report.processed += 1;
                    report.published += 1;
                }
                ItemOutcome::Failed(failure) => {
                    report.processed += 1;
                    report.failed += 1;
                    warn!(target: TARGET_LLM_REQUEST, "Article {} failed after {} attempts: {}", failure.url, failure.attempts, failure.reason);
                    report.failures.push(failure);
                }
                ItemOutcome::Skipped => {
                    debug!(target: TARGET_LLM_REQUEST, "Article {} skipped", url);
                    report.skipped += 1;
                }
            }
        }

        info!(
            target: TARGET_LLM_REQUEST,
            "Batch complete: {} processed, {} published, {} failed, {} skipped",
            report.processed, report.published, report.failed, report.skipped
        );
        report
    }

    async fn process_item(&self, article: RawArticle, cancel: &watch::Receiver<bool>) -> ItemOutcome {
        let mut state = ItemState::Pending;
        let mut attempts = 0u32;
        debug!(target: TARGET_LLM_REQUEST, "Article {}: {:?}", article.url, state);

        if *cancel.borrow() {
            return ItemOutcome::Skipped;
        }

        // Stage 1: sentiment, local and infallible.
        let sentiment = sentiment::analyze(&article.content);
        state = ItemState::SentimentDone;
        debug!(target: TARGET_LLM_REQUEST, "Article {}: {:?}, {} (score {:.3})", article.url, state, sentiment.label.as_str(), sentiment.score);

        if *cancel.borrow() {
            return ItemOutcome::Skipped;
        }

        // Stage 2: remote enrichment, category then summary.
        state = ItemState::EnrichmentRequested;
        debug!(target: TARGET_LLM_REQUEST, "Article {}: {:?}", article.url, state);

        let category_raw = match self
            .complete_with_retry(prompt::category_prompt(&article), cancel, &mut attempts)
            .await
        {
            Ok(text) => text,
            Err(StageError::Cancelled) => return ItemOutcome::Skipped,
            Err(StageError::Failed(reason)) => {
                return fail_item(article.url, reason, attempts);
            }
        };

        let category = match prompt::normalize_category(&category_raw) {
            Some(category) => category,
            None => {
                let err = PipelineError::Validation(format!(
                    "unusable category answer: {:?}",
                    category_raw
                ));
                return fail_item(article.url, err.to_string(), attempts);
            }
        };

        let summary = match self
            .complete_with_retry(prompt::summary_prompt(&article), cancel, &mut attempts)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(StageError::Cancelled) => return ItemOutcome::Skipped,
            Err(StageError::Failed(reason)) => {
                return fail_item(article.url, reason, attempts);
            }
        };

        state = ItemState::Enriched;
        debug!(target: TARGET_LLM_REQUEST, "Article {}: {:?} as {}", article.url, state, category);

        // Stage 3: publish the complete record.
        let record = EnrichedArticle {
            url: article.url.clone(),
            title: article.title,
            content: article.content,
            published_at: article.published_at,
            sentiment: sentiment.label,
            sentiment_score: sentiment.score,
            category,
            summary,
        };

        match self.publisher.publish(&record).await {
            Ok(()) => {
                state = ItemState::Published;
                debug!(target: TARGET_LLM_REQUEST, "Article {}: {:?}", record.url, state);
                ItemOutcome::Published
            }
            Err(err) => fail_item(record.url, err.to_string(), attempts),
        }
    }

    /// One enrichment call under the shared retry policy. Rate limits pause
    /// the gate and retry without consuming failure attempts; other errors
    /// burn an attempt each until the budget is spent.
    async fn complete_with_retry(
        &self,
        request: CompletionRequest,
        cancel: &watch::Receiver<bool>,
        attempts: &mut u32,
    ) -> Result<String, StageError> {
        let mut failures = 0u32;
        let mut rate_limits = 0u32;

        loop {
            if *cancel.borrow() {
                return Err(StageError::Cancelled);
            }

            self.gate.wait_ready().await;

            if *cancel.borrow() {
                return Err(StageError::Cancelled);
            }

            *attempts += 1;
            match self
                .provider
                .complete(&request.system_prompt, &request.user_input)
                .await
            {
                Ok(text) => {
                    self.gate.reset().await;
                    return Ok(text);
                }
                Err(PipelineError::RateLimited { retry_after }) => {
                    rate_limits += 1;
                    if rate_limits > self.rate_limit_retries {
                        return Err(StageError::Failed(format!(
                            "rate limit budget exhausted after {} pauses",
                            rate_limits - 1
                        )));
                    }
                    self.gate.throttle(retry_after, &self.policy).await;
                }
                Err(err) => {
                    failures += 1;
                    if failures >= self.policy.max_attempts() {
                        return Err(StageError::Failed(err.to_string()));
                    }
                    let delay = self.policy.delay_for(failures);
                    debug!(target: TARGET_LLM_REQUEST, "Enrichment attempt {} failed ({}), retrying in {:?}", failures, err, delay);
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted completion provider: optionally rate-limits the first N
    /// calls, always fails inputs containing a marker, and otherwise
    /// answers by prompt kind.
    struct StubProvider {
        rate_limits_remaining: AtomicU32,
        fail_marker: Option<String>,
        category: String,
        summary: String,
    }

    impl StubProvider {
        fn answering(category: &str, summary: &str) -> Self {
            StubProvider {
                rate_limits_remaining: AtomicU32::new(0),
                fail_marker: None,
                category: category.to_string(),
                summary: summary.to_string(),
            }
        }

        fn with_rate_limits(mut self, n: u32) -> Self {
            self.rate_limits_remaining = AtomicU32::new(n);
            self
        }

        fn failing_on(mut self, marker: &str) -> Self {
            self.fail_marker = Some(marker.to_string());
            self
        }
    }

    #[async_trait]
    impl CompletionProvider for StubProvider {
        async fn complete(
            &self,
            system_prompt: &str,
            user_input: &str,
        ) -> Result<String, PipelineError> {
            if self
                .rate_limits_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(PipelineError::RateLimited {
                    retry_after: Some(Duration::from_millis(10)),
                });
            }

            if let Some(marker) = &self.fail_marker {
                if user_input.contains(marker) {
                    return Err(PipelineError::Enrichment("stub failure".to_string()));
                }
            }

            if system_prompt.contains("classify") {
                Ok(self.category.clone())
            } else {
                Ok(self.summary.clone())
            }
        }
    }

    fn test_config() -> Config {
        Config {
            concurrency: 1,
            retry: crate::config::RetryConfig {
                max_attempts: 2,
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
            },
            rate_limit_retries: 5,
            ..Config::default()
        }
    }

    fn not_cancelled() -> watch::Receiver<bool> {
        // The receiver keeps reporting the last value after the sender is
        // dropped, which is all these tests need.
        let (_tx, rx) = watch::channel(false);
        rx
    }

    #[tokio::test]
    async fn rate_limited_item_is_retried_and_published() {
        let db = Database::in_memory().await.unwrap();
        let article = RawArticle::new("https://example.com/a", "T", "Stocks plummeted amid fears");
        db.upsert_raw(&article).await.unwrap();

        let provider =
            StubProvider::answering("Markets", "Stocks fell due to fears.").with_rate_limits(1);
        let processor = BatchProcessor::new(db.clone(), provider, &test_config());

        let report = processor.run(vec![article.clone()], not_cancelled()).await;
        assert_eq!(report.published, 1);
        assert_eq!(report.failed, 0);
        assert!(db.find_enriched(&article.url).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn one_failing_item_does_not_stop_the_batch() {
        let db = Database::in_memory().await.unwrap();
        let articles = vec![
            RawArticle::new("https://example.com/1", "One", "growth and gains everywhere"),
            RawArticle::new("https://example.com/2", "Two", "POISON body that always fails"),
            RawArticle::new("https://example.com/3", "Three", "fears and losses mounting"),
        ];
        for a in &articles {
            db.upsert_raw(a).await.unwrap();
        }

        let provider = StubProvider::answering("Markets", "A summary.").failing_on("POISON");
        let processor = BatchProcessor::new(db.clone(), provider, &test_config());

        let report = processor.run(articles.clone(), not_cancelled()).await;
        assert_eq!(report.processed, 3);
        assert_eq!(report.published, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, "https://example.com/2");
        assert!(report.failures[0].attempts >= 2);

        // The failed item never reaches storage, not even partially.
        assert!(db.find_enriched("https://example.com/1").await.unwrap().is_some());
        assert!(db.find_enriched("https://example.com/2").await.unwrap().is_none());
        assert!(db.find_enriched("https://example.com/3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rerunning_a_batch_does_not_duplicate_rows() {
        let db = Database::in_memory().await.unwrap();
        let article = RawArticle::new("https://example.com/a", "T", "steady output");
        db.upsert_raw(&article).await.unwrap();

        let config = test_config();
        for _ in 0..2 {
            let provider = StubProvider::answering("Business", "A summary.");
            let processor = BatchProcessor::new(db.clone(), provider, &config);
            let report = processor.run(vec![article.clone()], not_cancelled()).await;
            assert_eq!(report.published, 1);
        }

        assert_eq!(db.count_articles().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unusable_category_answer_fails_validation() {
        let db = Database::in_memory().await.unwrap();
        let article = RawArticle::new("https://example.com/a", "T", "body");
        db.upsert_raw(&article).await.unwrap();

        let provider = StubProvider::answering("Markets\nbecause the article says so", "S.");
        let processor = BatchProcessor::new(db.clone(), provider, &test_config());

        let report = processor.run(vec![article.clone()], not_cancelled()).await;
        assert_eq!(report.failed, 1);
        assert!(report.failures[0].reason.contains("validation"));
        assert!(db.find_enriched(&article.url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancelled_run_skips_remaining_items() {
        let db = Database::in_memory().await.unwrap();
        let articles = vec![
            RawArticle::new("https://example.com/1", "One", "body"),
            RawArticle::new("https://example.com/2", "Two", "body"),
        ];

        let (tx, rx) = watch::channel(true);
        let provider = StubProvider::answering("Markets", "S.");
        let processor = BatchProcessor::new(db.clone(), provider, &test_config());

        let report = processor.run(articles, rx).await;
        drop(tx);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.published, 0);
        assert!(db.find_enriched("https://example.com/1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn end_to_end_scenario_publishes_all_fields() {
        let db = Database::in_memory().await.unwrap();
        let article = RawArticle::new(
            "https://example.com/a",
            "T",
            "Stocks plummeted amid fears",
        );
        db.upsert_raw(&article).await.unwrap();

        let provider = StubProvider::answering("Markets", "Stocks fell due to fears.");
        let processor = BatchProcessor::new(db.clone(), provider, &test_config());
        let report = processor.run(vec![article.clone()], not_cancelled()).await;
        assert_eq!(report.published, 1);

        let stored = db.find_enriched("https://example.com/a").await.unwrap().unwrap();
        assert_eq!(stored.url, "https://example.com/a");
        assert_eq!(stored.title, "T");
        assert_eq!(stored.sentiment, crate::models::Sentiment::Negative);
        assert!(stored.sentiment_score < -0.05);
        assert_eq!(stored.category, "Markets");
        assert_eq!(stored.summary, "Stocks fell due to fears.");
    }
}
