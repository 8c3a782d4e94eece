use std::time::Duration;
use thiserror::Error;

/// Failure kinds for the ingestion and enrichment pipeline.
///
/// Every error is caught at the item boundary inside the batch processor
/// and converted to a per-item terminal status; nothing here aborts a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source was unreachable or its payload unparseable. The source is
    /// skipped for this run.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A storage read or write failed. Retryable; the item is left for the
    /// next run.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// The remote completion API returned HTTP 429. Drives backpressure in
    /// the batch processor; the item must not be dropped.
    #[error("rate limited by completion API")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other completion API failure: transport error, timeout, non-2xx
    /// status, or a malformed response body.
    #[error("enrichment failed: {0}")]
    Enrichment(String),

    /// A record failed validation before publication. Fatal for that item,
    /// never coerced.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl PipelineError {
    /// Whether the batch processor may retry the operation for this item.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::RateLimited { .. }
                | PipelineError::Enrichment(_)
                | PipelineError::Storage(_)
        )
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, PipelineError::RateLimited { .. })
    }
}
