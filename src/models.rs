use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An article as produced by the fetcher, before any enrichment.
///
/// The URL is the canonical identifier: re-fetching the same URL refreshes
/// the stored row rather than creating a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub url: String,
    pub title: String,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Feed URL this article came from.
    pub source: Option<String>,
}

impl RawArticle {
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        RawArticle {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            published_at: None,
            source: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    pub fn from_str_lossy(s: &str) -> Sentiment {
        match s {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

/// A fully enriched article, produced only after every enrichment stage
/// succeeded. Published whole; a later run overwrites it entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedArticle {
    pub url: String,
    pub title: String,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub sentiment: Sentiment,
    pub sentiment_score: f64,
    pub category: String,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_round_trips_through_str() {
        for s in [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative] {
            assert_eq!(Sentiment::from_str_lossy(s.as_str()), s);
        }
        assert_eq!(Sentiment::from_str_lossy("garbage"), Sentiment::Neutral);
    }
}
