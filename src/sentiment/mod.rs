//! Lexicon-based sentiment scoring.
//!
//! Pure and deterministic: no I/O, no allocation beyond tokenization, and
//! identical input always yields an identical result. Scores are the sum of
//! per-token polarities divided by the number of tokens that survive
//! stop-word removal.

mod lexicon;
mod stopwords;

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use crate::models::Sentiment;

static LEXICON: Lazy<HashMap<&'static str, i8>> =
    Lazy::new(|| lexicon::LEXICON.iter().copied().collect());

static STOP_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| stopwords::STOP_WORDS.iter().copied().collect());

// Strict inequalities: a score of exactly 0.05 is neutral.
const POSITIVE_THRESHOLD: f64 = 0.05;
const NEGATIVE_THRESHOLD: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentResult {
    pub label: Sentiment,
    pub score: f64,
}

impl SentimentResult {
    const NEUTRAL: SentimentResult = SentimentResult {
        label: Sentiment::Neutral,
        score: 0.0,
    };
}

/// Score a text. Empty or non-alphabetic input is neutral with score 0.
pub fn analyze(text: &str) -> SentimentResult {
    let normalized: String = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();

    let tokens: Vec<String> = normalized
        .split_whitespace()
        .map(|t| t.to_ascii_lowercase())
        .filter(|t| !STOP_WORDS.contains(t.as_str()))
        .collect();

    if tokens.is_empty() {
        return SentimentResult::NEUTRAL;
    }

    let sum: i64 = tokens
        .iter()
        .map(|t| LEXICON.get(t.as_str()).copied().unwrap_or(0) as i64)
        .sum();

    let score = sum as f64 / tokens.len() as f64;
    SentimentResult {
        label: classify(score),
        score,
    }
}

fn classify(score: f64) -> Sentiment {
    if score > POSITIVE_THRESHOLD {
        Sentiment::Positive
    } else if score < NEGATIVE_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_is_deterministic() {
        let text = "Markets rallied on strong growth and upbeat profits";
        let first = analyze(text);
        for _ in 0..10 {
            assert_eq!(analyze(text), first);
        }
    }

    #[test]
    fn empty_input_is_neutral_zero() {
        let result = analyze("");
        assert_eq!(result.label, Sentiment::Neutral);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn non_alphabetic_input_is_neutral_zero() {
        let result = analyze("123 456");
        assert_eq!(result.label, Sentiment::Neutral);
        assert_eq!(result.score, 0.0);

        let result = analyze("!!! ??? 42");
        assert_eq!(result.label, Sentiment::Neutral);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn stop_words_only_is_neutral_zero() {
        let result = analyze("the and of to in");
        assert_eq!(result.label, Sentiment::Neutral);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn exact_boundary_score_is_neutral() {
        // One +1 token ("steady") among 20 surviving tokens: 1/20 = 0.05,
        // which must classify neutral because the comparison is strict.
        let text = "steady aluminum output figures europe asia plants \
                    shipping volume quarterly data released tuesday showing \
                    production levels matched forecasts exactly everywhere";
        let result = analyze(text);
        assert_eq!(result.score, 0.05);
        assert_eq!(result.label, Sentiment::Neutral);
    }

    #[test]
    fn just_above_boundary_is_positive() {
        // One +1 token among 19 surviving tokens: 1/19 > 0.05.
        let text = "steady aluminum output figures europe asia plants \
                    shipping volume quarterly data released tuesday showing \
                    production levels matched forecasts exactly";
        let result = analyze(text);
        assert!(result.score > 0.05);
        assert_eq!(result.label, Sentiment::Positive);
    }

    #[test]
    fn negative_news_scores_negative() {
        let result = analyze("Stocks plummeted amid fears");
        assert!(result.score < -0.05, "score was {}", result.score);
        assert_eq!(result.label, Sentiment::Negative);
    }

    #[test]
    fn positive_news_scores_positive() {
        let result = analyze("Profits soared after a breakthrough quarter");
        assert!(result.score > 0.05, "score was {}", result.score);
        assert_eq!(result.label, Sentiment::Positive);
    }

    #[test]
    fn punctuation_does_not_change_the_score() {
        let plain = analyze("Stocks plummeted amid fears");
        let noisy = analyze("Stocks plummeted, amid \"fears\"!");
        assert_eq!(plain, noisy);
    }
}
