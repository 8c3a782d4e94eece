//! Fixed English stop-word list. Tokens in this list never contribute to a
//! score and are excluded from the normalization denominator.

pub(crate) static STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "an", "and", "any", "are", "as",
    "at", "be", "been", "being", "below", "between", "both", "but", "by", "can", "did", "do",
    "does", "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
    "here", "how", "if", "in", "into", "is", "it", "its", "just", "more", "most", "no", "nor",
    "not", "of", "off", "on", "once", "only", "or", "other", "our", "out", "over", "own", "same",
    "should", "so", "some", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "why", "will", "with",
    "would", "you", "your",
];
