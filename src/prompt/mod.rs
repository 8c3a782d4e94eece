//! Prompt builders for the enrichment stages.

use crate::llm::CompletionRequest;
use crate::models::RawArticle;

/// Controlled category vocabulary. The model is asked to pick from this
/// list; an off-list answer is kept as model-suggested rather than
/// rejected.
pub const CATEGORIES: &[&str] = &[
    "Markets",
    "Business",
    "Technology",
    "Politics",
    "Science",
    "Health",
    "Sports",
    "Entertainment",
    "World",
];

const ANSWER_DIRECTLY: &str = r#"
Answer directly, without meta-commentary:
1. Do not narrate or describe your actions.
2. Do not restate these instructions or confirm you understand them.
3. Do not preface the answer with phrases like "Here is..." or "Sure,".
"#;

/// Prompt for assigning a single category to an article.
pub fn category_prompt(article: &RawArticle) -> CompletionRequest {
    let system_prompt = format!(
        r#"You classify news articles into exactly one category.

Choose the best match from this list:
{categories}

If none fits, answer with a single short category word of your own.
Respond with ONLY the category name, nothing else.
{answer_directly}"#,
        categories = CATEGORIES.join(", "),
        answer_directly = ANSWER_DIRECTLY
    );

    CompletionRequest {
        system_prompt,
        user_input: format!("Title: {}\n\n{}", article.title, article.content),
    }
}

/// Prompt for a short abstract of an article.
pub fn summary_prompt(article: &RawArticle) -> CompletionRequest {
    let system_prompt = format!(
        r#"You summarize news articles.

Write a summary of the article that follows these rules:
* 2-3 complete sentences in a single paragraph, no line breaks.
* Lead with the main event: who did what, when, where.
* Keep the most important numbers and dates; drop minor detail.
* Use active voice and preserve the article's level of certainty -
  never present a rumor or a forecast as confirmed fact.
{answer_directly}"#,
        answer_directly = ANSWER_DIRECTLY
    );

    CompletionRequest {
        system_prompt,
        user_input: format!("Title: {}\n\n{}", article.title, article.content),
    }
}

/// Reduce a raw category answer to a stored value. Canonical-list matches
/// are case-folded to their canonical spelling; other non-empty single-line
/// answers pass through as model-suggested. Empty answers yield None.
pub fn normalize_category(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '.')
        .trim();

    if cleaned.is_empty() || cleaned.contains('\n') {
        return None;
    }

    for canonical in CATEGORIES {
        if canonical.eq_ignore_ascii_case(cleaned) {
            return Some((*canonical).to_string());
        }
    }

    Some(cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prompt_lists_the_vocabulary() {
        let article = RawArticle::new("https://example.com/a", "T", "C");
        let req = category_prompt(&article);
        for c in CATEGORIES {
            assert!(req.system_prompt.contains(c));
        }
        assert!(req.user_input.contains("Title: T"));
    }

    #[test]
    fn normalize_category_canonicalizes_case() {
        assert_eq!(normalize_category("markets").as_deref(), Some("Markets"));
        assert_eq!(normalize_category(" \"Politics\" ").as_deref(), Some("Politics"));
    }

    #[test]
    fn normalize_category_keeps_model_suggested_values() {
        assert_eq!(normalize_category("Climate").as_deref(), Some("Climate"));
    }

    #[test]
    fn normalize_category_rejects_empty_and_multiline() {
        assert_eq!(normalize_category("   "), None);
        assert_eq!(normalize_category("Markets\nBecause..."), None);
    }
}
