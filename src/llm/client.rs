use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::types::{ChatMessage, ChatRequest, ChatResponse};
use crate::config::Config;
use crate::error::PipelineError;
use crate::TARGET_LLM_REQUEST;

/// Seam between the pipeline and the remote completion API. The batch
/// processor owns the retry policy; implementations perform exactly one
/// request per call.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<String, PipelineError>;
}

/// Chat-completion client. Model, token bound, and temperature are fixed at
/// construction so output stays comparable across a batch.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    request_timeout: Duration,
}

impl ChatCompletionClient {
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .gzip(true)
            .build()
            .map_err(|e| PipelineError::Enrichment(format!("failed to build HTTP client: {}", e)))?;

        Ok(ChatCompletionClient {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            request_timeout: config.request_timeout,
        })
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<String, PipelineError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_input,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(target: TARGET_LLM_REQUEST, "Sending completion request to {} with model {}", url, self.model);

        let response = match timeout(
            self.request_timeout,
            self.http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send(),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(target: TARGET_LLM_REQUEST, "Completion request failed: {}", err);
                return Err(PipelineError::Enrichment(format!("request failed: {}", err)));
            }
            Err(_) => {
                warn!(target: TARGET_LLM_REQUEST, "Completion request timed out after {:?}", self.request_timeout);
                return Err(PipelineError::Enrichment(format!(
                    "request timed out after {}s",
                    self.request_timeout.as_secs()
                )));
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            warn!(target: TARGET_LLM_REQUEST, "Completion API rate limited, retry_after={:?}", retry_after);
            return Err(PipelineError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(target: TARGET_LLM_REQUEST, "Completion API returned {}: {}", status, detail);
            return Err(PipelineError::Enrichment(format!(
                "completion API returned {}",
                status
            )));
        }

        let payload = response
            .text()
            .await
            .map_err(|e| PipelineError::Enrichment(format!("failed to read response: {}", e)))?;

        extract_content(&payload)
    }
}

/// Pull `choices[0].message.content` out of a completion response body. A
/// missing or empty content field is a failure, never an empty success.
pub fn extract_content(payload: &str) -> Result<String, PipelineError> {
    let parsed: ChatResponse = serde_json::from_str(payload)
        .map_err(|e| PipelineError::Enrichment(format!("malformed response body: {}", e)))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(PipelineError::Enrichment(
            "response contained no completion content".to_string(),
        ));
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice_content() {
        let payload = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Markets"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        }"#;
        assert_eq!(extract_content(payload).unwrap(), "Markets");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let err = extract_content(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, PipelineError::Enrichment(_)));
    }

    #[test]
    fn blank_content_is_an_error_not_a_placeholder() {
        let payload = r#"{"choices": [{"message": {"content": "   "}}]}"#;
        let err = extract_content(payload).unwrap_err();
        assert!(matches!(err, PipelineError::Enrichment(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = extract_content("not json").unwrap_err();
        assert!(matches!(err, PipelineError::Enrichment(_)));
    }

    #[test]
    fn request_body_matches_the_wire_contract() {
        let body = ChatRequest {
            model: "test-model",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "usr",
                },
            ],
            max_tokens: 256,
            temperature: 0.2,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["max_tokens"], 256);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
    }
}
