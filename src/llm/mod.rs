mod client;
mod types;

pub use client::{extract_content, ChatCompletionClient, CompletionProvider};
pub use types::CompletionRequest;
