pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod logging;
pub mod models;
pub mod prompt;
pub mod publish;
pub mod sentiment;
pub mod workers;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_DB: &str = "db_query";

pub use config::Config;
pub use db::Database;
pub use error::PipelineError;
pub use models::{EnrichedArticle, RawArticle, Sentiment};
