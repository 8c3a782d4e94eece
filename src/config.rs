use std::env;
use tokio::time::Duration;

/// Retry schedule for remote calls. Delays grow exponentially from
/// `base_delay` up to `max_delay`, with jitter added by the policy in
/// `workers::retry`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Pipeline configuration. Constructed once (normally from the environment)
/// and passed into components explicitly; nothing reads environment
/// variables at call sites.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the chat-completion API, without a trailing slash.
    pub api_base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on articles enriched concurrently.
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub scrape_timeout: Duration,
    /// Feed entries older than this are recorded but not enriched.
    pub max_article_age: chrono::Duration,
    pub retry: RetryConfig,
    /// Bound on consecutive rate-limit pauses per item, separate from the
    /// failure retry budget.
    pub rate_limit_retries: u32,
    pub database_path: String,
    pub feed_urls: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            temperature: 0.2,
            concurrency: 4,
            request_timeout: Duration::from_secs(60),
            scrape_timeout: Duration::from_secs(30),
            max_article_age: chrono::Duration::weeks(1),
            retry: RetryConfig::default(),
            rate_limit_retries: 10,
            database_path: "clio.db".to_string(),
            feed_urls: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            api_base_url: env::var("COMPLETION_API_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            api_key: env::var("COMPLETION_API_KEY").unwrap_or_default(),
            model: env::var("COMPLETION_MODEL").unwrap_or(defaults.model),
            max_tokens: parse_env("COMPLETION_MAX_TOKENS", defaults.max_tokens),
            temperature: parse_env("COMPLETION_TEMPERATURE", defaults.temperature),
            concurrency: parse_env("BATCH_CONCURRENCY", defaults.concurrency).max(1),
            request_timeout: Duration::from_secs(parse_env(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            scrape_timeout: Duration::from_secs(parse_env(
                "SCRAPE_TIMEOUT_SECS",
                defaults.scrape_timeout.as_secs(),
            )),
            max_article_age: chrono::Duration::days(parse_env("MAX_ARTICLE_AGE_DAYS", 7)),
            retry: RetryConfig {
                max_attempts: parse_env("RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts),
                base_delay: Duration::from_millis(parse_env("RETRY_BASE_DELAY_MS", 2000)),
                max_delay: Duration::from_millis(parse_env("RETRY_MAX_DELAY_MS", 60000)),
            },
            rate_limit_retries: parse_env("RATE_LIMIT_RETRIES", defaults.rate_limit_retries),
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            feed_urls: get_env_var_as_vec("FEED_URLS", ';'),
        }
    }
}

/// Retrieves an environment variable and splits it into a vector of strings
/// based on a delimiter. Missing variables yield an empty vector.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert!(cfg.concurrency >= 1);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert!(cfg.retry.base_delay < cfg.retry.max_delay);
        assert!(cfg.request_timeout.as_secs() > 0);
    }

    #[test]
    fn env_var_vec_splits_and_trims() {
        std::env::set_var("CLIO_TEST_FEEDS", " a ;b; ;c ");
        let v = get_env_var_as_vec("CLIO_TEST_FEEDS", ';');
        assert_eq!(v, vec!["a", "b", "c"]);
        std::env::remove_var("CLIO_TEST_FEEDS");
    }

    #[test]
    fn missing_env_var_yields_empty_vec() {
        assert!(get_env_var_as_vec("CLIO_TEST_MISSING", ';').is_empty());
    }
}
