use std::fmt::Display;
use std::time::Duration;

use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Raw model analysis of one book, keyed by ISBN-13
    LlmAnalysis(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::LlmAnalysis(isbn) => write!(f, "llm_cache:{}", isbn),
        }
    }
}

/// How long a cached value is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheRetention {
    #[default]
    Forever,
    Expire(Duration),
}

/// Key-value cache holding raw string payloads
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<String>>;

    /// Stores `value` verbatim, replacing whatever was there
    async fn set(&self, key: &CacheKey, value: &str, retention: CacheRetention) -> AppResult<()>;
}
