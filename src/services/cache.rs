//! List-cache collaborator and key layout

use async_trait::async_trait;

use crate::{error::AppResult, models::book::BookFilter};

/// Prefix shared by every cached list query
pub const LIST_CACHE_NAMESPACE: &str = "books";

/// Fixed lifetime of a cached list, in seconds
pub const LIST_CACHE_TTL_SECS: u64 = 300;

/// Key-value store with expiry used as a best-effort read-through cache
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()>;

    /// Keys matching a glob-style pattern
    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>>;

    async fn del(&self, keys: &[String]) -> AppResult<()>;
}

/// Cache key for a listing filter: `books:<genre|all>:<true|false>`
pub fn list_cache_key(filter: &BookFilter) -> String {
    format!(
        "{}:{}:{}",
        LIST_CACHE_NAMESPACE,
        filter.genre.as_deref().unwrap_or("all"),
        filter.include_archived
    )
}

/// Pattern matching every key in the list-cache namespace
pub fn list_cache_pattern() -> String {
    format!("{}:*", LIST_CACHE_NAMESPACE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_derived_from_filter() {
        assert_eq!(list_cache_key(&BookFilter::default()), "books:all:false");
        assert_eq!(
            list_cache_key(&BookFilter {
                genre: Some("Science Fiction".to_string()),
                include_archived: true,
            }),
            "books:Science Fiction:true"
        );
    }

    #[test]
    fn pattern_covers_every_key() {
        let pattern = list_cache_pattern();
        let prefix = pattern.trim_end_matches('*');
        assert!(list_cache_key(&BookFilter::default()).starts_with(prefix));
    }
}
