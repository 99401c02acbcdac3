//! Redis service backing the list cache and the book event channel

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};

use super::{cache::CacheClient, events::EventPublisher};
use crate::error::{AppError, AppResult};

/// Shares one auto-reconnecting connection across every cache and publish call
#[derive(Clone)]
pub struct RedisService {
    manager: ConnectionManager,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let mut manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        // Test connection
        redis::cmd("PING")
            .query_async::<_, String>(&mut manager)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { manager })
    }

    /// Handle on the shared connection
    pub fn get_connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

/// Channel a topic event is published on: `<exchange>.<routing_key>`.
///
/// Subscribers get topic semantics with `PSUBSCRIBE library_events.book.*`.
pub fn event_channel(exchange: &str, routing_key: &str) -> String {
    format!("{}.{}", exchange, routing_key)
}

#[async_trait]
impl CacheClient for RedisService {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.get_connection();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read cache key {}: {}", key, e)))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.get_connection();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write cache key {}: {}", key, e)))
    }

    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let mut conn = self.get_connection();
        conn.keys::<_, Vec<String>>(pattern)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to list cache keys: {}", e)))
    }

    async fn del(&self, keys: &[String]) -> AppResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.get_connection();
        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete cache keys: {}", e)))
    }
}

#[async_trait]
impl EventPublisher for RedisService {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> AppResult<()> {
        let mut conn = self.get_connection();
        let channel = event_channel(exchange, routing_key);
        let receivers: i64 = conn
            .publish(&channel, payload.to_string())
            .await
            .map_err(|e| AppError::Internal(format!("Failed to publish on {}: {}", channel, e)))?;
        tracing::debug!(channel = %channel, receivers, "Event published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Needs a Redis server on localhost:6379
    async fn cache_and_publish_share_one_connection() {
        let service = RedisService::new("redis://127.0.0.1:6379").await.unwrap();
        let key = format!("books:test-{}", uuid::Uuid::new_v4());

        service.set_ex(&key, "[]", 5).await.unwrap();
        assert_eq!(service.get(&key).await.unwrap().as_deref(), Some("[]"));
        assert!(service.keys("books:test-*").await.unwrap().contains(&key));

        service.del(&[key.clone()]).await.unwrap();
        assert_eq!(service.get(&key).await.unwrap(), None);

        service
            .publish("library_events", "book.created", &serde_json::json!({}))
            .await
            .unwrap();
    }

    #[test]
    fn channel_joins_exchange_and_routing_key() {
        assert_eq!(
            event_channel("library_events", "book.created"),
            "library_events.book.created"
        );
    }
}
