//! Book event publication

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppResult, models::book::{Book, Genre}};

pub const BOOK_CREATED: &str = "book.created";

/// Topic-based notification channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> AppResult<()>;
}

/// Payload of a `book.created` event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCreatedEvent {
    pub book_id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub timestamp: DateTime<Utc>,
}

impl BookCreatedEvent {
    pub fn new(book: &Book, timestamp: DateTime<Utc>) -> Self {
        Self {
            book_id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre,
            timestamp,
        }
    }
}
