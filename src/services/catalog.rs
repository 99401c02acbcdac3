//! Catalog service: book CRUD with read-through list caching and write events.
//!
//! Reads consult the list cache before the store. Every mutation clears the
//! whole list-cache namespace; live keys are not tracked. Cache and event
//! failures are logged and never reach the caller.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{
    cache::{list_cache_key, list_cache_pattern, CacheClient, LIST_CACHE_TTL_SECS},
    events::{BookCreatedEvent, EventPublisher, BOOK_CREATED},
};
use crate::{
    error::{AppError, AppResult},
    metrics,
    models::book::{Book, BookFilter, BookInput, Genre},
    repository::BookStore,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn BookStore>,
    cache: Option<Arc<dyn CacheClient>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    exchange: String,
}

fn book_not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}

/// Malformed ids cannot name an existing book
pub fn parse_book_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| book_not_found())
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn BookStore>,
        cache: Option<Arc<dyn CacheClient>>,
        publisher: Option<Arc<dyn EventPublisher>>,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
            exchange: exchange.into(),
        }
    }

    /// List books, served from the cache when possible
    pub async fn list_books(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let key = list_cache_key(filter);

        if let Some(books) = self.cached_list(&key).await {
            tracing::info!(
                genre = ?filter.genre,
                include_archived = filter.include_archived,
                "Books fetched from cache"
            );
            return Ok(books);
        }

        let books = self.store.find(filter).await?;

        self.cache_list(&key, &books).await;
        metrics::record_books_total(books.len());

        tracing::info!(
            count = books.len(),
            genre = ?filter.genre,
            include_archived = filter.include_archived,
            "Books fetched from database"
        );
        Ok(books)
    }

    pub fn genres(&self) -> &'static [Genre] {
        &Genre::ALL
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.store.find_by_id(id).await?.ok_or_else(book_not_found)
    }

    /// Create a book, then announce it and clear cached lists
    pub async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        let new_book = input.into_new_book()?;
        let book = self
            .store
            .insert(&new_book)
            .await
            .map_err(AppError::on_write_path)?;

        self.publish_created(&book);
        self.invalidate_lists().await;

        tracing::info!(book_id = %book.id, title = %book.title, "Book created");
        Ok(book)
    }

    /// Shallow-merge `patch` into an existing book
    pub async fn update_book(&self, id: Uuid, patch: BookInput) -> AppResult<Book> {
        let mut book = self.fetch_for_write(id).await?;
        book.merge(patch)?;
        let book = self.store.save(&book).await.map_err(AppError::on_write_path)?;

        self.invalidate_lists().await;

        tracing::info!(book_id = %book.id, title = %book.title, "Book updated");
        Ok(book)
    }

    pub async fn archive_book(&self, id: Uuid) -> AppResult<Book> {
        let mut book = self.fetch_for_write(id).await?;
        book.archive(Utc::now());
        let book = self.store.save(&book).await.map_err(AppError::on_write_path)?;

        self.invalidate_lists().await;

        tracing::info!(book_id = %book.id, title = %book.title, "Book archived");
        Ok(book)
    }

    pub async fn restore_book(&self, id: Uuid) -> AppResult<Book> {
        let mut book = self.fetch_for_write(id).await?;
        book.restore();
        let book = self.store.save(&book).await.map_err(AppError::on_write_path)?;

        self.invalidate_lists().await;

        tracing::info!(book_id = %book.id, title = %book.title, "Book restored");
        Ok(book)
    }

    /// Permanently remove a book
    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        let book = self.get_book(id).await?;
        if !self.store.delete_one(id).await? {
            return Err(book_not_found());
        }

        self.invalidate_lists().await;

        tracing::info!(book_id = %id, title = %book.title, "Book deleted");
        Ok(())
    }

    /// Store connectivity, for health reporting
    pub async fn store_reachable(&self) -> bool {
        self.store.is_reachable().await
    }

    async fn fetch_for_write(&self, id: Uuid) -> AppResult<Book> {
        self.get_book(id).await.map_err(AppError::on_write_path)
    }

    // -------------------------------------------------------------------------
    // Best-effort side effects
    // -------------------------------------------------------------------------

    async fn cached_list(&self, key: &str) -> Option<Vec<Book>> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(books) => Some(books),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Cached book list is unreadable");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn cache_list(&self, key: &str, books: &[Book]) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let raw = match serde_json::to_string(books) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize book list for cache");
                return;
            }
        };
        if let Err(e) = cache.set_ex(key, &raw, LIST_CACHE_TTL_SECS).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    /// Drop every cached list, whatever filter produced it
    async fn invalidate_lists(&self) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let result = async {
            let keys = cache.keys(&list_cache_pattern()).await?;
            if !keys.is_empty() {
                cache.del(&keys).await?;
            }
            AppResult::Ok(keys.len())
        }
        .await;

        match result {
            Ok(cleared) => tracing::debug!(cleared, "List cache invalidated"),
            Err(e) => tracing::warn!(error = %e, "Cache clear failed"),
        }
    }

    /// Runs detached; the request does not wait on the publisher
    fn publish_created(&self, book: &Book) {
        let Some(publisher) = self.publisher.clone() else {
            return;
        };
        let payload = match serde_json::to_value(BookCreatedEvent::new(book, Utc::now())) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(book_id = %book.id, error = %e, "Failed to encode book event");
                return;
            }
        };
        let exchange = self.exchange.clone();
        let book_id = book.id;

        tokio::spawn(async move {
            if let Err(e) = publisher.publish(&exchange, BOOK_CREATED, &payload).await {
                tracing::warn!(book_id = %book_id, error = %e, "Event publishing failed");
            }
        });
    }
}
