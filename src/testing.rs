//! In-memory collaborators for service and router tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilter, BookInput, NewBook},
    repository::{books::DUPLICATE_ISBN_MESSAGE, BookStore},
    services::{cache::CacheClient, events::EventPublisher},
};

pub fn book_input(title: &str, author: &str, genre: &str, isbn: Option<&str>) -> BookInput {
    BookInput {
        title: Some(title.to_string()),
        author: Some(author.to_string()),
        genre: Some(genre.to_string()),
        isbn: isbn.map(str::to_string),
        description: None,
    }
}

/// Stored row; `archive_flag` is tri-state like the database column
struct Row {
    book: Book,
    archive_flag: Option<bool>,
}

impl Row {
    fn read(&self) -> Book {
        let mut book = self.book.clone();
        book.is_archived = self.archive_flag.unwrap_or(false);
        book
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<Row>>,
    find_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Simulate a row written before the archive flag existed
    pub fn clear_archive_flag(&self, id: Uuid) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.book.id == id) {
            row.archive_flag = None;
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn isbn_taken(rows: &[Row], isbn: Option<&str>, except: Option<Uuid>) -> bool {
        isbn.is_some_and(|isbn| {
            rows.iter()
                .any(|r| r.book.isbn.as_deref() == Some(isbn) && Some(r.book.id) != except)
        })
    }
}

#[async_trait]
impl BookStore for InMemoryStore {
    async fn find(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap();
        let mut books: Vec<Book> = rows
            .iter()
            .rev()
            .filter(|r| (r.archive_flag == Some(true)) == filter.include_archived)
            .map(Row::read)
            .filter(|b| filter.matches(b))
            .collect();
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(books)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.book.id == id).map(Row::read))
    }

    async fn insert(&self, book: &NewBook) -> AppResult<Book> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        if Self::isbn_taken(&rows, book.isbn.as_deref(), None) {
            return Err(AppError::DuplicateKey(DUPLICATE_ISBN_MESSAGE.to_string()));
        }
        let now = Utc::now();
        let stored = Book {
            id: Uuid::new_v4(),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre,
            isbn: book.isbn.clone(),
            description: book.description.clone(),
            is_archived: false,
            archived_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(Row {
            book: stored.clone(),
            archive_flag: Some(false),
        });
        Ok(stored)
    }

    async fn save(&self, book: &Book) -> AppResult<Book> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        if Self::isbn_taken(&rows, book.isbn.as_deref(), Some(book.id)) {
            return Err(AppError::DuplicateKey(DUPLICATE_ISBN_MESSAGE.to_string()));
        }
        let row = rows
            .iter_mut()
            .find(|r| r.book.id == book.id)
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        row.book = Book {
            updated_at: Utc::now(),
            ..book.clone()
        };
        row.archive_flag = Some(book.is_archived);
        Ok(row.read())
    }

    async fn delete_one(&self, id: Uuid) -> AppResult<bool> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.book.id != id);
        Ok(rows.len() < before)
    }

    async fn is_reachable(&self) -> bool {
        !self.fail_writes.load(Ordering::SeqCst)
    }
}

/// Cache double honouring `prefix*` patterns
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (String, u64)>>,
}

impl InMemoryCache {
    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), 0));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    /// Number of list-cache entries
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with("books:"))
            .count()
    }
}

#[async_trait]
impl CacheClient for InMemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl_secs));
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> AppResult<Vec<String>> {
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn del(&self, keys: &[String]) -> AppResult<()> {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

type PublishedEvent = (String, String, serde_json::Value);

/// Publisher double that forwards every event to a channel
pub struct RecordingPublisher {
    tx: mpsc::UnboundedSender<PublishedEvent>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PublishedEvent>>,
}

impl Default for RecordingPublisher {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }
}

impl RecordingPublisher {
    pub async fn next_event(&self, wait: Duration) -> Option<PublishedEvent> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> AppResult<()> {
        self.tx
            .send((exchange.to_string(), routing_key.to_string(), payload.clone()))
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}
