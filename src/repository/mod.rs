//! Repository layer for database operations

pub mod books;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilter, NewBook},
};

/// Persistence seam for book records
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Books matching `filter`, newest first
    async fn find(&self, filter: &BookFilter) -> AppResult<Vec<Book>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// Insert a new book; duplicate ISBN fails with `AppError::DuplicateKey`
    async fn insert(&self, book: &NewBook) -> AppResult<Book>;

    /// Persist every mutable field of `book` and return the stored record
    async fn save(&self, book: &Book) -> AppResult<Book>;

    /// Returns false when no row was removed
    async fn delete_one(&self, id: Uuid) -> AppResult<bool>;

    /// Connectivity check for health reporting
    async fn is_reachable(&self) -> bool;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pool: Pool<Postgres>,
    pub books: books::BooksRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            pool,
        }
    }

    /// Wait until a connection can be opened, retrying every `retry_interval`
    pub async fn wait_until_reachable(&self, retry_interval: Duration) {
        let mut attempt: u32 = 1;
        loop {
            match self.pool.acquire().await {
                Ok(_) => {
                    tracing::info!(attempt, "Connected to database");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        error = %e,
                        retry_in_secs = retry_interval.as_secs_f64(),
                        "Database unreachable, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to run database migrations: {}", e)))?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}
