//! Books repository (PostgreSQL)

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilter, NewBook},
};

/// Rows inserted before `is_archived` existed hold NULL there; they read as active.
const BOOK_COLUMNS: &str = "id, title, author, genre, isbn, description, \
     COALESCE(is_archived, FALSE) AS is_archived, archived_at, created_at, updated_at";

pub const DUPLICATE_ISBN_MESSAGE: &str = "Book with this ISBN already exists";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Build the WHERE clause for a listing filter.
///
/// Active listings use `IS NOT TRUE` so that both FALSE and NULL match.
fn where_clause(filter: &BookFilter) -> String {
    let mut conditions = vec![if filter.include_archived {
        "is_archived = TRUE".to_string()
    } else {
        "is_archived IS NOT TRUE".to_string()
    }];
    if filter.genre.is_some() {
        conditions.push("genre = $1".to_string());
    }
    format!("WHERE {}", conditions.join(" AND "))
}

fn map_write_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::DuplicateKey(DUPLICATE_ISBN_MESSAGE.to_string())
        }
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn find(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let query = format!(
            "SELECT {} FROM books {} ORDER BY created_at DESC",
            BOOK_COLUMNS,
            where_clause(filter)
        );

        let mut builder = sqlx::query_as::<_, Book>(&query);
        if let Some(ref genre) = filter.genre {
            builder = builder.bind(genre);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let query = format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS);
        let row = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, book: &NewBook) -> AppResult<Book> {
        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO books (id, title, author, genre, isbn, description, is_archived, archived_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, NULL, $7, $7)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );

        sqlx::query_as::<_, Book>(&query)
            .bind(Uuid::new_v4())
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.genre.as_str())
            .bind(&book.isbn)
            .bind(&book.description)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn save(&self, book: &Book) -> AppResult<Book> {
        let query = format!(
            r#"
            UPDATE books
            SET title = $2, author = $3, genre = $4, isbn = $5, description = $6,
                is_archived = $7, archived_at = $8, updated_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );

        sqlx::query_as::<_, Book>(&query)
            .bind(book.id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.genre.as_str())
            .bind(&book.isbn)
            .bind(&book.description)
            .bind(book.is_archived)
            .bind(book.archived_at)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    async fn delete_one(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_reachable(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
