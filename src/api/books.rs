//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::JsonBody;
use crate::{
    error::AppResult,
    models::book::{Book, BookFilter, BookInput, BookListQuery, Genre},
    services::catalog::parse_book_id,
};

/// Confirmation message
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Confirmation message with the affected book
#[derive(Serialize, ToSchema)]
pub struct BookActionResponse {
    pub message: String,
    pub book: Book,
}

/// List books
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    params(BookListQuery),
    responses(
        (status = 200, description = "Books, newest first", body = Vec<Book>),
        (status = 500, description = "Store failure")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookListQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state
        .services
        .catalog
        .list_books(&BookFilter::from(query))
        .await?;
    Ok(Json(books))
}

/// List valid genres
#[utoipa::path(
    get,
    path = "/api/books/genres",
    tag = "books",
    responses(
        (status = 200, description = "Genre names", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<crate::AppState>) -> Json<&'static [Genre]> {
    Json(state.services.catalog.genres())
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(parse_book_id(&id)?).await?;
    Ok(Json(book))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/api/books",
    tag = "books",
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Validation failed or duplicate ISBN")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    JsonBody(input): JsonBody<BookInput>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.catalog.create_book(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a book; absent fields keep their current value
#[utoipa::path(
    put,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book ID")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Validation failed or duplicate ISBN"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<BookInput>,
) -> AppResult<Json<Book>> {
    let updated = state
        .services
        .catalog
        .update_book(parse_book_id(&id)?, patch)
        .await?;
    Ok(Json(updated))
}

/// Archive a book
#[utoipa::path(
    put,
    path = "/api/books/{id}/archive",
    tag = "books",
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book archived", body = BookActionResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn archive_book(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BookActionResponse>> {
    let book = state
        .services
        .catalog
        .archive_book(parse_book_id(&id)?)
        .await?;
    Ok(Json(BookActionResponse {
        message: "Book archived successfully".to_string(),
        book,
    }))
}

/// Restore an archived book
#[utoipa::path(
    put,
    path = "/api/books/{id}/restore",
    tag = "books",
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book restored", body = BookActionResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn restore_book(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BookActionResponse>> {
    let book = state
        .services
        .catalog
        .restore_book(parse_book_id(&id)?)
        .await?;
    Ok(Json(BookActionResponse {
        message: "Book restored successfully".to_string(),
        book,
    }))
}

/// Permanently delete a book
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state
        .services
        .catalog
        .delete_book(parse_book_id(&id)?)
        .await?;
    Ok(Json(MessageResponse {
        message: "Book deleted permanently".to_string(),
    }))
}
