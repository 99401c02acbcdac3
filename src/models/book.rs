//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Genre
// ---------------------------------------------------------------------------

/// Book genre classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Genre {
    Fiction,
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    #[serde(rename = "Science Fiction")]
    ScienceFiction,
    Fantasy,
    Mystery,
    Thriller,
    Romance,
    Horror,
    Biography,
    History,
    #[serde(rename = "Self-Help")]
    SelfHelp,
    Poetry,
    Children,
    #[serde(rename = "Young Adult")]
    YoungAdult,
    Other,
}

impl Genre {
    /// Every valid genre, in display order
    pub const ALL: [Genre; 15] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::ScienceFiction,
        Genre::Fantasy,
        Genre::Mystery,
        Genre::Thriller,
        Genre::Romance,
        Genre::Horror,
        Genre::Biography,
        Genre::History,
        Genre::SelfHelp,
        Genre::Poetry,
        Genre::Children,
        Genre::YoungAdult,
        Genre::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::ScienceFiction => "Science Fiction",
            Genre::Fantasy => "Fantasy",
            Genre::Mystery => "Mystery",
            Genre::Thriller => "Thriller",
            Genre::Romance => "Romance",
            Genre::Horror => "Horror",
            Genre::Biography => "Biography",
            Genre::History => "History",
            Genre::SelfHelp => "Self-Help",
            Genre::Poetry => "Poetry",
            Genre::Children => "Children",
            Genre::YoungAdult => "Young Adult",
            Genre::Other => "Other",
        }
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("`{0}` is not a valid genre")]
pub struct UnknownGenre(pub String);

impl std::str::FromStr for Genre {
    type Err = UnknownGenre;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGenre(s.to_string()))
    }
}

impl TryFrom<String> for Genre {
    type Error = UnknownGenre;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

/// Book record as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    #[sqlx(try_from = "String")]
    pub genre: Genre,
    /// Unique when present
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub is_archived: bool,
    /// Set iff `is_archived`
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Mark as archived; an archived book gets a fresh timestamp.
    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.is_archived = true;
        self.archived_at = Some(now);
    }

    pub fn restore(&mut self) {
        self.is_archived = false;
        self.archived_at = None;
    }

    /// Shallow-merge `patch` over this book's editable fields, re-validating
    /// the result. Archival state and timestamps are left untouched.
    pub fn merge(&mut self, patch: BookInput) -> AppResult<()> {
        let merged = BookInput {
            title: patch.title.or_else(|| Some(self.title.clone())),
            author: patch.author.or_else(|| Some(self.author.clone())),
            genre: patch.genre.or_else(|| Some(self.genre.as_str().to_string())),
            isbn: patch.isbn.or_else(|| self.isbn.clone()),
            description: patch.description.or_else(|| self.description.clone()),
        };
        let fields = merged.into_new_book()?;

        self.title = fields.title;
        self.author = fields.author;
        self.genre = fields.genre;
        self.isbn = fields.isbn;
        self.description = fields.description;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Book payload accepted by create and update.
///
/// Every field is optional at the wire level so that create can report all
/// missing fields at once and update can carry a partial document.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(required(message = "Title is required"))]
    pub title: Option<String>,
    #[validate(required(message = "Author is required"))]
    pub author: Option<String>,
    #[validate(
        required(message = "Genre is required"),
        custom(function = "known_genre")
    )]
    pub genre: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
}

fn known_genre(value: &str) -> Result<(), ValidationError> {
    value.parse::<Genre>().map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("genre");
        err.message = Some(e.to_string().into());
        err
    })
}

/// Validated fields for a book about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: Option<String>,
    pub description: Option<String>,
}

impl BookInput {
    /// Validate and convert, aggregating every field error.
    ///
    /// Blank strings count as missing.
    pub fn into_new_book(self) -> AppResult<NewBook> {
        let input = BookInput {
            title: non_blank(self.title),
            author: non_blank(self.author),
            genre: non_blank(self.genre),
            isbn: non_blank(self.isbn),
            description: self.description,
        };

        if let Err(errors) = input.validate() {
            let mut messages: Vec<String> = errors
                .field_errors()
                .into_iter()
                .flat_map(|(field, errs)| {
                    errs.iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| format!("{} is invalid", field))
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
            messages.sort();
            messages.dedup();
            return Err(AppError::Validation(messages));
        }

        let genre = input
            .genre
            .as_deref()
            .unwrap_or_default()
            .parse::<Genre>()
            .map_err(|e| AppError::Validation(vec![e.to_string()]))?;

        Ok(NewBook {
            title: input.title.unwrap_or_default(),
            author: input.author.unwrap_or_default(),
            genre,
            isbn: input.isbn,
            description: input.description,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Query parameters for `GET /books`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookListQuery {
    /// Exact genre match
    pub genre: Option<String>,
    /// `true` lists archived books only; anything else lists active books
    pub is_archived: Option<String>,
}

/// Store-level filter for listing books
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub genre: Option<String>,
    /// Archived books only when true, active books only otherwise
    pub include_archived: bool,
}

impl From<BookListQuery> for BookFilter {
    fn from(query: BookListQuery) -> Self {
        Self {
            genre: query.genre.filter(|g| !g.is_empty()),
            include_archived: query.is_archived.as_deref() == Some("true"),
        }
    }
}

impl BookFilter {
    /// Whether a book belongs in this filter's result set
    pub fn matches(&self, book: &Book) -> bool {
        book.is_archived == self.include_archived
            && self
                .genre
                .as_deref()
                .map_or(true, |g| book.genre.as_str() == g)
    }
}
