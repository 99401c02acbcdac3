//! Data models for Lybook

pub mod book;

pub use book::{Book, BookFilter, BookInput, BookListQuery, Genre, NewBook};
