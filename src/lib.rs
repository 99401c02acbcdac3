//! Lybook Book Catalog
//!
//! REST JSON API for a book catalog backed by PostgreSQL, with a Redis
//! read-through cache for listings and Redis pub/sub notifications on writes.

use std::sync::Arc;
use std::time::Instant;

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub started_at: Instant,
}
