//! API handlers for Lybook REST endpoints

pub mod books;
pub mod health;
pub mod openapi;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    config::{CorsConfig, RateLimitConfig},
    error::{AppError, AppResult},
    metrics, AppState,
};

/// JSON request body; unreadable bodies are rejected with the API error body
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    let api = Router::new()
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/genres", get(books::list_genres))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/books/:id/archive", put(books::archive_book))
        .route("/books/:id/restore", put(books::restore_book));

    let mut router = Router::new()
        .nest("/api", api)
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::serve_metrics))
        .with_state(state)
        .merge(openapi::create_openapi_router())
        .layer(middleware::from_fn(metrics::metrics_middleware));

    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ));
    }

    router.layer(TraceLayer::new_for_http()).layer(cors)
}

/// Hardening headers added to every response unless a handler set them
const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::X_DNS_PREFETCH_CONTROL, "off"),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=15552000; includeSubDomains",
    ),
];

/// Per-peer-IP rate limiting with `x-ratelimit-*` response headers.
///
/// Needs the peer address, so the router must be served with connect info.
pub fn with_rate_limit(router: Router, config: &RateLimitConfig) -> AppResult<Router> {
    let governor_config = GovernorConfigBuilder::default()
        .per_millisecond(config.replenish_interval_ms)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .ok_or_else(|| AppError::Internal("Invalid rate limit configuration".to_string()))?;

    // The layer borrows its configuration for the lifetime of the process
    let governor_config = Box::leak(Box::new(governor_config));

    Ok(router.layer(GovernorLayer {
        config: governor_config,
    }))
}

/// An empty origin list mirrors the caller's origin
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
