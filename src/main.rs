//! Lybook Server - Book Catalog
//!
//! REST API server for the library book catalog.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use lybook_server::{
    api,
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics,
    repository::Repository,
    services::{redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Kept alive for the lifetime of the process so buffered log lines are flushed
    let _log_guard = init_tracing(&config.logging)?;

    tracing::info!("Starting Lybook Server v{}", env!("CARGO_PKG_VERSION"));

    metrics::init_metrics();

    // Connections are opened on demand; the server starts even if the database is down
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect_lazy(&config.database.url)
        .context("Invalid database URL")?;

    let repository = Repository::new(pool);

    let migrator = repository.clone();
    let retry_interval = Duration::from_secs(config.database.retry_interval_secs);
    tokio::spawn(async move {
        migrator.wait_until_reachable(retry_interval).await;
        if let Err(e) = migrator.migrate().await {
            tracing::error!("{}", e);
        }
    });

    // Redis is optional: without it the catalog runs uncached and silent
    let redis_service = if config.redis.enabled {
        match RedisService::new(&config.redis.url).await {
            Ok(service) => {
                tracing::info!("Connected to Redis");
                Some(service)
            }
            Err(e) => {
                tracing::error!("Redis connection failed, continuing without cache and events: {}", e);
                None
            }
        }
    } else {
        tracing::info!("Redis disabled by configuration");
        None
    };

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let services = Services::new(repository, redis_service, &config.events);
    let rate_limit = config.rate_limit.clone();

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        started_at: Instant::now(),
    };

    let app = api::with_rate_limit(api::create_router(state), &rate_limit)
        .context("Failed to configure rate limiting")?;

    let addr = SocketAddr::new(
        server_host.parse().context("Invalid host address")?,
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Install the global subscriber: stdout plus an optional log file
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("lybook_server={},tower_http=debug", logging.level).into()
    });

    let stdout_layer = match logging.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    let (file_layer, guard) = match logging.file.as_deref() {
        Some(path) => {
            let path = std::path::Path::new(path);
            let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
