//! Business logic services

pub mod cache;
pub mod catalog;
pub mod events;
pub mod redis;

use std::sync::Arc;

use crate::{config::EventsConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
}

impl Services {
    /// Wire services to the repository and, when available, Redis.
    ///
    /// Without Redis the catalog runs uncached and publishes no events.
    pub fn new(
        repository: Repository,
        redis_service: Option<redis::RedisService>,
        events_config: &EventsConfig,
    ) -> Self {
        let redis_service = redis_service.map(Arc::new);

        let cache = redis_service
            .clone()
            .map(|r| r as Arc<dyn cache::CacheClient>);
        let publisher = redis_service
            .filter(|_| events_config.enabled)
            .map(|r| r as Arc<dyn events::EventPublisher>);

        Self {
            catalog: catalog::CatalogService::new(
                Arc::new(repository.books),
                cache,
                publisher,
                events_config.exchange.clone(),
            ),
        }
    }
}
