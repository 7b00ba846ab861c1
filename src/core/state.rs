use std::sync::Arc;
use std::time::Duration;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::repositories::SubmissionStore;
use crate::services::catalog::AssessmentCatalog;
use crate::services::single_flight::FlightRegistry;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn SubmissionStore>,
    catalog: Arc<dyn AssessmentCatalog>,
    redis: RedisHandle,
    flights: FlightRegistry,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Arc<dyn SubmissionStore>,
        catalog: Arc<dyn AssessmentCatalog>,
        redis: RedisHandle,
    ) -> Self {
        let ttl = Duration::from_secs(settings.grading().lock_ttl_seconds);
        let flights = FlightRegistry::new(redis.clone(), ttl);
        Self { inner: Arc::new(InnerState { settings, store, catalog, redis, flights }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &dyn SubmissionStore {
        self.inner.store.as_ref()
    }

    pub(crate) fn catalog(&self) -> &dyn AssessmentCatalog {
        self.inner.catalog.as_ref()
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn flights(&self) -> &FlightRegistry {
        &self.inner.flights
    }
}
