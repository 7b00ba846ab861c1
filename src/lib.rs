pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio::sync::watch;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::repositories::PgSubmissionStore;
use crate::services::catalog::HttpAssessmentCatalog;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;
    let store = Arc::new(PgSubmissionStore::new(db_pool));
    let catalog = Arc::new(HttpAssessmentCatalog::from_settings(&settings)?);

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; submission leases stay local");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let state = AppState::new(settings, store, catalog, redis.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background = tasks::scheduler::spawn(state.clone(), shutdown_rx);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Gradeflow API listening"
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(core::shutdown::shutdown_and_notify(shutdown_tx))
        .await;

    tasks::scheduler::join(background).await;
    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
