//! Treasury Intel Service: binary entrypoint.
//! Boots the Axum HTTP server: stores, ingestion, model client, analyst agent,
//! optional Prometheus `/metrics` and an optional background refresh task.

use shuttle_axum::ShuttleAxum;
use std::sync::Arc;

use treasury_intel::config::AppConfig;
use treasury_intel::ingest::scheduler::spawn_refresh_scheduler;
use treasury_intel::metrics::Metrics;
use treasury_intel::{init_tracing, router, AppState};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env();
    let state = AppState::from_config(&cfg)?;

    if let Some(every) = cfg.refresh_interval {
        tracing::info!(every_secs = every.as_secs(), "background refresh enabled");
        spawn_refresh_scheduler(Arc::clone(&state.refresh), every);
    }

    let retention = state.settings.get().map(|s| s.news_feed_days).unwrap_or_default();
    let mut app = router(state);
    if cfg.metrics_enabled {
        let metrics = Metrics::init(retention)?;
        app = app.merge(metrics.router());
    }

    Ok(app.into())
}
