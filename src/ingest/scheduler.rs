//! Periodic background refresh.

use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::pipeline::RefreshPipeline;

/// Spawn a background task running one refresh per `interval`.
/// The first run fires immediately; a slow run delays the next tick instead
/// of overlapping it.
pub fn spawn_refresh_scheduler(pipeline: Arc<RefreshPipeline>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            counter!("refresh_runs_total").increment(1);
            match pipeline.run_once().await {
                Ok(r) => {
                    gauge!("refresh_last_success_ts").set(r.timestamp.timestamp() as f64);
                    tracing::info!(
                        target: "ingest",
                        fetched = r.fetched,
                        added = r.added,
                        analyzed = r.analyzed,
                        sources_failed = r.sources_failed,
                        "scheduled refresh tick"
                    );
                }
                Err(e) => {
                    counter!("refresh_failures_total").increment(1);
                    tracing::warn!(error = ?e, "scheduled refresh failed");
                }
            }
        }
    })
}
