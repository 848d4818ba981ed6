//! Public library surface for the service binary, the refresh CLI and
//! integration tests.

pub mod agent;
pub mod api;
pub mod briefing;
pub mod cash;
pub mod classify;
pub mod company;
pub mod config;
pub mod ingest;
pub mod llm;
pub mod metrics;
pub mod news;
pub mod pipeline;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::news::{Briefing, Category, NewsRecord, Urgency};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a compact tracing subscriber filtered by `RUST_LOG`
/// (default `treasury_intel=info,warn`). Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("treasury_intel=info,warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
