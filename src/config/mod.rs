//! Process configuration, read once at startup and passed down.

pub mod ai;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::ingest::DEFAULT_FETCH_TIMEOUT;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub feed_timeout: Duration,
    /// `None` disables the background refresh task.
    pub refresh_interval: Option<Duration>,
    pub metrics_enabled: bool,
    pub ai_config_path: PathBuf,
    pub company_snapshot_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            feed_timeout: DEFAULT_FETCH_TIMEOUT,
            refresh_interval: None,
            metrics_enabled: false,
            ai_config_path: PathBuf::from("config/ai.json"),
            company_snapshot_path: PathBuf::from("data/company-snapshot.json"),
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(0) => None,
        Ok(n) => Some(Duration::from_secs(n)),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring non-numeric seconds value");
            None
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with `DATA_DIR`, `FEED_TIMEOUT_SECS`,
    /// `REFRESH_INTERVAL_SECS`, `METRICS_ENABLED`, `AI_CONFIG_PATH`,
    /// `COMPANY_SNAPSHOT_PATH`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("DATA_DIR") {
            cfg.data_dir = PathBuf::from(v);
        }
        if let Some(d) = env_secs("FEED_TIMEOUT_SECS") {
            cfg.feed_timeout = d;
        }
        cfg.refresh_interval = env_secs("REFRESH_INTERVAL_SECS");
        cfg.metrics_enabled = env::var("METRICS_ENABLED")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);
        if let Ok(v) = env::var("AI_CONFIG_PATH") {
            cfg.ai_config_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("COMPANY_SNAPSHOT_PATH") {
            cfg.company_snapshot_path = PathBuf::from(v);
        }
        cfg
    }
}
