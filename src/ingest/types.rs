//! Raw feed entries, the provider trait and per-source outcomes.

use anyhow::Result;
use serde::Serialize;

use crate::news::Category;

/// One entry as it comes off a feed, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    /// Raw publish timestamp (RFC 2822 or RFC 3339).
    pub published: Option<String>,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawEntry>>;
    fn name(&self) -> &str;
    /// Provisional category for records from this source until classified.
    fn default_category(&self) -> Category;
}

/// How a single source fared during one `fetch_all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    Fetched { entries: usize },
    Failed { error: String },
    TimedOut { after_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    #[serde(flatten)]
    pub status: FetchStatus,
}

impl SourceOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self.status, FetchStatus::Fetched { .. })
    }
}
