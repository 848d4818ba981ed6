//! # Source registry
//! Static list of direct feeds plus parameterized Google News searches, each
//! tagged with the category records get before classification.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::ingest::providers::RssFeedProvider;
use crate::ingest::types::SourceProvider;
use crate::news::Category;

pub const DIRECT_FEED_LIMIT: usize = 10;
pub const SEARCH_FEED_LIMIT: usize = 8;

pub const GOOGLE_NEWS_RSS: &str = "https://news.google.com/rss/search";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    pub category: Category,
    /// Max items taken from one fetch of this feed.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DIRECT_FEED_LIMIT
}

impl Source {
    pub fn feed(name: &str, url: &str, category: Category) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            category,
            limit: DIRECT_FEED_LIMIT,
        }
    }

    /// Google News search feed for `query` (plain words, encoded here).
    pub fn search(label: &str, query: &str, category: Category) -> Result<Self> {
        Ok(Self {
            name: format!("Google News – {label}"),
            url: google_news_url(query)?,
            category,
            limit: SEARCH_FEED_LIMIT,
        })
    }
}

pub fn google_news_url(query: &str) -> Result<String> {
    search_url(GOOGLE_NEWS_RSS, query)
}

/// Google News style search URL against `base` (overridable for tests).
pub fn search_url(base: &str, query: &str) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        base,
        &[
            ("q", query),
            ("hl", "en-US"),
            ("gl", "US"),
            ("ceid", "US:en"),
        ],
    )
    .with_context(|| format!("building search url for {query:?}"))?;
    Ok(url.to_string())
}

const DIRECT_FEEDS: &[(&str, &str, Category)] = &[
    (
        "Reuters Business",
        "https://feeds.reuters.com/reuters/businessNews",
        Category::Macro,
    ),
    (
        "CNBC Markets",
        "https://www.cnbc.com/id/10000664/device/rss/rss.html",
        Category::Macro,
    ),
    (
        "MarketWatch",
        "https://feeds.marketwatch.com/marketwatch/topstories/",
        Category::Macro,
    ),
    ("Financial Times", "https://www.ft.com/rss/home", Category::General),
    (
        "Barron's",
        "https://www.barrons.com/xml/rss/3_7551.xml",
        Category::General,
    ),
    (
        "Investopedia",
        "https://www.investopedia.com/feedbuilder/feed/getfeed/?feedName=rss_headline",
        Category::General,
    ),
];

const SEARCH_QUERIES: &[(&str, &str, Category)] = &[
    ("Liquidity & Cash", "treasury cash management liquidity", Category::Liquidity),
    ("Capital Markets", "capital markets corporate bonds debt", Category::CapitalMarkets),
    ("FX & Rates", "interest rates FX currency exchange", Category::FxRates),
    ("Credit Ratings", "credit rating Moodys SP Fitch downgrade", Category::CreditRatings),
    ("M&A", "mergers acquisitions M&A deal", Category::MergersAcquisitions),
    ("Risk", "counterparty risk bank failure systemic", Category::Risk),
    ("Macro", "federal reserve central bank inflation GDP", Category::Macro),
    ("Pensions", "pension fund defined benefit retirement", Category::Pensions),
    ("Geopolitical", "geopolitical risk sanctions regional conflict", Category::Geopolitical),
    ("Insurance", "insurance corporate risk coverage", Category::Risk),
];

/// Built-in registry: direct feeds first, then search queries.
pub fn builtin_sources() -> Vec<Source> {
    let mut out: Vec<Source> = DIRECT_FEEDS
        .iter()
        .map(|(name, url, cat)| Source::feed(name, url, *cat))
        .collect();
    for (label, query, cat) in SEARCH_QUERIES {
        match Source::search(label, query, *cat) {
            Ok(s) => out.push(s),
            Err(e) => tracing::warn!(error = ?e, label, "skipping search source"),
        }
    }
    out
}

/// Wrap registry entries as live HTTP providers sharing one client.
pub fn http_providers(
    sources: Vec<Source>,
    timeout: Duration,
) -> Result<Vec<Arc<dyn SourceProvider>>> {
    let client = RssFeedProvider::default_client(timeout)?;
    Ok(sources
        .into_iter()
        .map(|s| Arc::new(RssFeedProvider::http(s, client.clone())) as Arc<dyn SourceProvider>)
        .collect())
}
