//! RSS 2.0 feed provider.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::sources::Source;
use crate::ingest::types::{RawEntry, SourceProvider};
use crate::news::Category;

const USER_AGENT: &str = "TreasuryIntel/0.1 (RSS Reader)";
const ACCEPT: &str = "application/rss+xml, application/xml, text/xml";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Parse an RSS 2.0 document into raw entries, keeping at most `limit` items.
/// `link` falls back to `guid` when the item has no link.
pub fn parse_rss(xml: &str, limit: usize) -> Result<Vec<RawEntry>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    let out: Vec<RawEntry> = rss
        .channel
        .item
        .into_iter()
        .take(limit)
        .map(|it| RawEntry {
            title: it.title,
            link: it
                .link
                .filter(|l| !l.trim().is_empty())
                .or_else(|| it.guid.map(|g| g.value)),
            description: it.description,
            published: it.pub_date,
        })
        .collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_events_total").increment(out.len() as u64);
    Ok(out)
}

/// Feed provider for one registry entry: live HTTP or an in-memory fixture.
pub struct RssFeedProvider {
    source: Source,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RssFeedProvider {
    pub fn from_fixture(source: Source, xml: &str) -> Self {
        Self {
            source,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn http(source: Source, client: reqwest::Client) -> Self {
        Self {
            source,
            mode: Mode::Http { client },
        }
    }

    /// Client shared by every feed; the per-source deadline is enforced by the engine.
    pub fn default_client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building feed http client")
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String> {
        let resp = client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        resp.text().await.context("reading feed body")
    }
}

#[async_trait]
impl SourceProvider for RssFeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawEntry>> {
        match &self.mode {
            Mode::Fixture(s) => parse_rss(s, self.source.limit),
            Mode::Http { client } => {
                let body = Self::fetch_body(client, &self.source.url).await?;
                parse_rss(&body, self.source.limit)
                    .with_context(|| format!("feed {}", self.source.name))
            }
        }
    }

    fn name(&self) -> &str {
        &self.source.name
    }

    fn default_category(&self) -> Category {
        self.source.category
    }
}

/// HTML named entities that are not valid XML and would abort the parser.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
