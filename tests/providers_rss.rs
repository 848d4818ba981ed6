// tests/providers_rss.rs
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use treasury_intel::ingest::providers::RssFeedProvider;
use treasury_intel::ingest::sources::Source;
use treasury_intel::ingest::types::SourceProvider;
use treasury_intel::ingest::{normalize_entry, UNTITLED};
use treasury_intel::news::Category;

const MARKETS_XML: &str = include_str!("fixtures/markets_rss.xml");
const INTERLEAVED_XML: &str = include_str!("fixtures/interleaved_rss.xml");

#[tokio::test]
async fn fixture_provider_parses_and_normalizes() {
    let src = Source::feed("Markets", "https://markets.test/rss", Category::Macro);
    let provider = RssFeedProvider::from_fixture(src, MARKETS_XML);

    let items = provider.fetch_latest().await.expect("fixture parses");
    assert_eq!(items.len(), 4);

    let now = chrono::Utc::now();
    let recs: Vec<_> = items
        .into_iter()
        .map(|e| normalize_entry(e, provider.name(), provider.default_category(), now))
        .collect();

    assert_eq!(
        recs[0].description,
        "The Federal Reserve left its policy rate unchanged & flagged data dependence."
    );
    assert_eq!(recs[0].published_at.to_rfc3339(), "2025-06-10T14:30:00+00:00");
    assert_eq!(recs[1].source_url, "https://markets.test/bank-slide");
    assert_eq!(recs[2].title, UNTITLED);
    assert_eq!(recs[2].source_url, "https://markets.test/untitled");
    assert_eq!(recs[2].published_at, now);
    assert_eq!(recs[3].source_url, "");
    assert!(recs.iter().all(|r| r.category == Category::Macro));
}

#[tokio::test]
async fn http_provider_fetches_and_limits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MARKETS_XML))
        .mount(&server)
        .await;

    let mut src = Source::feed("Markets", &format!("{}/rss", server.uri()), Category::Macro);
    src.limit = 2;
    let client = RssFeedProvider::default_client(Duration::from_secs(5)).unwrap();
    let provider = RssFeedProvider::http(src, client);

    let items = provider.fetch_latest().await.expect("http fetch ok");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].link.as_deref(), Some("https://markets.test/fed-holds"));
}

#[tokio::test]
async fn http_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let src = Source::feed("Down", &format!("{}/rss", server.uri()), Category::General);
    let client = RssFeedProvider::default_client(Duration::from_secs(5)).unwrap();
    let provider = RssFeedProvider::http(src, client);
    assert!(provider.fetch_latest().await.is_err());
}

#[tokio::test]
async fn feed_with_elements_between_items_keeps_every_item() {
    let src = Source::feed("Rates Desk", "https://rates.test/rss", Category::FxRates);
    let provider = RssFeedProvider::from_fixture(src, INTERLEAVED_XML);

    let items = provider.fetch_latest().await.expect("interleaved feed parses");
    let links: Vec<_> = items.iter().filter_map(|e| e.link.as_deref()).collect();
    assert_eq!(
        links,
        vec![
            "https://rates.test/bund-auction",
            "https://rates.test/swap-spreads",
            "https://rates.test/jgb-curve",
        ]
    );
}
