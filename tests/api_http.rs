// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets,
// driven through tower::ServiceExt::oneshot over a temp data directory.

mod common;

use async_trait::async_trait;
use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt as _;

use common::StubProvider;
use treasury_intel::agent::tools::NewsSearch;
use treasury_intel::company::{CompanySnapshot, FileFinancials, FinancialsLookup};
use treasury_intel::ingest::types::{RawEntry, SourceProvider};
use treasury_intel::ingest::IngestEngine;
use treasury_intel::llm::FnModel;
use treasury_intel::store::Stores;
use treasury_intel::{router, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

struct NoSearch;

#[async_trait]
impl NewsSearch for NoSearch {
    async fn search(&self, query: &str) -> anyhow::Result<String> {
        Ok(format!("No recent news found for \"{query}\"."))
    }
}

fn fresh(title: &str, link: &str) -> RawEntry {
    RawEntry {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        description: Some(format!("{title} details")),
        published: Some(chrono::Utc::now().to_rfc2822()),
    }
}

fn app_with(
    dir: &std::path::Path,
    providers: Vec<Arc<dyn SourceProvider>>,
    financials: Option<Arc<dyn FinancialsLookup>>,
) -> Router {
    let state = AppState::assemble(
        Stores::open(dir),
        IngestEngine::new(providers, Duration::from_secs(5)),
        Arc::new(FnModel::offline()),
        Arc::new(NoSearch),
        financials,
    );
    router(state)
}

fn working_feed() -> Vec<Arc<dyn SourceProvider>> {
    vec![
        Arc::new(StubProvider::Entries(
            "Wire",
            vec![
                fresh("ECB holds rates", "https://wire.test/ecb"),
                fresh("Treasury yields jump", "https://wire.test/yields"),
            ],
        )),
        Arc::new(StubProvider::Fails("Broken")),
    ]
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Json>) -> (StatusCode, Json) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, json)
}

#[tokio::test]
async fn health_returns_ok_text() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(tmp.path(), Vec::new(), None);

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "OK");
}

#[tokio::test]
async fn refresh_then_list_then_briefing() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(tmp.path(), working_feed(), None);

    let (status, report) = send(&app, "POST", "/api/news/refresh", None).await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["fetched"], 2);
    assert_eq!(report["added"], 2);
    assert_eq!(report["analyzed"], 2);
    assert_eq!(report["sourcesFailed"], 1);

    let (status, list) = send(&app, "GET", "/api/news?category=general&limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);
    assert_eq!(list["items"][0]["aiSummary"], "Offline classification (mock).");

    let (_, searched) = send(&app, "GET", "/api/news?search=ECB", None).await;
    assert_eq!(searched["count"], 1);
    assert_eq!(searched["items"][0]["sourceUrl"], "https://wire.test/ecb");

    let (status, briefing) = send(&app, "GET", "/api/briefing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(briefing["content"], "Neutral treasury outlook (mock).");
    assert!(briefing["date"].is_string());

    let (status, again) = send(&app, "GET", "/api/briefing?force=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(again["generatedAt"], briefing["generatedAt"]);
}

#[tokio::test]
async fn refresh_with_every_source_down_is_503() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(
        tmp.path(),
        vec![Arc::new(StubProvider::Fails("A")), Arc::new(StubProvider::Fails("B"))],
        None,
    );

    let (status, body) = send(&app, "POST", "/api/news/refresh", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "No news items fetched");
    assert!(!tmp.path().join("news.json").exists());
}

#[tokio::test]
async fn briefing_on_empty_cache_is_404() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(tmp.path(), Vec::new(), None);

    let (status, body) = send(&app, "GET", "/api/briefing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("news refresh"));
}

#[tokio::test]
async fn bad_category_is_400() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(tmp.path(), Vec::new(), None);

    let (status, _) = send(&app, "GET", "/api/news?category=crypto", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, all) = send(&app, "GET", "/api/news?category=all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["count"], 0);
}

#[tokio::test]
async fn chat_replies_and_rejects_empty_history() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(tmp.path(), Vec::new(), None);

    let (status, reply) = send(
        &app,
        "POST",
        "/api/chat",
        Some(json!({ "messages": [{ "role": "user", "content": "Any FX risk today?" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["reply"], "Neutral treasury outlook (mock).");

    let (status, _) = send(&app, "POST", "/api/chat", Some(json!({ "messages": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settings_round_trip_and_clamp() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(tmp.path(), Vec::new(), None);

    let (status, s) = send(&app, "GET", "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(s["newsFeedDays"], 2);

    let (status, s) = send(&app, "PUT", "/api/settings", Some(json!({ "newsFeedDays": 7 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(s["newsFeedDays"], 7);

    let (_, s) = send(&app, "PUT", "/api/settings", Some(json!({ "newsFeedDays": 400 }))).await;
    assert_eq!(s["newsFeedDays"], 30);

    let (_, s) = send(&app, "GET", "/api/settings", None).await;
    assert_eq!(s["newsFeedDays"], 30);
}

#[tokio::test]
async fn company_is_null_without_snapshot_and_home_with_one() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(tmp.path(), Vec::new(), None);
    let (status, body) = send(&app, "GET", "/api/company", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());

    let financials: Arc<dyn FinancialsLookup> = Arc::new(FileFinancials::new(vec![CompanySnapshot {
        ticker: "GEHC".into(),
        name: "GE HealthCare Technologies".into(),
        ..CompanySnapshot::default()
    }]));
    let app = app_with(tmp.path(), Vec::new(), Some(financials));
    let (_, body) = send(&app, "GET", "/api/company", None).await;
    assert_eq!(body["ticker"], "GEHC");
}

#[tokio::test]
async fn zero_limit_means_default_limit() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(tmp.path(), working_feed(), None);
    let (status, _) = send(&app, "POST", "/api/news/refresh", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = send(&app, "GET", "/api/news?limit=0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_store_requests_all_complete() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app_with(tmp.path(), working_feed(), None);
    let (status, _) = send(&app, "POST", "/api/news/refresh", None).await;
    assert_eq!(status, StatusCode::OK);

    let reads = (0..8).map(|_| send(&app, "GET", "/api/news", None));
    let writes = (1..=4).map(|d| {
        send(&app, "PUT", "/api/settings", Some(json!({ "newsFeedDays": d + 1 })))
    });
    let (reads, writes) = tokio::join!(
        futures::future::join_all(reads),
        futures::future::join_all(writes)
    );

    assert!(reads.iter().all(|(s, body)| *s == StatusCode::OK && body["count"] == 2));
    assert!(writes.iter().all(|(s, _)| *s == StatusCode::OK));
    let (_, s) = send(&app, "GET", "/api/settings", None).await;
    assert!((2..=5).contains(&s["newsFeedDays"].as_u64().unwrap()));
}
