// tests/metrics.rs
//
// The Prometheus router merges into the API router and renders the retention gauge.
// One test per binary: the recorder is process-global.

use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt as _;

use treasury_intel::agent::tools::NewsSearch;
use treasury_intel::ingest::IngestEngine;
use treasury_intel::llm::FnModel;
use treasury_intel::metrics::Metrics;
use treasury_intel::store::Stores;
use treasury_intel::{router, AppState};

struct NoSearch;

#[async_trait::async_trait]
impl NewsSearch for NoSearch {
    async fn search(&self, _query: &str) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::assemble(
        Stores::open(tmp.path()),
        IngestEngine::new(Vec::new(), Duration::from_secs(1)),
        Arc::new(FnModel::offline()),
        Arc::new(NoSearch),
        None,
    );
    let metrics = Metrics::init(7).expect("install recorder");
    let app = router(state).merge(metrics.router());

    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .expect("build GET /metrics");
    let resp = app.oneshot(req).await.expect("oneshot /metrics");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("news_retention_days 7"), "{text}");
}
