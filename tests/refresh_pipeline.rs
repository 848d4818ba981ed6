// tests/refresh_pipeline.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{cache_in, StubProvider};
use treasury_intel::classify::ClassificationPipeline;
use treasury_intel::ingest::scheduler::spawn_refresh_scheduler;
use treasury_intel::ingest::types::RawEntry;
use treasury_intel::ingest::IngestEngine;
use treasury_intel::llm::{FnModel, ScriptedModel};
use treasury_intel::pipeline::RefreshPipeline;
use treasury_intel::store::NewsCache;

fn fresh(link: &str) -> RawEntry {
    RawEntry {
        title: Some(format!("Story {link}")),
        link: Some(link.to_string()),
        description: None,
        published: Some(chrono::Utc::now().to_rfc2822()),
    }
}

fn pipeline(cache: Arc<NewsCache>, model: treasury_intel::llm::DynModel) -> Arc<RefreshPipeline> {
    let engine = IngestEngine::new(
        vec![Arc::new(StubProvider::Entries(
            "Wire",
            vec![fresh("https://w.test/1"), fresh("https://w.test/2")],
        ))],
        Duration::from_secs(5),
    );
    Arc::new(RefreshPipeline::new(
        Arc::new(engine),
        cache.clone(),
        Arc::new(ClassificationPipeline::new(model, cache)),
    ))
}

#[tokio::test]
async fn raw_records_survive_a_classifier_outage() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 2);
    let dead = Arc::new(ScriptedModel::with_results(vec![Err("HTTP 503".into())]));

    let report = pipeline(cache.clone(), dead).run_once().await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(report.added, 2);
    assert_eq!(report.analyzed, 0);
    assert_eq!(report.classify.failed_batches, 1);
    assert_eq!(cache.pending(10).unwrap().len(), 2);
}

#[tokio::test]
async fn second_refresh_adds_nothing_new() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 2);
    let p = pipeline(cache.clone(), Arc::new(FnModel::offline()));

    let first = p.run_once().await.unwrap();
    let second = p.run_once().await.unwrap();

    assert_eq!(first.added, 2);
    assert_eq!(first.analyzed, 2);
    assert_eq!(second.fetched, 2);
    assert_eq!(second.added, 0);
    assert_eq!(second.analyzed, 0);
    assert_eq!(cache.stored_count().unwrap(), 2);
}

#[tokio::test]
async fn scheduler_runs_first_tick_immediately() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 2);
    let handle = spawn_refresh_scheduler(
        pipeline(cache.clone(), Arc::new(FnModel::offline())),
        Duration::from_secs(3600),
    );

    for _ in 0..100 {
        if cache.stored_count().unwrap() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.abort();
    assert_eq!(cache.stored_count().unwrap(), 2);
}
