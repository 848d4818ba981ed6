// tests/classify_pipeline.rs
mod common;

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{cache_in, hours_ago, record};
use treasury_intel::classify::ClassificationPipeline;
use treasury_intel::llm::{FnModel, ModelRequest, ModelResponse};
use treasury_intel::news::{Category, NewsRecord, Urgency};
use treasury_intel::store::NewsQuery;

/// Ids listed in the JSON array at the end of a classification prompt.
fn prompt_ids(req: &ModelRequest) -> Vec<String> {
    let prompt = req.messages[0].first_text().unwrap_or_default();
    let start = prompt.find("\n[").map(|i| i + 1).unwrap_or(0);
    let items: Vec<Value> = serde_json::from_str(&prompt[start..]).unwrap_or_default();
    items
        .iter()
        .filter_map(|v| v.get("id").and_then(Value::as_str).map(str::to_string))
        .collect()
}

fn annotate(ids: &[String], urgency: u8) -> String {
    let arr: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "id": id, "category": "liquidity", "urgency": urgency, "aiSummary": "Funding watch." }))
        .collect();
    Value::Array(arr).to_string()
}

fn seed(n: usize) -> Vec<NewsRecord> {
    let now = Utc::now();
    (0..n)
        .map(|i| record(&format!("https://c.test/{i}"), hours_ago(now, (i % 24) as i64), 3))
        .collect()
}

#[tokio::test]
async fn failed_batch_is_skipped_and_others_apply() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 2);
    cache.upsert(seed(60)).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let model = Arc::new(FnModel::new(move |req| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n == 1 {
            anyhow::bail!("HTTP 529 overloaded");
        }
        Ok(ModelResponse::text(annotate(&prompt_ids(req), 4)))
    }));
    let pipeline = ClassificationPipeline::new(model, cache.clone());

    let report = pipeline.run().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.selected, 60);
    assert_eq!(report.batches, 3);
    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.applied, 40);
    assert_eq!(cache.pending(100).unwrap().len(), 20);

    let classified = cache
        .query(&NewsQuery {
            category: Some(Category::Liquidity),
            ..NewsQuery::default()
        })
        .unwrap();
    assert_eq!(classified.len(), 40);
    assert!(classified.iter().all(|r| r.urgency == Urgency::new(4).unwrap()));
}

#[tokio::test]
async fn at_most_eighty_records_in_four_batches() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 2);
    cache.upsert(seed(95)).unwrap();

    let sizes = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = sizes.clone();
    let model = Arc::new(FnModel::new(move |req| {
        let ids = prompt_ids(req);
        seen.lock().unwrap().push(ids.len());
        Ok(ModelResponse::text(annotate(&ids, 2)))
    }));
    let report = ClassificationPipeline::new(model, cache.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(*sizes.lock().unwrap(), vec![20, 20, 20, 20]);
    assert_eq!(report.selected, 80);
    assert_eq!(report.applied, 80);
    assert_eq!(cache.pending(100).unwrap().len(), 15);
}

#[tokio::test]
async fn fenced_json_and_partial_answers_are_accepted() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 2);
    cache.upsert(seed(3)).unwrap();

    let model = Arc::new(FnModel::new(|req| {
        let ids = prompt_ids(req);
        let body = json!([
            { "id": ids[0], "category": "m&a", "urgency": 5, "aiSummary": "Deal risk." },
            { "id": ids[1], "category": "weather", "urgency": 11, "aiSummary": "Kept defaults." },
            { "id": ids[2], "category": "risk", "urgency": 2, "aiSummary": "   " }
        ]);
        Ok(ModelResponse::text(format!("```json\n{body}\n```")))
    }));
    let report = ClassificationPipeline::new(model, cache.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.applied, 2);
    assert_eq!(cache.pending(10).unwrap().len(), 1);

    let all = cache.query(&NewsQuery::default()).unwrap();
    let deal = all.iter().find(|r| r.category == Category::MergersAcquisitions).unwrap();
    assert_eq!(deal.urgency, Urgency::CRITICAL);
    let kept = all
        .iter()
        .find(|r| r.ai_summary.as_deref() == Some("Kept defaults."))
        .unwrap();
    assert_eq!(kept.category, Category::General);
    assert_eq!(kept.urgency, Urgency::MEDIUM);
}

#[tokio::test]
async fn nothing_pending_makes_no_model_call() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 2);
    let model = Arc::new(FnModel::new(|_| panic!("model should not be called")));

    let report = ClassificationPipeline::new(model, cache).run().await.unwrap();
    assert_eq!(report.batches, 0);
    assert_eq!(report.applied, 0);
}

#[tokio::test]
async fn each_batch_is_written_before_the_next_model_call() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache_in(tmp.path(), 2);
    cache.upsert(seed(40)).unwrap();

    let pending_seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = pending_seen.clone();
    let reader = cache.clone();
    let model = Arc::new(FnModel::new(move |req| {
        seen.lock().unwrap().push(reader.pending(100).unwrap().len());
        Ok(ModelResponse::text(annotate(&prompt_ids(req), 3)))
    }));
    let report = ClassificationPipeline::new(model, cache.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(*pending_seen.lock().unwrap(), vec![40, 20]);
    assert_eq!(report.applied, 40);
    assert!(cache.pending(100).unwrap().is_empty());
}
