use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::agent::tools::{NewsSearch, ToolDispatcher};
use crate::agent::{AgentConfig, AgentError, AnalystAgent, ChatMessage};
use crate::briefing::{BriefingError, BriefingService};
use crate::classify::ClassificationPipeline;
use crate::company::{CompanySnapshot, FileFinancials, FinancialsLookup};
use crate::config::ai::{build_client_from_config, AiConfig};
use crate::config::AppConfig;
use crate::ingest::config::load_sources_default;
use crate::ingest::providers::RssFeedProvider;
use crate::ingest::search::LiveNewsSearch;
use crate::ingest::sources::http_providers;
use crate::ingest::IngestEngine;
use crate::llm::DynModel;
use crate::news::{Briefing, Category, NewsRecord};
use crate::pipeline::{RefreshPipeline, RefreshReport};
use crate::store::{NewsCache, NewsQuery, Settings, SettingsPatch, SettingsStore, Stores};

pub const DEFAULT_NEWS_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub news: Arc<NewsCache>,
    pub settings: Arc<SettingsStore>,
    pub briefings: Arc<BriefingService>,
    pub agent: Arc<AnalystAgent>,
    pub refresh: Arc<RefreshPipeline>,
    pub financials: Option<Arc<dyn FinancialsLookup>>,
}

impl AppState {
    /// Wire every service over one set of stores.
    pub fn assemble(
        stores: Stores,
        engine: IngestEngine,
        model: DynModel,
        search: Arc<dyn NewsSearch>,
        financials: Option<Arc<dyn FinancialsLookup>>,
    ) -> Self {
        let Stores {
            settings,
            news,
            briefings: briefing_cache,
        } = stores;

        let classifier = Arc::new(ClassificationPipeline::new(model.clone(), news.clone()));
        let refresh = Arc::new(RefreshPipeline::new(
            Arc::new(engine),
            news.clone(),
            classifier,
        ));
        let briefings = Arc::new(BriefingService::new(
            model.clone(),
            news.clone(),
            briefing_cache.clone(),
        ));
        let tools = ToolDispatcher::new(search, financials.clone());
        let agent = Arc::new(AnalystAgent::new(
            model,
            news.clone(),
            briefing_cache,
            tools,
            AgentConfig::default(),
        ));

        Self {
            news,
            settings,
            briefings,
            agent,
            refresh,
            financials,
        }
    }

    /// Production wiring: sources registry, live HTTP feeds, configured model.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let sources = load_sources_default()?;
        let engine = IngestEngine::new(http_providers(sources, cfg.feed_timeout)?, cfg.feed_timeout);
        let model = build_client_from_config(&AiConfig::load_or_default(&cfg.ai_config_path));

        let stores = Stores::open(&cfg.data_dir);
        let search = Arc::new(LiveNewsSearch::new(
            RssFeedProvider::default_client(cfg.feed_timeout)?,
            stores.news.clone(),
        ));
        let financials = FileFinancials::load_optional(&cfg.company_snapshot_path)
            .map(|f| Arc::new(f) as Arc<dyn FinancialsLookup>);

        tracing::info!(
            data_dir = %cfg.data_dir.display(),
            sources = engine.source_count(),
            provider = model.provider_name(),
            financials = financials.is_some(),
            "app state ready"
        );
        Ok(Self::assemble(stores, engine, model, search, financials))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/news", get(list_news))
        .route("/api/news/refresh", post(refresh_news))
        .route("/api/briefing", get(get_briefing))
        .route("/api/chat", post(chat))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/company", get(get_company))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// JSON error body `{ "error", "detail" }` with a status.
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, detail: impl ToString) -> Self {
        Self {
            status,
            error,
            detail: detail.to_string(),
        }
    }

    fn internal(e: anyhow::Error) -> Self {
        tracing::error!(error = ?e, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error", format!("{e:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.error, "detail": self.detail })),
        )
            .into_response()
    }
}

impl From<BriefingError> for ApiError {
    fn from(e: BriefingError) -> Self {
        match e {
            BriefingError::NoSourceData => Self::new(
                StatusCode::NOT_FOUND,
                "No news items available. Run a news refresh first.",
                e,
            ),
            BriefingError::Model(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "Failed to generate briefing", e)
            }
            BriefingError::Store(inner) => Self::internal(inner),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::EmptyConversation => {
                Self::new(StatusCode::BAD_REQUEST, "messages required", e)
            }
            AgentError::Context(inner) => Self::internal(inner),
            _ => Self::new(StatusCode::BAD_GATEWAY, "Chat failed", e),
        }
    }
}

/// Run a store call off the async workers; the stores do blocking file I/O.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("store task failed: {e}")))?
        .map_err(ApiError::internal)
}

#[derive(Debug, Default, Deserialize)]
struct NewsParams {
    category: Option<String>,
    search: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct NewsList {
    items: Vec<NewsRecord>,
    count: usize,
}

async fn list_news(
    State(state): State<AppState>,
    Query(p): Query<NewsParams>,
) -> Result<Json<NewsList>, ApiError> {
    let category = match p.category.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(c) => Some(
            c.parse::<Category>()
                .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, "Invalid category", e))?,
        ),
    };
    let q = NewsQuery {
        category,
        search: p.search,
        limit: Some(match p.limit {
            None | Some(0) => DEFAULT_NEWS_LIMIT,
            Some(n) => n,
        }),
    };
    let news = state.news.clone();
    let items = blocking(move || news.query(&q)).await?;
    Ok(Json(NewsList {
        count: items.len(),
        items,
    }))
}

async fn refresh_news(State(state): State<AppState>) -> Result<Json<RefreshReport>, ApiError> {
    let report = state.refresh.run_once().await.map_err(ApiError::internal)?;
    if report.fetched == 0 {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "No news items fetched",
            format!("{} sources failed", report.sources_failed),
        ));
    }
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
struct BriefingParams {
    #[serde(default)]
    force: Option<String>,
}

async fn get_briefing(
    State(state): State<AppState>,
    Query(p): Query<BriefingParams>,
) -> Result<Json<Briefing>, ApiError> {
    let force = matches!(p.force.as_deref(), Some("true") | Some("1"));
    Ok(Json(state.briefings.today(force).await?))
}

#[derive(Debug, Deserialize)]
struct ChatReq {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatResp {
    reply: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatReq>,
) -> Result<Json<ChatResp>, ApiError> {
    let reply = state.agent.chat(&body.messages).await?;
    Ok(Json(ChatResp { reply }))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, ApiError> {
    let settings = state.settings.clone();
    Ok(Json(blocking(move || settings.get()).await?))
}

async fn put_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Settings>, ApiError> {
    let settings = state.settings.clone();
    let saved = blocking(move || settings.save_patch(patch)).await?;
    tracing::info!(news_feed_days = saved.news_feed_days, "settings updated");
    Ok(Json(saved))
}

async fn get_company(State(state): State<AppState>) -> Json<Option<CompanySnapshot>> {
    Json(state.financials.as_ref().and_then(|f| f.home()))
}
