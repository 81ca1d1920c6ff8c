// src/api.rs
use std::collections::BTreeMap;

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::error::{NewsError, NewsResult};
use crate::geo::{validate_location, GeoPoint};
use crate::models::{
    ArticleResponse, Entities, Intent, IntentResponse, NamedEntities, TrendingResult,
};
use crate::news::{FetchParams, FetchResult};
use crate::state::AppState;
use crate::store::ArticleStats;
use crate::trending::TrendingStats;

pub const CACHE_HEADER: HeaderName = HeaderName::from_static("x-trending-cache");

/// `Query` whose rejections come back as the JSON error body.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(NewsError))]
struct ApiQuery<T>(T);

/// `Json` whose rejections come back as the JSON error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(NewsError))]
struct ApiJson<T>(T);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        .route("/api/v1/news/query", get(query_news))
        .route("/api/v1/news/category", get(by_category))
        .route("/api/v1/news/source", get(by_source))
        .route("/api/v1/news/score", get(by_score))
        .route("/api/v1/news/nearby", get(nearby))
        .route("/api/v1/news/search", get(search))
        .route("/api/v1/news/article/{id}", get(article_by_id))
        .route("/api/v1/news/stats", get(article_stats))
        .route("/api/v1/trending", get(trending))
        .route("/api/v1/trending/event", post(record_event))
        .route("/api/v1/trending/stats", get(trending_stats))
        .route("/api/v1/trending/cache/invalidate", post(invalidate_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---------- response shapes ----------

#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub count: usize,
    pub total_available: usize,
    pub page: usize,
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
}

impl ResponseMetadata {
    fn new(count: usize, total_available: usize, query: Option<&str>, filters: BTreeMap<String, String>) -> Self {
        Self {
            count,
            total_available,
            page: 1,
            page_size: count,
            query: query.map(str::to_string),
            filters,
        }
    }
}

#[derive(Debug, Serialize)]
struct ArticleList {
    articles: Vec<ArticleResponse>,
    metadata: ResponseMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    named_entities: Option<NamedEntities>,
}

fn article_list(res: FetchResult, query: Option<&str>, filters: BTreeMap<String, String>) -> ArticleList {
    let articles: Vec<ArticleResponse> = res.articles.iter().map(ArticleResponse::from).collect();
    ArticleList {
        metadata: ResponseMetadata::new(articles.len(), res.total_available, query, filters),
        articles,
        named_entities: None,
    }
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    intent: Intent,
    entities: Entities,
    #[serde(skip_serializing_if = "Option::is_none")]
    named_entities: Option<NamedEntities>,
    articles: Vec<ArticleResponse>,
    count: usize,
    total_available: usize,
}

#[derive(Debug, Serialize)]
struct TrendingArticle {
    #[serde(flatten)]
    article: ArticleResponse,
    trending_score: f64,
    event_count: usize,
}

impl From<&TrendingResult> for TrendingArticle {
    fn from(r: &TrendingResult) -> Self {
        Self {
            article: ArticleResponse::from(&r.article),
            trending_score: r.trending_score,
            event_count: r.event_count,
        }
    }
}

#[derive(Debug, Serialize)]
struct TrendingResponse {
    articles: Vec<TrendingArticle>,
    metadata: ResponseMetadata,
    location: String,
    radius_km: f64,
    cached_at: DateTime<Utc>,
    cache_hit: bool,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<u64>,
}

// ---------- request shapes ----------

#[derive(Debug, Deserialize)]
struct QueryParams {
    query: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    radius: f64,
}

#[derive(Debug, Deserialize)]
struct CategoryParams {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceParams {
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NearbyParams {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    radius: f64,
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrendingParams {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    radius: f64,
    #[serde(default)]
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct EventReq {
    #[serde(default)]
    article_id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    event_type: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

fn required(v: Option<String>, name: &str) -> NewsResult<String> {
    v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NewsError::invalid(format!("{name} parameter is required")))
}

fn required_point(lat: Option<f64>, lon: Option<f64>) -> NewsResult<GeoPoint> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            validate_location(lat, lon)?;
            Ok(GeoPoint::new(lat, lon))
        }
        _ => Err(NewsError::invalid("lat and lon are required")),
    }
}

fn optional_point(lat: Option<f64>, lon: Option<f64>) -> NewsResult<Option<GeoPoint>> {
    match (lat, lon) {
        (None, None) => Ok(None),
        _ => required_point(lat, lon).map(Some),
    }
}

// ---------- handlers ----------

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "geo-news",
        "version": env!("CARGO_PKG_VERSION"),
        "llm": state.llm_provider,
    }))
}

async fn query_news(
    State(state): State<AppState>,
    ApiQuery(p): ApiQuery<QueryParams>,
) -> NewsResult<Json<QueryResponse>> {
    let query = required(p.query, "query")?;
    let center = optional_point(p.lat, p.lon)?;
    let (res, intent): (FetchResult, IntentResponse) =
        state.news.query_with_intent(&query, center, p.radius).await?;
    let articles: Vec<ArticleResponse> = res.articles.iter().map(ArticleResponse::from).collect();
    Ok(Json(QueryResponse {
        intent: intent.intent,
        entities: intent.entities,
        named_entities: intent.named_entities,
        count: articles.len(),
        total_available: res.total_available,
        articles,
    }))
}

async fn by_category(
    State(state): State<AppState>,
    ApiQuery(p): ApiQuery<CategoryParams>,
) -> NewsResult<Json<ArticleList>> {
    let category = required(p.category, "category")?;
    let params = FetchParams::new(
        Intent::Category,
        Entities {
            category: Some(category.clone()),
            ..Entities::default()
        },
    );
    let res = state.news.fetch_enriched(&params).await?;
    let filters = BTreeMap::from([("category".to_string(), category)]);
    Ok(Json(article_list(res, None, filters)))
}

async fn by_source(
    State(state): State<AppState>,
    ApiQuery(p): ApiQuery<SourceParams>,
) -> NewsResult<Json<ArticleList>> {
    let source = required(p.source, "source")?;
    let params = FetchParams::new(
        Intent::Source,
        Entities {
            source: Some(source.clone()),
            ..Entities::default()
        },
    );
    let res = state.news.fetch_enriched(&params).await?;
    let filters = BTreeMap::from([("source".to_string(), source)]);
    Ok(Json(article_list(res, None, filters)))
}

async fn by_score(State(state): State<AppState>) -> NewsResult<Json<ArticleList>> {
    let params = FetchParams::new(Intent::Score, Entities::default());
    let res = state.news.fetch_enriched(&params).await?;
    let filters = BTreeMap::from([(
        "min_score".to_string(),
        format!("{:.2}", state.news.settings().score_threshold),
    )]);
    Ok(Json(article_list(res, None, filters)))
}

async fn nearby(
    State(state): State<AppState>,
    ApiQuery(p): ApiQuery<NearbyParams>,
) -> NewsResult<Json<ArticleList>> {
    let center = required_point(p.lat, p.lon)?;
    let query = p.query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
    let entities = Entities {
        query: query.clone(),
        ..Entities::default()
    };
    let params = FetchParams::new(Intent::Nearby, entities).near(center, p.radius);
    let res = state.news.fetch_enriched(&params).await?;

    let radius = if p.radius > 0.0 {
        p.radius
    } else {
        state.news.settings().default_radius_km
    };
    let filters = BTreeMap::from([
        ("lat".to_string(), format!("{:.4}", center.lat)),
        ("lon".to_string(), format!("{:.4}", center.lon)),
        ("radius".to_string(), format!("{radius:.1}")),
    ]);
    Ok(Json(article_list(res, query.as_deref(), filters)))
}

async fn search(
    State(state): State<AppState>,
    ApiQuery(p): ApiQuery<SearchParams>,
) -> NewsResult<Json<ArticleList>> {
    let query = required(p.query, "query")?;
    let (res, intent) = state.news.search_with_intent(&query).await?;

    let mut filters = BTreeMap::new();
    if let Some(ne) = &intent.named_entities {
        for (k, v) in [
            ("people", &ne.people),
            ("organizations", &ne.organizations),
            ("locations", &ne.locations),
            ("events", &ne.events),
        ] {
            if !v.is_empty() {
                filters.insert(k.to_string(), v.join(", "));
            }
        }
    }
    let mut list = article_list(res, Some(&query), filters);
    list.named_entities = intent.named_entities;
    Ok(Json(list))
}

async fn article_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> NewsResult<Json<ArticleResponse>> {
    let article = state.news.get_article_with_summary(&id).await?;
    Ok(Json(ArticleResponse::from(&article)))
}

async fn article_stats(State(state): State<AppState>) -> NewsResult<Json<ArticleStats>> {
    Ok(Json(state.news.article_stats().await?))
}

async fn trending(
    State(state): State<AppState>,
    ApiQuery(p): ApiQuery<TrendingParams>,
) -> NewsResult<Response> {
    let center = required_point(p.lat, p.lon)?;
    let (results, meta) = state
        .trending
        .compute_trending(center.lat, center.lon, p.radius, p.limit)
        .await?;

    let articles: Vec<TrendingArticle> = results.iter().map(TrendingArticle::from).collect();
    let body = TrendingResponse {
        metadata: ResponseMetadata::new(articles.len(), articles.len(), None, BTreeMap::new()),
        articles,
        location: meta.location,
        radius_km: meta.radius_km,
        cached_at: meta.cached_at,
        cache_hit: meta.cache_hit,
    };
    let header = HeaderValue::from_static(if meta.cache_hit { "HIT" } else { "MISS" });
    Ok(([(CACHE_HEADER, header)], Json(body)).into_response())
}

async fn record_event(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EventReq>,
) -> NewsResult<(StatusCode, Json<StatusResponse>)> {
    let point = required_point(req.lat, req.lon)?;
    let stored = state
        .trending
        .record_event(&req.article_id, &req.user_id, &req.event_type, point.lat, point.lon)
        .await?;
    Ok((
        StatusCode::OK,
        Json(StatusResponse {
            status: "success",
            message: "Event recorded successfully",
            event_id: Some(stored.id),
        }),
    ))
}

async fn trending_stats(State(state): State<AppState>) -> NewsResult<Json<TrendingStats>> {
    Ok(Json(state.trending.event_stats().await?))
}

async fn invalidate_cache(State(state): State<AppState>) -> Json<StatusResponse> {
    state.trending.invalidate_cache();
    Json(StatusResponse {
        status: "success",
        message: "Trending cache invalidated",
        event_id: None,
    })
}
