//! Integration tests for trending cache behavior through the HTTP surface.
//!
//! Covered (strict):
//! - MISS → HIT for identical and for nearby (same grid cell) requests
//! - MISS for a different radius band
//! - MISS again after the TTL elapses (paused clock, auto-advanced by `sleep`)
//! - Presence of the `X-Trending-Cache` diagnostics header

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, Router};
use chrono::Utc;
use http::{HeaderMap, Request, StatusCode};
use tokio::time::sleep;
use tower::ServiceExt; // for oneshot

use geo_news::config::{LlmConfig, ServiceConfig};
use geo_news::llm::{LlmClients, MockProvider};
use geo_news::models::Article;
use geo_news::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheDetect {
    Hit,
    Miss,
}

fn detect(headers: &HeaderMap) -> CacheDetect {
    match headers.get("x-trending-cache").and_then(|v| v.to_str().ok()) {
        Some("HIT") => CacheDetect::Hit,
        Some("MISS") => CacheDetect::Miss,
        other => panic!("missing or unexpected X-Trending-Cache header: {other:?}"),
    }
}

fn build_app(ttl_secs: u64) -> Router {
    let cfg = ServiceConfig {
        trending_cache_ttl_secs: ttl_secs,
        ..ServiceConfig::default()
    };
    let article = Article {
        id: "bay-1".into(),
        title: "Bay Bridge reopens".into(),
        description: "Traffic resumes after overnight repairs on the span".into(),
        url: String::new(),
        publication_date: Utc::now(),
        source_name: "SF Chronicle".into(),
        category: "Local".into(),
        relevance_score: 0.95,
        latitude: 37.798,
        longitude: -122.377,
        llm_summary: None,
        distance: None,
    };
    let clients = LlmClients::from_provider(Arc::new(MockProvider), &LlmConfig::default());
    geo_news::router(AppState::new(&cfg, vec![article], clients))
}

async fn get_trending(app: &Router, lat: f64, lon: f64, radius: f64) -> (StatusCode, HeaderMap) {
    let uri = format!("/api/v1/trending?lat={lat}&lon={lon}&radius={radius}");
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request build");
    let resp = app.clone().oneshot(req).await.expect("router response");
    (resp.status(), resp.headers().clone())
}

#[tokio::test]
async fn identical_and_nearby_requests_share_an_entry() {
    let app = build_app(300);

    let (s1, h1) = get_trending(&app, 37.7749, -122.4194, 50.0).await;
    assert_eq!(s1, StatusCode::OK);
    assert_eq!(detect(&h1), CacheDetect::Miss);

    let (_, h2) = get_trending(&app, 37.7749, -122.4194, 50.0).await;
    assert_eq!(detect(&h2), CacheDetect::Hit);

    // < 0.05° away, same 10 km radius band
    let (_, h3) = get_trending(&app, 37.7790, -122.4150, 58.0).await;
    assert_eq!(detect(&h3), CacheDetect::Hit);
}

#[tokio::test]
async fn different_radius_band_misses() {
    let app = build_app(300);
    let (_, h1) = get_trending(&app, 37.7749, -122.4194, 50.0).await;
    let (_, h2) = get_trending(&app, 37.7749, -122.4194, 61.0).await;
    assert_eq!(detect(&h1), CacheDetect::Miss);
    assert_eq!(detect(&h2), CacheDetect::Miss);
}

#[tokio::test(start_paused = true)]
async fn entry_expires_after_ttl() {
    let app = build_app(1);

    let (_, h1) = get_trending(&app, 37.7749, -122.4194, 20.0).await;
    assert_eq!(detect(&h1), CacheDetect::Miss);
    let (_, h2) = get_trending(&app, 37.7749, -122.4194, 20.0).await;
    assert_eq!(detect(&h2), CacheDetect::Hit);

    sleep(Duration::from_millis(1_100)).await;

    let (_, h3) = get_trending(&app, 37.7749, -122.4194, 20.0).await;
    assert_eq!(detect(&h3), CacheDetect::Miss, "expired entry must recompute");
}
