// src/trending/mod.rs
//! Location-aware trending.
//!
//! Per request: cache check → (miss) aggregate events → score → relevance
//! fallback when nothing scored → sort → truncate → store → enrich.
//! Recording an event invalidates the whole grid cache.

pub mod aggregate;
pub mod cache;
pub mod score;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::enrich::SummaryEnricher;
use crate::error::{NewsError, NewsResult};
use crate::geo::{distance_km, filter_within, validate_location, GeoPoint, Locatable};
use crate::models::{EventKind, InteractionEvent, NewEvent, Scored, TrendingResult};
use crate::ranking::RelevanceRanker;
use crate::store::{ArticleStore, EventStore};

pub use aggregate::aggregate;
pub use cache::{CacheEntry, GridKey, LocationGridCache};
pub use score::{compute_trending_score, recency_factor};

/// Knobs for one engine instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendingSettings {
    /// Used when the caller passes no (or a zero) radius.
    pub default_radius_km: f64,
    /// Cap and default for `limit`.
    pub max_results: usize,
    /// Minimum base relevance for fallback entries.
    pub fallback_threshold: f64,
    pub window: chrono::Duration,
}

impl Default for TrendingSettings {
    fn default() -> Self {
        Self {
            default_radius_km: 50.0,
            max_results: 5,
            fallback_threshold: 0.7,
            window: chrono::Duration::hours(24),
        }
    }
}

/// Where a response came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheMeta {
    pub cache_hit: bool,
    pub location: String,
    pub radius_km: f64,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingStats {
    pub total_events: usize,
    pub unique_articles: usize,
    pub unique_users: usize,
    pub views: usize,
    pub clicks: usize,
    pub shares: usize,
    pub cache_entries: usize,
    pub cache_ttl_secs: u64,
}

pub struct TrendingEngine {
    articles: Arc<dyn ArticleStore>,
    events: Arc<dyn EventStore>,
    cache: Arc<LocationGridCache>,
    ranker: RelevanceRanker,
    enricher: Option<Arc<SummaryEnricher>>,
    settings: TrendingSettings,
}

impl TrendingEngine {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        events: Arc<dyn EventStore>,
        cache: Arc<LocationGridCache>,
        ranker: RelevanceRanker,
        settings: TrendingSettings,
    ) -> Self {
        Self {
            articles,
            events,
            cache,
            ranker,
            enricher: None,
            settings,
        }
    }

    /// Attach a summary enricher; without one results are returned as computed.
    pub fn with_enricher(mut self, enricher: Arc<SummaryEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn settings(&self) -> &TrendingSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<LocationGridCache> {
        &self.cache
    }

    fn effective_radius(&self, radius_km: f64) -> NewsResult<f64> {
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(NewsError::invalid("radius must be a non-negative number"));
        }
        Ok(if radius_km == 0.0 {
            self.settings.default_radius_km
        } else {
            radius_km
        })
    }

    fn effective_limit(&self, limit: usize) -> usize {
        if limit == 0 || limit > self.settings.max_results {
            self.settings.max_results
        } else {
            limit
        }
    }

    /// Full request path, summaries included.
    pub async fn compute_trending(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
        limit: usize,
    ) -> NewsResult<(Vec<TrendingResult>, CacheMeta)> {
        let (results, meta) = self.compute_scores(lat, lon, radius_km, limit).await?;
        let results = match &self.enricher {
            Some(e) => e.enrich_trending(results).await,
            None => results,
        };
        Ok((results, meta))
    }

    /// Cache-backed scoring without enrichment.
    pub async fn compute_scores(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
        limit: usize,
    ) -> NewsResult<(Vec<TrendingResult>, CacheMeta)> {
        self.compute_scores_at(Utc::now(), lat, lon, radius_km, limit)
            .await
    }

    /// As [`TrendingEngine::compute_scores`], with an explicit clock.
    pub async fn compute_scores_at(
        &self,
        now: DateTime<Utc>,
        lat: f64,
        lon: f64,
        radius_km: f64,
        limit: usize,
    ) -> NewsResult<(Vec<TrendingResult>, CacheMeta)> {
        validate_location(lat, lon)?;
        let radius = self.effective_radius(radius_km)?;
        let limit = self.effective_limit(limit);
        let key = GridKey::new(lat, lon, radius);

        if let Some(entry) = self.cache.get(&key) {
            counter!("trending_cache_hits_total").increment(1);
            debug!(target: "trending", ?key, "cache hit");
            let results = entry.results.iter().take(limit).cloned().collect();
            return Ok((results, meta_for(&entry, true)));
        }
        counter!("trending_cache_misses_total").increment(1);

        let generation = self.cache.generation();
        let started = Instant::now();
        let center = GeoPoint::new(lat, lon);
        let mut results = self.score_events(now, center, radius).await?;
        if results.is_empty() {
            counter!("trending_fallback_total").increment(1);
            results = self.fallback(center, radius).await?;
        }

        results.sort_by(|a, b| b.trending_score.total_cmp(&a.trending_score));
        results.truncate(self.settings.max_results);

        let entry = CacheEntry::new(results, center, radius);
        if !self.cache.put_if_current(key, entry.clone(), generation) {
            debug!(target: "trending", ?key, "cache invalidated during computation, not storing");
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("trending_compute_ms").record(elapsed_ms);
        info!(
            target: "trending",
            lat, lon, radius_km = radius,
            results = entry.results.len(),
            elapsed_ms,
            "trending recomputed"
        );

        let results = entry.results.iter().take(limit).cloned().collect();
        Ok((results, meta_for(&entry, false)))
    }

    async fn score_events(
        &self,
        now: DateTime<Utc>,
        center: GeoPoint,
        radius_km: f64,
    ) -> NewsResult<Vec<TrendingResult>> {
        let since = now
            .checked_sub_signed(self.settings.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let events = self.events.events_since(since).await?;
        let grouped = aggregate(events, center, radius_km, since);

        let mut out = Vec::with_capacity(grouped.len());
        for (article_id, evs) in grouped {
            let Some(article) = self.articles.get_article(&article_id).await? else {
                debug!(target: "trending", %article_id, "events reference unknown article");
                continue;
            };
            let mut result = TrendingResult {
                article,
                trending_score: 0.0,
                event_count: evs.len(),
            };
            let distance = distance_km(center, result.point());
            result.set_distance(distance);

            let raw = score::raw_score(&evs, now);
            result.trending_score = score::boosted_score(raw, result.relevance_score(), distance);
            out.push(result);
        }
        Ok(out)
    }

    /// Relevance-driven ranking inside the radius when no events scored.
    async fn fallback(&self, center: GeoPoint, radius_km: f64) -> NewsResult<Vec<TrendingResult>> {
        let threshold = self.settings.fallback_threshold;
        let candidates = filter_within(
            self.articles.all_articles().await?,
            center,
            radius_km,
            |a| a.relevance_score >= threshold,
        );
        Ok(self
            .ranker
            .rank_by_search_relevance(candidates, "", None)
            .into_iter()
            .map(|article| TrendingResult {
                trending_score: article.relevance_score * score::FALLBACK_MULTIPLIER,
                article,
                event_count: 0,
            })
            .collect())
    }

    /// Validate, append, then invalidate every cached cell.
    pub async fn record_event(
        &self,
        article_id: &str,
        actor_id: &str,
        kind: &str,
        lat: f64,
        lon: f64,
    ) -> NewsResult<InteractionEvent> {
        let parsed = validate_event(article_id, actor_id, kind, lat, lon).inspect_err(|e| {
            counter!("events_rejected_total").increment(1);
            warn!(target: "trending", error = %e, "event rejected");
        })?;

        let stored = self
            .events
            .append(NewEvent {
                article_id: article_id.trim().to_string(),
                user_id: actor_id.trim().to_string(),
                kind: parsed,
                latitude: lat,
                longitude: lon,
                timestamp: Utc::now(),
            })
            .await?;

        self.invalidate_cache();
        counter!("events_recorded_total", "kind" => parsed.as_str()).increment(1);
        debug!(target: "trending", id = stored.id, kind = %parsed, "event recorded");
        Ok(stored)
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
        debug!(target: "trending", "cache invalidated");
    }

    pub async fn event_stats(&self) -> NewsResult<TrendingStats> {
        let c = self.events.event_counts().await?;
        Ok(TrendingStats {
            total_events: c.total_events,
            unique_articles: c.unique_articles,
            unique_users: c.unique_users,
            views: c.views,
            clicks: c.clicks,
            shares: c.shares,
            cache_entries: self.cache.len(),
            cache_ttl_secs: self.cache.ttl().as_secs(),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }
}

fn validate_event(
    article_id: &str,
    actor_id: &str,
    kind: &str,
    lat: f64,
    lon: f64,
) -> NewsResult<EventKind> {
    let kind: EventKind = kind.parse()?;
    if article_id.trim().is_empty() {
        return Err(NewsError::invalid("article_id is required"));
    }
    if actor_id.trim().is_empty() {
        return Err(NewsError::invalid("user_id is required"));
    }
    validate_location(lat, lon)?;
    Ok(kind)
}

fn meta_for(entry: &CacheEntry, cache_hit: bool) -> CacheMeta {
    CacheMeta {
        cache_hit,
        location: entry.location_label(),
        radius_km: entry.radius_km,
        cached_at: entry.cached_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article::fixtures::article;
    use crate::store::{MemoryArticleStore, MemoryEventStore};

    const SF: (f64, f64) = (37.7749, -122.4194);

    fn engine(articles: Vec<crate::models::Article>) -> (TrendingEngine, Arc<MemoryEventStore>) {
        let events = Arc::new(MemoryEventStore::new());
        let e = TrendingEngine::new(
            Arc::new(MemoryArticleStore::new(articles)),
            events.clone(),
            Arc::new(LocationGridCache::new(Duration::from_secs(300))),
            RelevanceRanker::default(),
            TrendingSettings::default(),
        );
        (e, events)
    }

    #[tokio::test]
    async fn fallback_uses_relevance_times_ten() {
        let (e, _) = engine(vec![
            article("hi", "t", "d", 0.8, 37.78, -122.41),
            article("lo", "t", "d", 0.3, 37.78, -122.41),
        ]);
        let (res, meta) = e.compute_scores(SF.0, SF.1, 50.0, 10).await.unwrap();
        assert!(!meta.cache_hit);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].article.id, "hi");
        assert_eq!(res[0].event_count, 0);
        assert!((res[0].trending_score - 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn events_outrank_and_local_boost_applies() {
        let (e, _) = engine(vec![
            article("near", "t", "d", 0.5, 37.78, -122.42),
            article("far", "t", "d", 0.5, 37.50, -122.20),
        ]);
        for id in ["near", "far"] {
            e.record_event(id, "u1", "share", 37.78, -122.42).await.unwrap();
        }
        let (res, _) = e.compute_scores(SF.0, SF.1, 50.0, 5).await.unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].article.id, "near");
        assert!(res[0].trending_score > res[1].trending_score);
        assert_eq!(res[0].event_count, 1);
        assert!(res[0].article.distance.unwrap() < 10.0);
    }

    #[tokio::test]
    async fn second_lookup_in_same_cell_hits() {
        let (e, _) = engine(vec![article("a", "t", "d", 0.9, 37.78, -122.41)]);
        let (_, m1) = e.compute_scores(SF.0, SF.1, 50.0, 5).await.unwrap();
        let (_, m2) = e.compute_scores(37.7760, -122.4180, 52.0, 5).await.unwrap();
        assert!(!m1.cache_hit);
        assert!(m2.cache_hit);
        assert_eq!(m2.location, "37.7749,-122.4194");
    }

    #[tokio::test]
    async fn recording_invalidates() {
        let (e, _) = engine(vec![article("a", "t", "d", 0.9, 37.78, -122.41)]);
        e.compute_scores(SF.0, SF.1, 50.0, 5).await.unwrap();
        assert_eq!(e.cache().len(), 1);
        e.record_event("a", "u", "VIEW", SF.0, SF.1).await.unwrap();
        assert!(e.cache().is_empty());
        let (res, meta) = e.compute_scores(SF.0, SF.1, 50.0, 5).await.unwrap();
        assert!(!meta.cache_hit);
        assert_eq!(res[0].event_count, 1);
    }

    #[tokio::test]
    async fn invalid_kind_leaves_state_untouched() {
        let (e, events) = engine(vec![article("a", "t", "d", 0.9, 37.78, -122.41)]);
        e.compute_scores(SF.0, SF.1, 50.0, 5).await.unwrap();
        let err = e.record_event("a", "u", "like", SF.0, SF.1).await.unwrap_err();
        assert!(matches!(err, NewsError::InvalidInput(_)));
        assert!(events.is_empty());
        assert_eq!(e.cache().len(), 1);
    }

    #[tokio::test]
    async fn limit_defaults_and_caps() {
        let arts: Vec<_> = (0..8)
            .map(|i| article(&format!("a{i}"), "t", "d", 0.9, 37.78, -122.41))
            .collect();
        let (e, _) = engine(arts);
        let (res, _) = e.compute_scores(SF.0, SF.1, 50.0, 0).await.unwrap();
        assert_eq!(res.len(), 5);
        let (res, _) = e.compute_scores(SF.0, SF.1, 50.0, 2).await.unwrap();
        assert_eq!(res.len(), 2);
        let (res, _) = e.compute_scores(SF.0, SF.1, 50.0, 99).await.unwrap();
        assert_eq!(res.len(), 5);
    }

    #[tokio::test]
    async fn zero_radius_uses_default_and_bad_coords_reject() {
        let (e, _) = engine(vec![article("a", "t", "d", 0.9, 37.78, -122.41)]);
        let (_, meta) = e.compute_scores(SF.0, SF.1, 0.0, 5).await.unwrap();
        assert_eq!(meta.radius_km, 50.0);
        assert!(e.compute_scores(91.0, 0.0, 10.0, 5).await.is_err());
        assert!(e.compute_scores(0.0, 0.0, -1.0, 5).await.is_err());
    }

    #[tokio::test]
    async fn old_events_fall_out_of_the_window() {
        let (e, _) = engine(vec![article("a", "t", "d", 0.2, 37.78, -122.41)]);
        e.record_event("a", "u", "click", SF.0, SF.1).await.unwrap();
        let later = Utc::now() + chrono::Duration::hours(25);
        let (res, _) = e.compute_scores_at(later, SF.0, SF.1, 50.0, 5).await.unwrap();
        // relevance 0.2 is below the fallback threshold
        assert!(res.is_empty());
    }

    #[tokio::test]
    async fn stats_reflect_events_and_cache() {
        let (e, _) = engine(vec![article("a", "t", "d", 0.9, 37.78, -122.41)]);
        e.record_event("a", "u1", "view", SF.0, SF.1).await.unwrap();
        e.record_event("a", "u2", "share", SF.0, SF.1).await.unwrap();
        e.compute_scores(SF.0, SF.1, 50.0, 5).await.unwrap();
        let s = e.event_stats().await.unwrap();
        assert_eq!(s.total_events, 2);
        assert_eq!((s.views, s.shares), (1, 1));
        assert_eq!(s.unique_users, 2);
        assert_eq!(s.cache_entries, 1);
        assert_eq!(s.cache_ttl_secs, 300);
    }

    #[tokio::test]
    async fn window_past_the_calendar_counts_every_event() {
        let e = TrendingEngine::new(
            Arc::new(MemoryArticleStore::new(vec![article("a", "t", "d", 0.2, 37.78, -122.41)])),
            Arc::new(MemoryEventStore::new()),
            Arc::new(LocationGridCache::new(Duration::from_secs(300))),
            RelevanceRanker::default(),
            TrendingSettings {
                window: chrono::Duration::days(100_000_000),
                ..TrendingSettings::default()
            },
        );
        e.record_event("a", "u", "view", SF.0, SF.1).await.unwrap();
        let (res, _) = e.compute_scores(SF.0, SF.1, 50.0, 5).await.unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].event_count, 1);
    }
}
