// src/state.rs
//! Process wiring: stores, cache, enricher and services built from config.

use std::sync::Arc;

use tracing::info;

use crate::config::{LlmConfig, ServiceConfig};
use crate::enrich::{EnricherSettings, SummaryEnricher};
use crate::ingest::load_articles_from;
use crate::llm::{build_clients, LlmClients};
use crate::models::Article;
use crate::news::{NewsService, NewsSettings};
use crate::ranking::RelevanceRanker;
use crate::store::{MemoryArticleStore, MemoryEventStore};
use crate::trending::{LocationGridCache, TrendingEngine, TrendingSettings};

/// Shared state used by Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub news: Arc<NewsService>,
    pub trending: Arc<TrendingEngine>,
    pub llm_provider: &'static str,
}

impl AppState {
    /// Build from explicit parts. Every call gets its own cache and memo table.
    pub fn new(cfg: &ServiceConfig, articles: Vec<Article>, clients: LlmClients) -> Self {
        let article_store = Arc::new(MemoryArticleStore::new(articles));
        let event_store = Arc::new(MemoryEventStore::new());
        let ranker = RelevanceRanker::new(cfg.ranking);

        let enricher = Arc::new(SummaryEnricher::new(
            clients.summarizer.clone(),
            EnricherSettings {
                concurrency: cfg.summary_concurrency,
                call_timeout: cfg.summary_timeout(),
            },
        ));

        let news = NewsService::new(
            article_store.clone(),
            clients.intent.clone(),
            enricher.clone(),
            ranker.clone(),
            NewsSettings {
                default_radius_km: cfg.default_radius_km,
                max_articles: cfg.max_articles,
                score_threshold: cfg.score_threshold,
                intent_timeout: cfg.intent_timeout(),
            },
        );

        let trending = TrendingEngine::new(
            article_store,
            event_store,
            Arc::new(LocationGridCache::new(cfg.cache_ttl())),
            ranker,
            TrendingSettings {
                default_radius_km: cfg.trending_radius_km,
                max_results: cfg.max_articles,
                fallback_threshold: cfg.score_threshold,
                window: chrono::Duration::hours(i64::from(cfg.trending_window_hours)),
            },
        )
        .with_enricher(enricher);

        Self {
            news: Arc::new(news),
            trending: Arc::new(trending),
            llm_provider: clients.provider_name,
        }
    }

    /// Load config files, env overrides, the article dataset and LLM clients.
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = ServiceConfig::load()?;
        let llm_cfg = LlmConfig::from_env()?;
        let clients = build_clients(&llm_cfg)?;
        let articles = load_articles_from(&cfg.data_path)?;

        info!(
            articles = articles.len(),
            llm = clients.provider_name,
            cache_ttl_secs = cfg.trending_cache_ttl_secs,
            max_articles = cfg.max_articles,
            "app state ready"
        );
        Ok(Self::new(&cfg, articles, clients))
    }
}
